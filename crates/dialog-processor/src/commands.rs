//! Command table
//!
//! Commands are looked up by name or alias and run against a
//! [`CommandProcessor`] with positional arguments.

use std::fmt::Write as _;

use dialog_timeline::storage::validate_agent_name;
use dialog_timeline::{DialogEntry, TimelineError, TimelineStorage};

use crate::error::{ProcessError, Result};
use crate::processor::CommandProcessor;

/// What the caller should do after a command ran
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutput {
    Text(String),
    /// Enter chat mode
    Interactive,
    Exit,
    None,
}

type Handler = fn(&mut CommandProcessor, &[&str]) -> Result<CommandOutput>;

pub struct CommandSpec {
    pub name: &'static str,
    pub alias: &'static str,
    pub usage: &'static str,
    pub summary: &'static str,
    handler: Handler,
}

impl CommandSpec {
    pub fn matches(&self, name: &str) -> bool {
        self.name == name || self.alias == name
    }
}

pub static COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        name: "interactive",
        alias: "i",
        usage: "interactive",
        summary: "Enter chat mode",
        handler: interactive,
    },
    CommandSpec {
        name: "display-timeline",
        alias: "dt",
        usage: "display-timeline",
        summary: "Show frozen segments and the cursor",
        handler: display_timeline,
    },
    CommandSpec {
        name: "save-timeline",
        alias: "s",
        usage: "save-timeline <file> [name] [description]",
        summary: "Save the timeline to the dialog directory",
        handler: save_timeline,
    },
    CommandSpec {
        name: "save-agent",
        alias: "sa",
        usage: "save-agent <agent_name> [description]",
        summary: "Save the timeline as an agent",
        handler: save_agent,
    },
    CommandSpec {
        name: "load-timeline",
        alias: "l",
        usage: "load-timeline <file>",
        summary: "Load a timeline from the dialog directory",
        handler: load_timeline,
    },
    CommandSpec {
        name: "export-markdown",
        alias: "e",
        usage: "export-markdown <index> <file>",
        summary: "Export one message as markdown",
        handler: export_markdown,
    },
    CommandSpec {
        name: "head",
        alias: "h",
        usage: "head",
        summary: "Show message count and cursor",
        handler: head,
    },
    CommandSpec {
        name: "display-item",
        alias: "d",
        usage: "display-item <index>",
        summary: "Show one message",
        handler: display_item,
    },
    CommandSpec {
        name: "select-message",
        alias: "sm",
        usage: "select-message [index]",
        summary: "List messages, or move the cursor to one",
        handler: select_message,
    },
    CommandSpec {
        name: "system-message",
        alias: "sysm",
        usage: "system-message set|update <text> | delete | view",
        summary: "Manage the system message",
        handler: system_message,
    },
    CommandSpec {
        name: "select-dialog",
        alias: "sd",
        usage: "select-dialog [relative path]",
        summary: "List saved dialogs, or load one",
        handler: select_dialog,
    },
    CommandSpec {
        name: "select-agent",
        alias: "sla",
        usage: "select-agent [relative path]",
        summary: "List agents, or load one",
        handler: select_agent,
    },
    CommandSpec {
        name: "switch-model",
        alias: "swm",
        usage: "switch-model <provider:model>",
        summary: "Send further turns to another model",
        handler: switch_model,
    },
    CommandSpec {
        name: "help",
        alias: "?",
        usage: "help",
        summary: "List commands",
        handler: help,
    },
    CommandSpec {
        name: "quit",
        alias: "q",
        usage: "quit",
        summary: "Leave",
        handler: quit,
    },
];

pub fn find_command(name: &str) -> Option<&'static CommandSpec> {
    COMMANDS.iter().find(|command| command.matches(name))
}

pub fn help_text() -> String {
    let mut text = String::from("Available commands:\n");
    for command in COMMANDS {
        let _ = writeln!(
            text,
            "  {:<18} ({:<4}) {} - {}",
            command.name, command.alias, command.usage, command.summary
        );
    }
    text
}

impl CommandProcessor {
    pub fn execute_command(&mut self, name: &str, args: &[&str]) -> Result<CommandOutput> {
        let command = find_command(name).ok_or_else(|| ProcessError::UnknownCommand(name.to_string()))?;
        log::debug!("Running command {} with {} args", command.name, args.len());
        (command.handler)(self, args)
    }

    /// Whitespace-separated command line, e.g. `e 3 summary`
    pub fn execute_line(&mut self, line: &str) -> Result<CommandOutput> {
        let mut words = line.split_whitespace();
        let Some(name) = words.next() else {
            return Ok(CommandOutput::None);
        };
        let args: Vec<&str> = words.collect();
        self.execute_command(name, &args)
    }
}

fn usage(name: &str) -> ProcessError {
    let usage = find_command(name).map_or(name, |command| command.usage);
    ProcessError::Usage(usage.to_string())
}

fn index_arg(args: &[&str], position: usize, command: &str) -> Result<usize> {
    args.get(position)
        .and_then(|arg| arg.parse().ok())
        .ok_or_else(|| usage(command))
}

/// Joined arguments from `from` on, `None` when there are none
fn rest(args: &[&str], from: usize) -> Option<String> {
    args.get(from..)
        .filter(|rest| !rest.is_empty())
        .map(|rest| rest.join(" "))
}

fn listing(title: &str, entries: &[DialogEntry]) -> String {
    let mut text = format!("{title}:\n");
    for (number, entry) in entries.iter().enumerate() {
        let _ = writeln!(text, "{}. {}", number + 1, entry);
    }
    text
}

fn interactive(_: &mut CommandProcessor, _: &[&str]) -> Result<CommandOutput> {
    Ok(CommandOutput::Interactive)
}

fn display_timeline(processor: &mut CommandProcessor, _: &[&str]) -> Result<CommandOutput> {
    Ok(CommandOutput::Text(processor.timeline().display_timeline()))
}

fn save_timeline(processor: &mut CommandProcessor, args: &[&str]) -> Result<CommandOutput> {
    let file = args.first().ok_or_else(|| usage("save-timeline"))?;
    let path = processor.storage().dialog_path(file);
    let description = rest(args, 2);
    processor
        .timeline()
        .save(&path, args.get(1).copied(), description.as_deref())?;
    Ok(CommandOutput::Text(format!("Timeline saved to {}", path.display())))
}

fn save_agent(processor: &mut CommandProcessor, args: &[&str]) -> Result<CommandOutput> {
    let agent_name = args.first().ok_or_else(|| usage("save-agent"))?;
    let name = validate_agent_name(agent_name)?;
    let path = processor.storage().agent_path(&name)?;
    let description = rest(args, 1);
    processor
        .timeline()
        .save(&path, Some(name.as_str()), description.as_deref())?;
    Ok(CommandOutput::Text(format!("Agent '{name}' saved to {}", path.display())))
}

fn load_timeline(processor: &mut CommandProcessor, args: &[&str]) -> Result<CommandOutput> {
    let file = args.first().ok_or_else(|| usage("load-timeline"))?;
    let path = processor.storage().dialog_path(file);
    processor.timeline_mut().load(path.clone())?;
    Ok(CommandOutput::Text(format!("Timeline loaded from {}", path.display())))
}

fn export_markdown(processor: &mut CommandProcessor, args: &[&str]) -> Result<CommandOutput> {
    let index = index_arg(args, 0, "export-markdown")?;
    let file: &str = args.get(1).copied().ok_or_else(|| usage("export-markdown"))?;
    let stem = file.strip_suffix(".md").unwrap_or(file);
    let destination = processor.export_dir().join(format!("{stem}.md"));
    processor
        .timeline()
        .export_message_to_markdown(index, &destination)?;
    Ok(CommandOutput::Text(format!(
        "Message {index} exported to {}",
        destination.display()
    )))
}

fn head(processor: &mut CommandProcessor, _: &[&str]) -> Result<CommandOutput> {
    Ok(CommandOutput::Text(processor.timeline().head().to_string()))
}

fn item_text(processor: &CommandProcessor, index: usize) -> Result<String> {
    processor
        .timeline()
        .display_item(index)
        .ok_or_else(|| {
            TimelineError::IndexOutOfRange {
                index,
                len: processor.timeline().len(),
            }
            .into()
        })
}

fn display_item(processor: &mut CommandProcessor, args: &[&str]) -> Result<CommandOutput> {
    let index = index_arg(args, 0, "display-item")?;
    Ok(CommandOutput::Text(item_text(processor, index)?))
}

fn select_message(processor: &mut CommandProcessor, args: &[&str]) -> Result<CommandOutput> {
    if args.is_empty() {
        let summaries = processor.timeline().message_summaries();
        if summaries.is_empty() {
            return Ok(CommandOutput::Text("No messages in the timeline.".to_string()));
        }
        return Ok(CommandOutput::Text(summaries.join("\n")));
    }

    let index = index_arg(args, 0, "select-message")?;
    processor.timeline_mut().set_current_position(index)?;
    Ok(CommandOutput::Text(item_text(processor, index)?))
}

fn system_message(processor: &mut CommandProcessor, args: &[&str]) -> Result<CommandOutput> {
    match args.first().copied() {
        Some("set") | Some("update") => {
            let text = rest(args, 1).ok_or_else(|| usage("system-message"))?;
            processor.timeline_mut().set_system_message(text);
            Ok(CommandOutput::Text("System message updated.".to_string()))
        }
        Some("delete") => {
            processor.timeline_mut().delete_system_message();
            Ok(CommandOutput::Text("System message deleted.".to_string()))
        }
        Some("view") => {
            let text = match processor.timeline().get_system_message() {
                Some(message) => format!("System message: {}", message.text()),
                None => "No system message set.".to_string(),
            };
            Ok(CommandOutput::Text(text))
        }
        _ => Err(usage("system-message")),
    }
}

fn select_dialog(processor: &mut CommandProcessor, args: &[&str]) -> Result<CommandOutput> {
    let root = processor.storage().dialogs_dir().to_path_buf();
    select_from(processor, args, &root, "Saved dialogs")
}

fn select_agent(processor: &mut CommandProcessor, args: &[&str]) -> Result<CommandOutput> {
    let root = processor.storage().agents_dir().to_path_buf();
    select_from(processor, args, &root, "Agents")
}

fn select_from(
    processor: &mut CommandProcessor,
    args: &[&str],
    root: &std::path::Path,
    title: &str,
) -> Result<CommandOutput> {
    match args.first() {
        None => {
            let entries = TimelineStorage::list_dialogs(root);
            if entries.is_empty() {
                return Ok(CommandOutput::Text(format!(
                    "No files found in {}",
                    root.display()
                )));
            }
            Ok(CommandOutput::Text(listing(title, &entries)))
        }
        Some(relative) => {
            let path = root.join(relative);
            processor.timeline_mut().load(path.clone())?;
            Ok(CommandOutput::Text(format!("Loaded {}", path.display())))
        }
    }
}

fn switch_model(processor: &mut CommandProcessor, args: &[&str]) -> Result<CommandOutput> {
    let model: &str = args.first().copied().ok_or_else(|| usage("switch-model"))?;
    let resolver = processor.resolver().cloned().ok_or(ProcessError::NoResolver)?;
    let backend = resolver.resolve(Some(model))?;
    processor.set_backend(backend);
    Ok(CommandOutput::Text(format!("Switched to {model}")))
}

fn help(_: &mut CommandProcessor, _: &[&str]) -> Result<CommandOutput> {
    Ok(CommandOutput::Text(help_text()))
}

fn quit(_: &mut CommandProcessor, _: &[&str]) -> Result<CommandOutput> {
    Ok(CommandOutput::Exit)
}
