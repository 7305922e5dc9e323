mod logging;

use std::io::{self, BufRead, Write};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use colored::Colorize;
use dialog_core::Config;
use dialog_llm::{BackendResolver, ModelSelector};
use dialog_manager::{load_all_agents, AgentDialogManager, BasicDialogManager, ProcessorHandle};
use dialog_processor::{CommandOutput, CommandProcessor};
use dialog_timeline::{DialogEntry, TimelineStorage};
use tokio::sync::Mutex;

#[derive(Parser)]
#[command(name = "dialog")]
#[command(about = "Timeline dialogs with language models")]
#[command(version)]
struct Cli {
    /// Model as provider:model_id, overrides the configured model
    #[arg(long, short)]
    model: Option<String>,

    /// Enable debug logging
    #[arg(long, short, default_value = "false")]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start an interactive dialog
    Chat {
        /// Saved dialog to continue, relative to the dialog save path
        #[arg(long)]
        dialog: Option<String>,
    },
    /// Send a single message to an agent
    Send {
        /// Agent id, the seed file name without extension
        #[arg(long)]
        agent: String,
        /// Message content, or `file <path>`
        message: String,
    },
    /// List saved dialogs
    ListDialogs,
    /// List agents
    ListAgents,
    /// Create an empty saved dialog
    NewDialog { name: String },
    /// Create an empty agent
    NewAgent { name: String },
}

/// Asks on stdin when no model is configured
struct PromptSelector;

impl ModelSelector for PromptSelector {
    fn select_model(&self, available: &[String]) -> Option<String> {
        if available.is_empty() {
            return None;
        }
        println!("{}", "No model configured. Choose one:".yellow());
        for (number, model) in available.iter().enumerate() {
            println!("  {}. {}", number + 1, model);
        }
        print!("{} ", "Model:".cyan().bold());
        io::stdout().flush().ok()?;

        let mut input = String::new();
        io::stdin().lock().read_line(&mut input).ok()?;
        let choice = input.trim();
        match choice.parse::<usize>() {
            Ok(number) if (1..=available.len()).contains(&number) => {
                Some(available[number - 1].clone())
            }
            _ if !choice.is_empty() => Some(choice.to_string()),
            _ => None,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init_logging(cli.debug);

    let mut config = Config::new();
    if let Some(model) = cli.model {
        config.model = Some(model);
    }
    log::debug!("Dialogs in {}", config.dialog_save_path.display());

    let resolver = Arc::new(BackendResolver::new(config.clone()).with_selector(Arc::new(PromptSelector)));
    let storage = TimelineStorage::from_config(&config);

    match cli.command {
        Commands::Chat { dialog } => run_chat(config, resolver, dialog).await,
        Commands::Send { agent, message } => send_to_agent(config, resolver, &agent, &message).await,
        Commands::ListDialogs => {
            print_entries("Saved dialogs", &storage.list_saved_dialogs());
            Ok(())
        }
        Commands::ListAgents => {
            print_entries("Agents", &storage.list_agents());
            Ok(())
        }
        Commands::NewDialog { name } => {
            let path = storage.save_new_dialog(&name)?;
            println!("{}", format!("Created {}", path.display()).green());
            Ok(())
        }
        Commands::NewAgent { name } => {
            let path = storage.save_new_agent(&name)?;
            println!("{}", format!("Created {}", path.display()).green());
            Ok(())
        }
    }
}

fn print_entries(title: &str, entries: &[DialogEntry]) {
    if entries.is_empty() {
        println!("{}", format!("No {} found", title.to_lowercase()).yellow());
        return;
    }
    println!("{}", format!("{title}:").cyan().bold());
    for (number, entry) in entries.iter().enumerate() {
        println!("  {}. {}", number + 1, entry);
    }
}

async fn send_to_agent(
    config: Config,
    resolver: Arc<BackendResolver>,
    agent_id: &str,
    message: &str,
) -> anyhow::Result<()> {
    let agents = load_all_agents([config.agents_dir.as_path()]);
    let manager = AgentDialogManager::new(agents, None, config, resolver)?;
    let agent = manager
        .find_agent(agent_id)
        .await
        .ok_or_else(|| anyhow::anyhow!("No agent named '{agent_id}'"))?;

    manager.prepare_agent(&agent).await?;
    let response = manager.message(&agent, message).await?;
    println!("{}", format!("{}:", agent.id()).green().bold());
    println!("{response}");
    Ok(())
}

async fn run_chat(
    config: Config,
    resolver: Arc<BackendResolver>,
    dialog: Option<String>,
) -> anyhow::Result<()> {
    let (manager, handle) = match dialog {
        Some(filename) => {
            let manager = BasicDialogManager::new(config, resolver);
            let handle = manager.load_dialog(&filename).await?;
            (Some(manager), handle)
        }
        None => {
            let backend = resolver.resolve(config.model.as_deref())?;
            let processor = CommandProcessor::new(backend, &config).with_resolver(resolver);
            (None, Arc::new(Mutex::new(processor)))
        }
    };

    println!("{}", "Timeline dialog".cyan().bold());
    println!(
        "{}",
        "End a message with an empty line. Type 'cmd' for commands, 'quit' to leave.".dimmed()
    );
    println!();

    loop {
        print!("{} ", "You:".cyan().bold());
        io::stdout().flush()?;

        let Some(input) = read_message()? else {
            break;
        };
        let trimmed = input.trim();
        if trimmed.is_empty() {
            continue;
        }
        if trimmed.eq_ignore_ascii_case("exit") || trimmed.eq_ignore_ascii_case("quit") {
            break;
        }
        if trimmed.eq_ignore_ascii_case("cmd") {
            if !command_mode(&handle).await? {
                break;
            }
            continue;
        }

        let reply = match &manager {
            Some(manager) => manager.message(&handle, &input).await?.into_text(),
            None => handle.lock().await.process_single_message(&input).await,
        };
        if reply.starts_with("Error") {
            println!("{}", reply.red());
        } else {
            println!("{}", "Model:".green().bold());
            println!("{reply}");
        }
        println!();
    }

    println!("{}", "Goodbye!".cyan());
    Ok(())
}

/// Lines up to the first empty one, `None` at end of input
fn read_message() -> io::Result<Option<String>> {
    let stdin = io::stdin();
    let mut lines = Vec::new();
    for line in stdin.lock().lines() {
        let line = line?;
        let trimmed = line.trim();
        // Control words take effect without the trailing empty line
        if lines.is_empty() && matches!(trimmed, "cmd" | "exit" | "quit") {
            return Ok(Some(trimmed.to_string()));
        }
        if trimmed.is_empty() {
            if lines.is_empty() {
                continue;
            }
            return Ok(Some(lines.join("\n")));
        }
        lines.push(line);
    }
    Ok(if lines.is_empty() { None } else { Some(lines.join("\n")) })
}

/// Returns `false` when the user asked to quit
async fn command_mode(handle: &ProcessorHandle) -> anyhow::Result<bool> {
    println!("{}", "Command mode. Type 'help' for commands, 'i' to return to chat.".dimmed());
    let stdin = io::stdin();
    loop {
        print!("{} ", "cmd>".yellow().bold());
        io::stdout().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            return Ok(false);
        }

        let output = handle.lock().await.execute_line(&line);
        match output {
            Ok(CommandOutput::Text(text)) => println!("{text}"),
            Ok(CommandOutput::Interactive) => return Ok(true),
            Ok(CommandOutput::Exit) => return Ok(false),
            Ok(CommandOutput::None) => {}
            Err(e) => println!("{}", e.to_string().red()),
        }
    }
}
