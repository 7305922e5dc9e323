//! Timeline storage - the dialogs and agents directories

use std::fmt;
use std::path::{Path, PathBuf};

use dialog_core::paths::with_json_extension;
use dialog_core::Config;
use once_cell::sync::Lazy;
use regex::Regex;
use walkdir::WalkDir;

use crate::document::TimelineDocument;
use crate::error::{Result, TimelineError};

static AGENT_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-zA-Z_][a-zA-Z0-9_]*$").expect("agent name pattern is valid")
});

/// A saved dialog found by [`TimelineStorage::list_dialogs`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DialogEntry {
    pub name: String,
    pub relative_path: PathBuf,
}

impl fmt::Display for DialogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.relative_path.display())
    }
}

/// Strip any extension and check the name is a valid identifier
pub fn validate_agent_name(name: &str) -> Result<String> {
    let stem = Path::new(name)
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();
    if AGENT_NAME.is_match(&stem) {
        Ok(stem)
    } else {
        Err(TimelineError::InvalidAgentName(name.to_string()))
    }
}

#[derive(Debug, Clone)]
pub struct TimelineStorage {
    dialogs_dir: PathBuf,
    agents_dir: PathBuf,
}

impl TimelineStorage {
    pub fn new(dialogs_dir: impl AsRef<Path>, agents_dir: impl AsRef<Path>) -> Self {
        Self {
            dialogs_dir: dialogs_dir.as_ref().to_path_buf(),
            agents_dir: agents_dir.as_ref().to_path_buf(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.dialog_save_path, &config.agents_dir)
    }

    pub fn dialogs_dir(&self) -> &Path {
        &self.dialogs_dir
    }

    pub fn agents_dir(&self) -> &Path {
        &self.agents_dir
    }

    pub fn dialog_path(&self, filename: &str) -> PathBuf {
        self.dialogs_dir.join(with_json_extension(filename))
    }

    pub fn agent_path(&self, agent_name: &str) -> Result<PathBuf> {
        let name = validate_agent_name(agent_name)?;
        Ok(self.agents_dir.join(format!("{name}.json")))
    }

    pub fn save_new_dialog(&self, name: &str) -> Result<PathBuf> {
        let path = self.dialog_path(name);
        TimelineDocument::scaffold(name).write(&path)?;
        log::info!("Created dialog {}", path.display());
        Ok(path)
    }

    pub fn save_new_agent(&self, agent_name: &str) -> Result<PathBuf> {
        let path = self.agent_path(agent_name)?;
        let name = validate_agent_name(agent_name)?;
        TimelineDocument::scaffold(name).write(&path)?;
        log::info!("Created agent {}", path.display());
        Ok(path)
    }

    pub fn list_saved_dialogs(&self) -> Vec<DialogEntry> {
        Self::list_dialogs(&self.dialogs_dir)
    }

    pub fn list_agents(&self) -> Vec<DialogEntry> {
        Self::list_dialogs(&self.agents_dir)
    }

    /// Every `*.json` timeline under `root`, sorted by relative path.
    /// Files that fail to parse are logged and skipped.
    pub fn list_dialogs(root: &Path) -> Vec<DialogEntry> {
        let mut entries = Vec::new();
        for entry in WalkDir::new(root).into_iter().filter_map(|e| e.ok()) {
            let path = entry.path();
            if !entry.file_type().is_file()
                || path.extension().and_then(|ext| ext.to_str()) != Some("json")
            {
                continue;
            }
            match TimelineDocument::read(path) {
                Ok(document) => {
                    let name = if document.metadata.name.is_empty() {
                        "Unnamed Dialog".to_string()
                    } else {
                        document.metadata.name
                    };
                    let relative_path = path.strip_prefix(root).unwrap_or(path).to_path_buf();
                    entries.push(DialogEntry {
                        name,
                        relative_path,
                    });
                }
                Err(e) => log::warn!("Failed to read {}: {}", path.display(), e),
            }
        }
        entries.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));
        entries
    }
}
