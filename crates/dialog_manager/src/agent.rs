//! Agents - named timelines seeded from JSON files

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use dialog_timeline::TimelineDocument;
use uuid::Uuid;
use walkdir::WalkDir;

use crate::error::Result;

/// A named seed timeline. The seed is only read when a manager prepares
/// the agent; later turns live in that manager's processor.
#[derive(Debug)]
pub struct Agent {
    id: String,
    filename: PathBuf,
    content: TimelineDocument,
    registered_with: RwLock<Option<Uuid>>,
}

impl Agent {
    pub fn new(id: impl Into<String>, filename: impl Into<PathBuf>, content: TimelineDocument) -> Self {
        Self {
            id: id.into(),
            filename: filename.into(),
            content,
            registered_with: RwLock::new(None),
        }
    }

    /// Read a seed file; the id is the file name up to its first `.`
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = TimelineDocument::read(path)?;
        Ok(Self::new(agent_id(path), path, content))
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn filename(&self) -> &Path {
        &self.filename
    }

    pub fn content(&self) -> &TimelineDocument {
        &self.content
    }

    /// Manager that registered this agent most recently
    pub fn registered_manager(&self) -> Option<Uuid> {
        *self
            .registered_with
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub(crate) fn register_with(&self, manager: Uuid) {
        let mut registered = self
            .registered_with
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *registered = Some(manager);
    }
}

impl fmt::Display for Agent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id)
    }
}

fn agent_id(path: &Path) -> String {
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    match file_name.split_once('.') {
        Some((stem, _)) => stem.to_string(),
        None => file_name,
    }
}

/// Something a manager can turn into an [`Agent`]
#[derive(Debug, Clone)]
pub enum AgentInput {
    Agent(Arc<Agent>),
    Path(PathBuf),
}

impl AgentInput {
    pub fn into_agent(self) -> Result<Arc<Agent>> {
        match self {
            AgentInput::Agent(agent) => Ok(agent),
            AgentInput::Path(path) => Ok(Arc::new(Agent::from_file(&path)?)),
        }
    }
}

impl From<Arc<Agent>> for AgentInput {
    fn from(agent: Arc<Agent>) -> Self {
        AgentInput::Agent(agent)
    }
}

impl From<Agent> for AgentInput {
    fn from(agent: Agent) -> Self {
        AgentInput::Agent(Arc::new(agent))
    }
}

impl From<PathBuf> for AgentInput {
    fn from(path: PathBuf) -> Self {
        AgentInput::Path(path)
    }
}

impl From<&Path> for AgentInput {
    fn from(path: &Path) -> Self {
        AgentInput::Path(path.to_path_buf())
    }
}

/// Load agents from files and directories. Directories contribute their
/// `*.json` files (not recursive, sorted by name). Unreadable seeds are
/// logged and skipped.
pub fn load_all_agents<I, P>(paths: I) -> Vec<Arc<Agent>>
where
    I: IntoIterator<Item = P>,
    P: AsRef<Path>,
{
    let mut files = Vec::new();
    for path in paths {
        let path = path.as_ref();
        if path.is_dir() {
            for entry in WalkDir::new(path)
                .min_depth(1)
                .max_depth(1)
                .sort_by_file_name()
                .into_iter()
                .filter_map(|e| e.ok())
            {
                let is_json = entry.path().extension().and_then(|ext| ext.to_str()) == Some("json");
                if entry.file_type().is_file() && is_json {
                    files.push(entry.into_path());
                }
            }
        } else {
            files.push(path.to_path_buf());
        }
    }

    files
        .into_iter()
        .filter_map(|file| match Agent::from_file(&file) {
            Ok(agent) => {
                log::debug!("Loaded agent {} from {}", agent.id(), file.display());
                Some(Arc::new(agent))
            }
            Err(e) => {
                log::warn!("Skipping agent {}: {}", file.display(), e);
                None
            }
        })
        .collect()
}
