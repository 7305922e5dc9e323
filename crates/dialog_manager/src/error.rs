//! Dialog manager error types

use std::path::PathBuf;

use dialog_llm::ConfigurationError;
use dialog_timeline::TimelineError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DialogError {
    #[error("Dialog file not found: {0}")]
    DialogNotFound(PathBuf),

    #[error("Processor was not created by this dialog manager")]
    UnregisteredProcessor,

    #[error("Agent {0} is not prepared. Call prepare_agent first.")]
    AgentNotPrepared(String),

    #[error("Failed to initialize agent {id}: {source}")]
    AgentInitialization {
        id: String,
        #[source]
        source: TimelineError,
    },

    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("Timeline error: {0}")]
    Timeline(#[from] TimelineError),
}

pub type Result<T> = std::result::Result<T, DialogError>;
