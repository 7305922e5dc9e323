use dialog_core::FileRefError;
use dialog_llm::{BackendRequestError, ConfigurationError};
use dialog_timeline::TimelineError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("Error: Empty message not processed.")]
    EmptyMessage,

    #[error("Error: {0}")]
    File(#[from] FileRefError),

    #[error(transparent)]
    Backend(#[from] BackendRequestError),

    #[error("Error: {0}")]
    Timeline(#[from] TimelineError),

    #[error("Error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("Unknown command: {0}. Type 'help' for available commands.")]
    UnknownCommand(String),

    #[error("Usage: {0}")]
    Usage(String),

    #[error("Error: switching models needs a backend resolver")]
    NoResolver,
}

pub type Result<T> = std::result::Result<T, ProcessError>;
