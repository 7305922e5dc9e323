use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TimelineError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Timeline file not found: {0}")]
    NotFound(PathBuf),

    #[error("Invalid frozen segment [{start}, {end}]: {reason}")]
    InvalidSegment {
        start: usize,
        end: usize,
        reason: String,
    },

    #[error("No message at index {index} (history has {len} messages)")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("Invalid agent name '{0}': use letters, numbers and underscores, starting with a letter or underscore")]
    InvalidAgentName(String),
}

pub type Result<T> = std::result::Result<T, TimelineError>;
