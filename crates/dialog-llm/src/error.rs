use thiserror::Error;

/// No usable backend could be resolved
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("No model configured")]
    NoModelConfigured,

    #[error("Invalid model reference '{0}': expected provider or provider:model_id")]
    InvalidModelRef(String),

    #[error("Unknown provider: {provider}. Available providers: {available}")]
    UnknownProvider { provider: String, available: String },

    #[error("{provider} configuration required: {reason}")]
    MissingSettings { provider: String, reason: String },
}

pub type Result<T> = std::result::Result<T, ConfigurationError>;
