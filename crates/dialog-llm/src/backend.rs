use async_trait::async_trait;
use dialog_core::{Message, Role};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One text part of an outgoing message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendPart {
    pub text: String,
}

/// Message shape handed to backends: `{role, parts: [{text}]}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendMessage {
    pub role: Role,
    pub parts: Vec<BackendPart>,
}

impl BackendMessage {
    pub fn text(role: Role, text: impl Into<String>) -> Self {
        Self {
            role,
            parts: vec![BackendPart { text: text.into() }],
        }
    }

    /// All parts concatenated
    pub fn joined_text(&self) -> String {
        self.parts
            .iter()
            .map(|part| part.text.as_str())
            .collect::<Vec<_>>()
            .join("")
    }
}

impl From<&Message> for BackendMessage {
    fn from(message: &Message) -> Self {
        Self::text(message.role(), message.text())
    }
}

/// Failure reported by a backend
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Error with {backend} model: {message}")]
pub struct BackendRequestError {
    pub backend: String,
    pub message: String,
}

impl BackendRequestError {
    pub fn new(backend: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            backend: backend.into(),
            message: message.into(),
        }
    }
}

/// Turns a role-tagged conversation into generated text.
#[async_trait]
pub trait ModelBackend: Send + Sync {
    /// Names the backend in error reports, e.g. `openai`
    fn identifier(&self) -> &str;

    async fn generate_content(
        &self,
        conversation: &[BackendMessage],
    ) -> Result<String, BackendRequestError>;
}
