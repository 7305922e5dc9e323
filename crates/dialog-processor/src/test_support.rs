use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use dialog_core::Role;
use dialog_llm::{BackendMessage, BackendRequestError, ModelBackend};

/// Replies `echo: <last message>` and records every conversation it sees
#[derive(Default)]
pub struct EchoBackend {
    pub seen: Mutex<Vec<Vec<BackendMessage>>>,
}

impl EchoBackend {
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn last_conversation(&self) -> Vec<BackendMessage> {
        self.seen.lock().unwrap().last().cloned().unwrap_or_default()
    }
}

#[async_trait]
impl ModelBackend for EchoBackend {
    fn identifier(&self) -> &str {
        "echo"
    }

    async fn generate_content(
        &self,
        conversation: &[BackendMessage],
    ) -> Result<String, BackendRequestError> {
        self.seen.lock().unwrap().push(conversation.to_vec());
        let last = conversation
            .iter()
            .rev()
            .find(|message| message.role == Role::User)
            .map(BackendMessage::joined_text)
            .unwrap_or_default();
        Ok(format!("echo: {last}"))
    }
}

pub struct FailingBackend;

#[async_trait]
impl ModelBackend for FailingBackend {
    fn identifier(&self) -> &str {
        "failing"
    }

    async fn generate_content(
        &self,
        _conversation: &[BackendMessage],
    ) -> Result<String, BackendRequestError> {
        Err(BackendRequestError::new("failing", "service unavailable"))
    }
}

pub struct SlowBackend(pub Duration);

#[async_trait]
impl ModelBackend for SlowBackend {
    fn identifier(&self) -> &str {
        "slow"
    }

    async fn generate_content(
        &self,
        _conversation: &[BackendMessage],
    ) -> Result<String, BackendRequestError> {
        tokio::time::sleep(self.0).await;
        Ok("too late".to_string())
    }
}
