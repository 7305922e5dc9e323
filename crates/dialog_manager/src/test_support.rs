use std::sync::Arc;

use async_trait::async_trait;
use dialog_core::{Config, ProviderConfig, Role};
use dialog_llm::{BackendMessage, BackendRequestError, BackendResolver, ModelBackend};

/// Replies `<model>: <last user message>`
pub struct EchoBackend(pub String);

#[async_trait]
impl ModelBackend for EchoBackend {
    fn identifier(&self) -> &str {
        "stub"
    }

    async fn generate_content(
        &self,
        conversation: &[BackendMessage],
    ) -> Result<String, BackendRequestError> {
        let last = conversation
            .iter()
            .rev()
            .find(|message| message.role == Role::User)
            .map(BackendMessage::joined_text)
            .unwrap_or_default();
        Ok(format!("{}: {last}", self.0))
    }
}

pub fn echo_factory(
    _provider: &str,
    model_id: &str,
    _settings: &ProviderConfig,
) -> dialog_llm::Result<Arc<dyn ModelBackend>> {
    Ok(Arc::new(EchoBackend(model_id.to_string())))
}

pub fn stub_resolver(config: &Config) -> Arc<BackendResolver> {
    Arc::new(BackendResolver::empty(config.clone()).with_factory("stub", Arc::new(echo_factory)))
}

pub fn config_in(dir: &std::path::Path) -> Config {
    Config {
        model: Some("stub:echo".to_string()),
        dialog_save_path: dir.join("dialogs"),
        message_export_path: dir.join("exports"),
        agents_dir: dir.join("agents"),
        ..Config::default()
    }
}
