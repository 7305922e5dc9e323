use async_trait::async_trait;
use dialog_core::{ProviderConfig, Role};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::backend::{BackendMessage, BackendRequestError, ModelBackend};
use crate::error::ConfigurationError;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

fn wire_role(role: Role) -> &'static str {
    match role {
        Role::User => "user",
        Role::Model => "assistant",
        Role::System => "system",
    }
}

/// Backend for any `/chat/completions` endpoint (OpenAI, Groq, xAI, Ollama...)
pub struct OpenAICompatBackend {
    client: Client,
    identifier: String,
    api_key: String,
    base_url: String,
    model: String,
}

impl OpenAICompatBackend {
    pub fn new(identifier: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            identifier: identifier.into(),
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            model: "gpt-4o-mini".to_string(),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    /// Build from provider settings. A key is required unless a custom base
    /// URL points somewhere keyless, such as a local server.
    pub fn from_settings(
        identifier: &str,
        model_id: &str,
        settings: &ProviderConfig,
    ) -> Result<Self, ConfigurationError> {
        let base_url = settings.base_url.as_deref().filter(|url| !url.is_empty());
        if settings.api_key.is_empty() && base_url.is_none() {
            return Err(ConfigurationError::MissingSettings {
                provider: identifier.to_string(),
                reason: "API key is required".to_string(),
            });
        }

        let mut backend = Self::new(identifier, settings.api_key.clone()).with_model(model_id);
        if let Some(base_url) = base_url {
            backend = backend.with_base_url(base_url);
        }
        Ok(backend)
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn error(&self, message: impl Into<String>) -> BackendRequestError {
        BackendRequestError::new(self.identifier.clone(), message)
    }
}

#[async_trait]
impl ModelBackend for OpenAICompatBackend {
    fn identifier(&self) -> &str {
        &self.identifier
    }

    async fn generate_content(
        &self,
        conversation: &[BackendMessage],
    ) -> Result<String, BackendRequestError> {
        let joined: Vec<(Role, String)> = conversation
            .iter()
            .map(|message| (message.role, message.joined_text()))
            .collect();
        let body = ChatRequest {
            model: &self.model,
            messages: joined
                .iter()
                .map(|(role, text)| ChatMessage {
                    role: wire_role(*role),
                    content: text,
                })
                .collect(),
        };

        log::debug!(
            "POST {}/chat/completions ({} messages, model {})",
            self.base_url,
            conversation.len(),
            self.model
        );

        let mut request = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .json(&body);
        if !self.api_key.is_empty() {
            request = request.bearer_auth(&self.api_key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| self.error(format!("request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(self.error(format!("HTTP {status}: {text}")));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| self.error(format!("invalid response body: {e}")))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| self.error("response contained no message content"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn backend_for(server: &MockServer) -> OpenAICompatBackend {
        let client = Client::builder().no_proxy().build().expect("client");
        OpenAICompatBackend::new("openai", "sk-test")
            .with_client(client)
            .with_base_url(server.uri())
            .with_model("gpt-test")
    }

    #[tokio::test]
    async fn test_generate_content_maps_roles_and_reads_reply() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .and(body_partial_json(serde_json::json!({
                "model": "gpt-test",
                "messages": [
                    {"role": "system", "content": "be brief"},
                    {"role": "user", "content": "hello"},
                    {"role": "assistant", "content": "hi"},
                    {"role": "user", "content": "again"}
                ]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{"message": {"role": "assistant", "content": "sure"}}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let conversation = vec![
            BackendMessage::text(Role::System, "be brief"),
            BackendMessage::text(Role::User, "hello"),
            BackendMessage::text(Role::Model, "hi"),
            BackendMessage::text(Role::User, "again"),
        ];
        let reply = backend_for(&server).generate_content(&conversation).await.unwrap();
        assert_eq!(reply, "sure");
    }

    #[tokio::test]
    async fn test_http_error_becomes_backend_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(429).set_body_string("slow down"))
            .mount(&server)
            .await;

        let error = backend_for(&server)
            .generate_content(&[BackendMessage::text(Role::User, "hello")])
            .await
            .unwrap_err();
        assert_eq!(error.backend, "openai");
        assert!(error.message.contains("429"));
        assert!(error.message.contains("slow down"));
    }

    #[tokio::test]
    async fn test_empty_choices_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"choices": []})))
            .mount(&server)
            .await;

        let result = backend_for(&server)
            .generate_content(&[BackendMessage::text(Role::User, "hello")])
            .await;
        assert!(result.is_err());
    }

    #[test]
    fn test_from_settings_requires_key_or_base_url() {
        let missing = OpenAICompatBackend::from_settings("openai", "gpt-4o", &ProviderConfig::default());
        assert!(matches!(missing, Err(ConfigurationError::MissingSettings { .. })));

        let local = OpenAICompatBackend::from_settings(
            "ollama",
            "llama3",
            &ProviderConfig {
                api_key: String::new(),
                base_url: Some("http://localhost:11434/v1".to_string()),
                model: None,
            },
        )
        .unwrap();
        assert_eq!(local.identifier(), "ollama");
        assert_eq!(local.model(), "llama3");
    }
}
