use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use dialog_core::file_ref;
use dialog_core::{Config, Role};
use dialog_llm::{BackendMessage, BackendRequestError, BackendResolver, ModelBackend};
use dialog_timeline::{Timeline, TimelineStorage};

use crate::error::{ProcessError, Result};

/// Drives one [`Timeline`] against one [`ModelBackend`].
///
/// Every turn appends a user message and its model reply together. A
/// failed or timed-out backend call appends nothing, so the timeline never
/// keeps a question without an answer.
pub struct CommandProcessor {
    timeline: Timeline,
    backend: Arc<dyn ModelBackend>,
    storage: TimelineStorage,
    export_dir: PathBuf,
    request_timeout: Option<Duration>,
    resolver: Option<Arc<BackendResolver>>,
}

impl CommandProcessor {
    /// Empty timeline, directories from `config`
    pub fn new(backend: Arc<dyn ModelBackend>, config: &Config) -> Self {
        Self {
            timeline: Timeline::new(),
            backend,
            storage: TimelineStorage::from_config(config),
            export_dir: config.message_export_path.clone(),
            request_timeout: config.request_timeout(),
            resolver: None,
        }
    }

    pub fn with_timeline(mut self, timeline: Timeline) -> Self {
        self.timeline = timeline;
        self
    }

    pub fn with_resolver(mut self, resolver: Arc<BackendResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    pub fn with_request_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    pub fn timeline_mut(&mut self) -> &mut Timeline {
        &mut self.timeline
    }

    pub fn backend(&self) -> &Arc<dyn ModelBackend> {
        &self.backend
    }

    pub fn set_backend(&mut self, backend: Arc<dyn ModelBackend>) {
        log::info!("Backend switched to {}", backend.identifier());
        self.backend = backend;
    }

    pub fn storage(&self) -> &TimelineStorage {
        &self.storage
    }

    pub fn export_dir(&self) -> &Path {
        &self.export_dir
    }

    pub fn resolver(&self) -> Option<&Arc<BackendResolver>> {
        self.resolver.as_ref()
    }

    /// The system message (if any) followed by every non-blank history
    /// message, in the backend's wire shape.
    pub fn build_context(&self) -> Vec<BackendMessage> {
        self.timeline
            .get_system_message()
            .into_iter()
            .chain(self.timeline.history().iter().filter(|m| !m.is_blank()))
            .map(BackendMessage::from)
            .collect()
    }

    /// Send one user turn and return the model's reply.
    ///
    /// `file <path>` inputs are expanded into the file's content first.
    /// Input errors and backend errors both leave the timeline as it was.
    pub async fn process_message(&mut self, user_input: &str) -> Result<String> {
        let mut context = self.build_context();

        let text = match file_ref::parse_file_command(user_input) {
            Some(path) => file_ref::expand_file(path)?,
            None => user_input.to_string(),
        };
        if text.trim().is_empty() {
            return Err(ProcessError::EmptyMessage);
        }

        context.push(BackendMessage::text(Role::User, text.as_str()));

        // Nothing is written until the reply is in; a dropped call leaves no trace.
        match self.call_backend(&context).await {
            Ok(reply) => {
                self.timeline.add_message(Role::User, text);
                self.timeline.add_message(Role::Model, reply.as_str());
                log::debug!(
                    "{} replied ({} chars), timeline now {} messages",
                    self.backend.identifier(),
                    reply.len(),
                    self.timeline.len()
                );
                Ok(reply)
            }
            Err(e) => {
                log::warn!("{e}");
                Err(e.into())
            }
        }
    }

    /// [`process_message`](Self::process_message) with errors flattened into
    /// their display text.
    pub async fn process_single_message(&mut self, user_input: &str) -> String {
        match self.process_message(user_input).await {
            Ok(reply) => reply,
            Err(e) => e.to_string(),
        }
    }

    async fn call_backend(
        &self,
        context: &[BackendMessage],
    ) -> std::result::Result<String, BackendRequestError> {
        let request = self.backend.generate_content(context);
        match self.request_timeout {
            Some(limit) => match tokio::time::timeout(limit, request).await {
                Ok(result) => result,
                Err(_) => Err(BackendRequestError::new(
                    self.backend.identifier(),
                    format!("request timed out after {limit:?}"),
                )),
            },
            None => request.await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{EchoBackend, FailingBackend, SlowBackend};
    use tempfile::tempdir;

    fn config_in(dir: &Path) -> Config {
        Config {
            dialog_save_path: dir.join("dialogs"),
            message_export_path: dir.join("exports"),
            agents_dir: dir.join("agents"),
            ..Config::default()
        }
    }

    #[tokio::test]
    async fn test_successful_turn_appends_user_and_model() {
        let dir = tempdir().unwrap();
        let backend = EchoBackend::shared();
        let mut processor = CommandProcessor::new(backend.clone(), &config_in(dir.path()));

        let reply = processor.process_single_message("hello").await;
        assert_eq!(reply, "echo: hello");

        let history = processor.timeline().history();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].role(), Role::User);
        assert_eq!(history[1].role(), Role::Model);
        assert_eq!(processor.timeline().current_position(), Some(1));
    }

    #[tokio::test]
    async fn test_context_includes_system_and_skips_blank() {
        let dir = tempdir().unwrap();
        let backend = EchoBackend::shared();
        let mut processor = CommandProcessor::new(backend.clone(), &config_in(dir.path()));
        processor.timeline_mut().set_system_message("be terse");
        processor.timeline_mut().add_message(Role::User, "first");
        processor.timeline_mut().add_message(Role::Model, "   ");

        processor.process_message("second").await.unwrap();

        let sent: Vec<(Role, String)> = backend
            .last_conversation()
            .iter()
            .map(|m| (m.role, m.joined_text()))
            .collect();
        assert_eq!(
            sent,
            vec![
                (Role::System, "be terse".to_string()),
                (Role::User, "first".to_string()),
                (Role::User, "second".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_failed_backend_rolls_back() {
        let dir = tempdir().unwrap();
        let mut processor = CommandProcessor::new(Arc::new(FailingBackend), &config_in(dir.path()));
        processor.timeline_mut().add_message(Role::User, "earlier");
        processor.timeline_mut().add_message(Role::Model, "answer");
        let before = processor.timeline().history().to_vec();

        let reply = processor.process_single_message("hello").await;

        assert_eq!(reply, "Error with failing model: service unavailable");
        assert_eq!(processor.timeline().history(), before.as_slice());
        assert_eq!(processor.timeline().current_position(), Some(1));
    }

    #[tokio::test]
    async fn test_failed_backend_on_empty_timeline() {
        let dir = tempdir().unwrap();
        let mut processor = CommandProcessor::new(Arc::new(FailingBackend), &config_in(dir.path()));

        let result = processor.process_message("hello").await;

        assert!(matches!(result, Err(ProcessError::Backend(_))));
        assert!(processor.timeline().is_empty());
        assert_eq!(processor.timeline().current_position(), None);
    }

    #[tokio::test]
    async fn test_rollback_after_mid_timeline_insert() {
        let dir = tempdir().unwrap();
        let mut processor = CommandProcessor::new(Arc::new(FailingBackend), &config_in(dir.path()));
        for text in ["a", "b", "c"] {
            processor.timeline_mut().add_message(Role::User, text);
        }
        processor.timeline_mut().set_current_position(0).unwrap();
        let before = processor.timeline().history().to_vec();

        processor.process_single_message("inserted").await;

        assert_eq!(processor.timeline().history(), before.as_slice());
        assert_eq!(processor.timeline().current_position(), Some(0));
    }

    #[tokio::test]
    async fn test_timeout_counts_as_backend_failure() {
        let dir = tempdir().unwrap();
        let mut processor = CommandProcessor::new(
            Arc::new(SlowBackend(Duration::from_secs(5))),
            &config_in(dir.path()),
        )
        .with_request_timeout(Some(Duration::from_millis(20)));

        let reply = processor.process_single_message("hello").await;

        assert!(reply.starts_with("Error with slow model: request timed out"));
        assert!(processor.timeline().is_empty());
    }

    #[tokio::test]
    async fn test_dropped_turn_leaves_timeline_unchanged() {
        let dir = tempdir().unwrap();
        let mut processor = CommandProcessor::new(
            Arc::new(SlowBackend(Duration::from_secs(5))),
            &config_in(dir.path()),
        );
        processor.timeline_mut().add_message(Role::User, "earlier");
        processor.timeline_mut().add_message(Role::Model, "answer");
        let before = processor.timeline().history().to_vec();

        let outcome = tokio::time::timeout(
            Duration::from_millis(20),
            processor.process_single_message("hello"),
        )
        .await;

        assert!(outcome.is_err());
        assert_eq!(processor.timeline().history(), before.as_slice());
        assert_eq!(processor.timeline().current_position(), Some(1));
    }

    #[tokio::test]
    async fn test_empty_input_is_rejected_without_mutation() {
        let dir = tempdir().unwrap();
        let mut processor = CommandProcessor::new(EchoBackend::shared(), &config_in(dir.path()));

        let reply = processor.process_single_message("   ").await;

        assert_eq!(reply, "Error: Empty message not processed.");
        assert!(processor.timeline().is_empty());
    }

    #[tokio::test]
    async fn test_file_input_is_expanded() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("notes.txt");
        std::fs::write(&file, "remember the milk").unwrap();
        let backend = EchoBackend::shared();
        let mut processor = CommandProcessor::new(backend.clone(), &config_in(dir.path()));

        processor
            .process_message(&format!("file {}", file.display()))
            .await
            .unwrap();

        let stored = processor.timeline().message(0).unwrap().text().to_string();
        assert!(stored.starts_with("File sent: "));
        assert!(stored.ends_with("\n\nFile Content:\nremember the milk"));
        assert!(stored.contains(&file.display().to_string()));
        assert_eq!(backend.last_conversation()[0].joined_text(), stored);
    }

    #[tokio::test]
    async fn test_missing_file_fails_before_backend_call() {
        let dir = tempdir().unwrap();
        let backend = EchoBackend::shared();
        let mut processor = CommandProcessor::new(backend.clone(), &config_in(dir.path()));

        let missing = dir.path().join("absent.txt");
        let result = processor
            .process_message(&format!("file {}", missing.display()))
            .await;

        assert!(matches!(
            result,
            Err(ProcessError::File(dialog_core::FileRefError::NotFound(_)))
        ));
        assert!(processor.timeline().is_empty());
        assert!(backend.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_blank_file_is_not_sent() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("blank.txt");
        std::fs::write(&file, "  \n").unwrap();
        let mut processor = CommandProcessor::new(EchoBackend::shared(), &config_in(dir.path()));

        let result = processor
            .process_message(&format!("file {}", file.display()))
            .await;

        assert!(matches!(
            result,
            Err(ProcessError::File(dialog_core::FileRefError::Empty(_)))
        ));
        assert!(processor.timeline().is_empty());
    }
}
