//! One processor per saved dialog file

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use dialog_core::paths::with_json_extension;
use dialog_core::Config;
use dialog_llm::{BackendResolver, ModelBackend};
use dialog_processor::CommandProcessor;
use dialog_timeline::TimelineStorage;
use tokio::sync::{Mutex, RwLock};

use crate::error::{DialogError, Result};
use crate::response::Response;
use crate::{DialogManager, ProcessorHandle};

#[derive(Default)]
struct BasicState {
    processors: HashMap<String, ProcessorHandle>,
    active: Option<String>,
    backend: Option<Arc<dyn ModelBackend>>,
}

/// Keeps one [`CommandProcessor`] per dialog file. All dialogs share a
/// single backend, created on first use.
pub struct BasicDialogManager {
    config: Config,
    resolver: Arc<BackendResolver>,
    storage: TimelineStorage,
    state: RwLock<BasicState>,
}

impl BasicDialogManager {
    pub fn new(config: Config, resolver: Arc<BackendResolver>) -> Self {
        let storage = TimelineStorage::from_config(&config);
        Self {
            config,
            resolver,
            storage,
            state: RwLock::new(BasicState::default()),
        }
    }

    /// Processor for `filename` under the dialog save path, created and
    /// loaded on the first call. Makes the dialog active. `chat` and
    /// `chat.json` name the same dialog.
    pub async fn load_dialog(&self, filename: &str) -> Result<ProcessorHandle> {
        let key = with_json_extension(filename);
        let mut state = self.state.write().await;
        if let Some(handle) = state.processors.get(&key).cloned() {
            state.active = Some(key);
            return Ok(handle);
        }

        let path = self.storage.dialog_path(&key);
        if !path.exists() {
            return Err(DialogError::DialogNotFound(path));
        }

        let backend = match state.backend.clone() {
            Some(backend) => backend,
            None => {
                let backend = self.resolver.resolve(self.config.model.as_deref())?;
                state.backend = Some(backend.clone());
                backend
            }
        };

        let mut processor =
            CommandProcessor::new(backend, &self.config).with_resolver(self.resolver.clone());
        processor.timeline_mut().load(path.clone())?;
        log::info!("Loaded dialog {} from {}", key, path.display());

        let handle = Arc::new(Mutex::new(processor));
        state.processors.insert(key.clone(), handle.clone());
        state.active = Some(key);
        Ok(handle)
    }

    /// Send `input` through `processor`, which must come from
    /// [`load_dialog`](Self::load_dialog) on this manager.
    pub async fn message(&self, processor: &ProcessorHandle, input: &str) -> Result<Response> {
        {
            let mut state = self.state.write().await;
            let filename = state
                .processors
                .iter()
                .find(|(_, handle)| Arc::ptr_eq(handle, processor))
                .map(|(filename, _)| filename.clone())
                .ok_or(DialogError::UnregisteredProcessor)?;
            state.active = Some(filename);
        }

        let mut processor = processor.lock().await;
        Ok(Response::new(processor.process_single_message(input).await))
    }

    pub async fn get_active_processor(&self) -> Option<ProcessorHandle> {
        let state = self.state.read().await;
        state
            .active
            .as_ref()
            .and_then(|filename| state.processors.get(filename).cloned())
    }

    pub async fn active_dialog(&self) -> Option<String> {
        self.state.read().await.active.clone()
    }
}

#[async_trait]
impl DialogManager for BasicDialogManager {
    type Target = ProcessorHandle;

    async fn message(&self, target: &ProcessorHandle, input: &str) -> Result<Response> {
        BasicDialogManager::message(self, target, input).await
    }
}
