//! Model backends
//!
//! Every provider reachable today speaks the `/chat/completions` dialect, so
//! one client covers them all.

pub mod openai;

pub use openai::OpenAICompatBackend;

use std::sync::Arc;

use dialog_core::ProviderConfig;

use crate::backend::ModelBackend;
use crate::error::Result;

/// Factory function registered by [`crate::BackendResolver::new`]
pub fn create_openai_compatible(
    provider: &str,
    model_id: &str,
    settings: &ProviderConfig,
) -> Result<Arc<dyn ModelBackend>> {
    let backend = OpenAICompatBackend::from_settings(provider, model_id, settings)?;
    Ok(Arc::new(backend))
}
