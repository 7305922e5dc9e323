//! dialog-llm - The model backend seam
//!
//! Concrete model callers sit behind [`ModelBackend`]. The rest of the
//! workspace only sees role-tagged [`BackendMessage`] lists going in and text
//! or a [`BackendRequestError`] coming out.

pub mod backend;
pub mod error;
pub mod model_ref;
pub mod providers;
pub mod resolver;

pub use backend::{BackendMessage, BackendPart, BackendRequestError, ModelBackend};
pub use error::{ConfigurationError, Result};
pub use model_ref::ModelRef;
pub use providers::OpenAICompatBackend;
pub use resolver::{BackendFactory, BackendResolver, ModelSelector};
