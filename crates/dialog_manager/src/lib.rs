//! # Dialog Manager
//!
//! Routes messages to [`CommandProcessor`]s, either one per saved dialog file
//! ([`BasicDialogManager`]) or one per named agent ([`AgentDialogManager`]).
//! Processors are handed out behind an async mutex so concurrent turns on
//! the same dialog run one at a time.

pub mod agent;
pub mod agent_manager;
pub mod basic;
pub mod error;
pub mod response;

#[cfg(test)]
mod test_support;

use std::sync::Arc;

use async_trait::async_trait;
use dialog_processor::CommandProcessor;

// Re-exports
pub use agent::{load_all_agents, Agent, AgentInput};
pub use agent_manager::AgentDialogManager;
pub use basic::BasicDialogManager;
pub use error::{DialogError, Result};
pub use response::Response;

/// Shared handle to a processor owned by a manager
pub type ProcessorHandle = Arc<tokio::sync::Mutex<CommandProcessor>>;

/// `message(target, input) -> Response`, where the target names a dialog
#[async_trait]
pub trait DialogManager: Send + Sync {
    type Target: Send + Sync;

    async fn message(&self, target: &Self::Target, input: &str) -> Result<Response>;
}
