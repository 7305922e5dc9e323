//! dialog-processor - One timeline, one backend
//!
//! [`CommandProcessor`] owns a [`dialog_timeline::Timeline`] and sends it,
//! turn by turn, to a [`dialog_llm::ModelBackend`]. A failed backend call
//! rolls the timeline back to where it was before the turn.

pub mod commands;
pub mod error;
pub mod processor;

#[cfg(test)]
mod test_support;

pub use commands::{CommandOutput, CommandSpec, COMMANDS};
pub use error::{ProcessError, Result};
pub use processor::CommandProcessor;
