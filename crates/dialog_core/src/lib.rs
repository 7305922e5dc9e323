//! dialog_core - Core types shared by every dialog crate
//!
//! This crate provides the foundational pieces used across the workspace:
//! - `message` - Role-tagged Message values
//! - `config` - Config layered from files and environment
//! - `paths` - Well-known directories under the user's home
//! - `file_ref` - The `file <path>` input syntax and `File sent:` messages

pub mod config;
pub mod file_ref;
pub mod message;
pub mod paths;

// Re-export commonly used types
pub use config::{Config, ProviderConfig};
pub use file_ref::FileRefError;
pub use message::{Message, Role};
