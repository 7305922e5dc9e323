pub mod document;
pub mod error;
pub mod segment;
pub mod storage;
pub mod timeline;

mod display;

pub use document::{TimelineDocument, TimelineMetadata};
pub use error::{Result, TimelineError};
pub use segment::{FrozenSegment, StartMode};
pub use storage::{DialogEntry, TimelineStorage};
pub use timeline::{Timeline, TimelineHead, TimelineSource};
