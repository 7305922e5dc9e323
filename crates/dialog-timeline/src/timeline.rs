use std::fmt;
use std::path::{Path, PathBuf};

use dialog_core::file_ref::reconstruct_file_message;
use dialog_core::{Message, Role};

use crate::document::{TimelineDocument, TimelineMetadata};
use crate::error::{Result, TimelineError};
use crate::segment::{insert_segment, normalize_segments, FrozenSegment, StartMode};

const DEFAULT_NAME: &str = "Default Name";
const DEFAULT_DESCRIPTION: &str = "Default Description";

/// Where a timeline is loaded from
#[derive(Debug, Clone)]
pub enum TimelineSource {
    Path(PathBuf),
    Json(String),
    Document(TimelineDocument),
}

impl From<&Path> for TimelineSource {
    fn from(path: &Path) -> Self {
        TimelineSource::Path(path.to_path_buf())
    }
}

impl From<PathBuf> for TimelineSource {
    fn from(path: PathBuf) -> Self {
        TimelineSource::Path(path)
    }
}

impl From<TimelineDocument> for TimelineSource {
    fn from(document: TimelineDocument) -> Self {
        TimelineSource::Document(document)
    }
}

/// Summary returned by [`Timeline::head`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimelineHead {
    pub total: usize,
    pub current_position: Option<usize>,
}

impl fmt::Display for TimelineHead {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Total messages in history: {}", self.total)?;
        match self.current_position {
            Some(position) => write!(f, "Current position in timeline: Message {position}"),
            None => write!(f, "Current position in timeline: none"),
        }
    }
}

/// Ordered dialog history with frozen segments, a cursor and an optional
/// system message kept outside the history.
///
/// Invariants:
/// - `frozen_segments` are sorted ascending and pairwise disjoint
/// - every frozen index is `< history.len()`
/// - `current_position` is `Some(valid index)` iff `history` is non-empty
#[derive(Debug, Clone, Default)]
pub struct Timeline {
    history: Vec<Message>,
    current_position: Option<usize>,
    frozen_segments: Vec<FrozenSegment>,
    system_message: Option<Message>,
    start_mode: StartMode,
    name: Option<String>,
    description: Option<String>,
    loaded_filename: Option<PathBuf>,
}

impl Timeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn history(&self) -> &[Message] {
        &self.history
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    pub fn message(&self, index: usize) -> Option<&Message> {
        self.history.get(index)
    }

    pub fn current_position(&self) -> Option<usize> {
        self.current_position
    }

    pub fn frozen_segments(&self) -> &[FrozenSegment] {
        &self.frozen_segments
    }

    /// Start mode read from the last load; recomputed on every save
    pub fn start_mode(&self) -> StartMode {
        self.start_mode
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn loaded_filename(&self) -> Option<&Path> {
        self.loaded_filename.as_deref()
    }

    /// Insert a message right after the cursor and move the cursor onto it.
    /// Returns the new message's index.
    pub fn add_message(&mut self, role: Role, text: impl Into<String>) -> usize {
        let insert_index = self
            .current_position
            .map_or(0, |position| position + 1)
            .min(self.history.len());
        self.history.insert(insert_index, Message::new(role, text));
        self.current_position = Some(insert_index);
        insert_index
    }

    pub fn set_current_position(&mut self, index: usize) -> Result<()> {
        if index >= self.history.len() {
            return Err(TimelineError::IndexOutOfRange {
                index,
                len: self.history.len(),
            });
        }
        self.current_position = Some(index);
        Ok(())
    }

    pub fn set_system_message(&mut self, text: impl Into<String>) {
        self.system_message = Some(Message::system(text));
    }

    pub fn delete_system_message(&mut self) {
        self.system_message = None;
    }

    pub fn get_system_message(&self) -> Option<&Message> {
        self.system_message.as_ref()
    }

    /// Freeze `[start, end]` so it survives the next save/load round trip.
    pub fn freeze(&mut self, start: usize, end: usize) -> Result<()> {
        self.frozen_segments = insert_segment(
            &self.frozen_segments,
            FrozenSegment::new(start, end),
            self.history.len(),
        )?;
        Ok(())
    }

    /// Persisted form, with the start mode recomputed from the segments
    pub fn to_document(&self, name: Option<&str>, description: Option<&str>) -> TimelineDocument {
        let name = name
            .or(self.name.as_deref())
            .unwrap_or(DEFAULT_NAME)
            .to_string();
        let description = description
            .or(self.description.as_deref())
            .unwrap_or(DEFAULT_DESCRIPTION)
            .to_string();

        TimelineDocument {
            history: self.history.clone(),
            metadata: TimelineMetadata {
                frozen_segments: self.frozen_segments.clone(),
                start_mode: StartMode::for_segments(&self.frozen_segments),
                name,
                description,
            },
            system_message: self.system_message.clone(),
        }
    }

    pub fn save(
        &self,
        destination: &Path,
        name: Option<&str>,
        description: Option<&str>,
    ) -> Result<()> {
        let document = self.to_document(name, description);
        document.write(destination)?;
        log::info!(
            "Saved timeline '{}' ({} messages) to {}",
            document.metadata.name,
            document.history.len(),
            destination.display()
        );
        Ok(())
    }

    /// Replace this timeline's state with `source`.
    ///
    /// Without frozen segments the whole history is loaded and the cursor
    /// goes to the last message. With frozen segments only the frozen
    /// messages are kept, segments are renumbered from 0, and the cursor goes
    /// to the start of the first segment; anything after the last frozen
    /// segment is dropped. On error the timeline is left unchanged.
    pub fn load(&mut self, source: impl Into<TimelineSource>) -> Result<()> {
        let (document, loaded_filename) = match source.into() {
            TimelineSource::Path(path) => {
                if !path.exists() {
                    return Err(TimelineError::NotFound(path));
                }
                (TimelineDocument::read(&path)?, Some(path))
            }
            TimelineSource::Json(json) => (TimelineDocument::from_json(&json)?, None),
            TimelineSource::Document(document) => (document, None),
        };

        let loaded = Self::from_document(document)?;
        *self = Timeline {
            loaded_filename,
            ..loaded
        };
        log::debug!(
            "Timeline loaded with {} messages, {} frozen segments, cursor {:?}",
            self.history.len(),
            self.frozen_segments.len(),
            self.current_position
        );
        Ok(())
    }

    fn from_document(document: TimelineDocument) -> Result<Timeline> {
        let TimelineDocument {
            history: persisted,
            metadata,
            system_message,
        } = document;

        let mut timeline = Timeline {
            system_message: system_message.map(reconstruct_message),
            start_mode: metadata.start_mode,
            name: Some(metadata.name).filter(|name| !name.is_empty()),
            description: Some(metadata.description).filter(|d| !d.is_empty()),
            ..Timeline::default()
        };

        if metadata.frozen_segments.is_empty() {
            timeline.history = persisted.into_iter().map(reconstruct_message).collect();
            timeline.current_position = timeline.history.len().checked_sub(1);
            return Ok(timeline);
        }

        let segments = normalize_segments(&metadata.frozen_segments, persisted.len())?;
        for segment in &segments {
            let new_start = timeline.history.len();
            timeline.history.extend(
                persisted[segment.start..=segment.end]
                    .iter()
                    .cloned()
                    .map(reconstruct_message),
            );
            timeline
                .frozen_segments
                .push(FrozenSegment::new(new_start, timeline.history.len() - 1));
        }
        timeline.current_position = timeline.frozen_segments.first().map(|segment| segment.start);
        Ok(timeline)
    }
}

/// Re-read files referenced by `File sent:` messages
fn reconstruct_message(message: Message) -> Message {
    match reconstruct_file_message(message.text()) {
        Some(text) => Message::new(message.role(), text),
        None => message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dialog_core::file_ref::format_file_message;
    use tempfile::tempdir;

    fn five_message_timeline() -> Timeline {
        let mut timeline = Timeline::new();
        for i in 0..5 {
            let role = if i % 2 == 0 { Role::User } else { Role::Model };
            timeline.add_message(role, format!("message {i}"));
        }
        timeline
    }

    fn texts(timeline: &Timeline) -> Vec<&str> {
        timeline.history().iter().map(Message::text).collect()
    }

    fn assert_invariants(timeline: &Timeline) {
        let segments = timeline.frozen_segments();
        for pair in segments.windows(2) {
            assert!(pair[0].end < pair[1].start, "segments overlap or unsorted");
        }
        for segment in segments {
            assert!(segment.end < timeline.len());
        }
        match timeline.current_position() {
            Some(position) => assert!(position < timeline.len()),
            None => assert!(timeline.is_empty()),
        }
    }

    #[test]
    fn test_add_message_on_empty_inserts_at_zero() {
        let mut timeline = Timeline::new();
        assert_eq!(timeline.current_position(), None);
        let index = timeline.add_message(Role::User, "first");
        assert_eq!(index, 0);
        assert_eq!(timeline.current_position(), Some(0));
    }

    #[test]
    fn test_cursor_tracks_most_recent_message() {
        let mut timeline = Timeline::new();
        for i in 0..4 {
            let index = timeline.add_message(Role::User, format!("m{i}"));
            assert_eq!(timeline.current_position(), Some(index));
            assert_invariants(&timeline);
        }
        assert_eq!(timeline.current_position(), Some(3));
    }

    #[test]
    fn test_add_message_inserts_after_cursor() {
        let mut timeline = five_message_timeline();
        timeline.set_current_position(1).unwrap();
        let index = timeline.add_message(Role::User, "branch");
        assert_eq!(index, 2);
        assert_eq!(timeline.message(2).unwrap().text(), "branch");
        assert_eq!(timeline.message(3).unwrap().text(), "message 2");
        assert_eq!(timeline.len(), 6);
    }

    #[test]
    fn test_set_current_position_rejects_out_of_range() {
        let mut timeline = five_message_timeline();
        assert!(matches!(
            timeline.set_current_position(5),
            Err(TimelineError::IndexOutOfRange { index: 5, len: 5 })
        ));
        assert_eq!(timeline.current_position(), Some(4));
    }

    #[test]
    fn test_system_message_is_separate_from_history() {
        let mut timeline = five_message_timeline();
        timeline.freeze(0, 1).unwrap();
        timeline.set_system_message("be brief");

        assert_eq!(timeline.get_system_message().unwrap().text(), "be brief");
        assert_eq!(timeline.get_system_message().unwrap().role(), Role::System);
        assert_eq!(timeline.len(), 5);
        assert_eq!(timeline.current_position(), Some(4));
        assert_eq!(timeline.frozen_segments(), &[FrozenSegment::new(0, 1)]);

        timeline.delete_system_message();
        assert!(timeline.get_system_message().is_none());
        assert_eq!(timeline.current_position(), Some(4));
    }

    #[test]
    fn test_round_trip_without_frozen_segments() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("dialog.json");
        let mut timeline = five_message_timeline();
        timeline.set_system_message("system text");
        timeline.save(&path, Some("demo"), Some("a test")).unwrap();

        let mut loaded = Timeline::new();
        loaded.load(path.as_path()).unwrap();

        assert_eq!(loaded.history(), timeline.history());
        assert_eq!(loaded.current_position(), Some(4));
        assert!(loaded.frozen_segments().is_empty());
        assert_eq!(loaded.get_system_message(), timeline.get_system_message());
        assert_eq!(loaded.name(), Some("demo"));
        assert_eq!(loaded.description(), Some("a test"));
        assert_eq!(loaded.loaded_filename(), Some(path.as_path()));
    }

    #[test]
    fn test_round_trip_with_frozen_prefix_drops_interactive_tail() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("frozen.json");
        let mut timeline = five_message_timeline();
        timeline.freeze(0, 2).unwrap();
        timeline.save(&path, Some("frozen"), None).unwrap();

        let mut loaded = Timeline::new();
        loaded.load(path.as_path()).unwrap();

        assert_eq!(loaded.len(), 3);
        assert_eq!(texts(&loaded), vec!["message 0", "message 1", "message 2"]);
        assert_eq!(loaded.frozen_segments(), &[FrozenSegment::new(0, 2)]);
        assert_eq!(loaded.current_position(), Some(0));
        assert_eq!(loaded.start_mode(), StartMode::Frozen);
        assert_invariants(&loaded);
    }

    #[test]
    fn test_load_remaps_multiple_segments() {
        let json = r#"{
            "history": [
                {"role": "user", "text": "a"},
                {"role": "model", "text": "b"},
                {"role": "user", "text": "c"},
                {"role": "model", "text": "d"},
                {"role": "user", "text": "e"},
                {"role": "model", "text": "f"}
            ],
            "metadata": {
                "frozenSegments": [{"start": 4, "end": 5}, {"start": 1, "end": 2}],
                "startMode": "interactive",
                "name": "gaps",
                "description": ""
            },
            "system_message": null
        }"#;

        let mut timeline = Timeline::new();
        timeline.load(TimelineSource::Json(json.to_string())).unwrap();

        assert_eq!(texts(&timeline), vec!["b", "c", "e", "f"]);
        assert_eq!(
            timeline.frozen_segments(),
            &[FrozenSegment::new(0, 1), FrozenSegment::new(2, 3)]
        );
        assert_eq!(timeline.current_position(), Some(0));
        assert_eq!(timeline.start_mode(), StartMode::Interactive);
        assert_invariants(&timeline);
    }

    #[test]
    fn test_invalid_segments_leave_timeline_untouched() {
        let mut timeline = five_message_timeline();
        let json = r#"{
            "history": [{"role": "user", "text": "a"}],
            "metadata": {"frozenSegments": [{"start": 0, "end": 3}]}
        }"#;

        let result = timeline.load(TimelineSource::Json(json.to_string()));
        assert!(matches!(result, Err(TimelineError::InvalidSegment { .. })));
        assert_eq!(timeline.len(), 5);
        assert_eq!(timeline.current_position(), Some(4));
    }

    #[test]
    fn test_load_empty_history_leaves_cursor_unset() {
        let mut timeline = five_message_timeline();
        timeline
            .load(TimelineDocument::scaffold("blank"))
            .unwrap();
        assert!(timeline.is_empty());
        assert_eq!(timeline.current_position(), None);
        assert_eq!(timeline.get_system_message().unwrap().text(), "");
    }

    #[test]
    fn test_load_missing_path_is_not_found() {
        let dir = tempdir().unwrap();
        let mut timeline = Timeline::new();
        let result = timeline.load(dir.path().join("nope.json"));
        assert!(matches!(result, Err(TimelineError::NotFound(_))));
    }

    #[test]
    fn test_load_rereads_referenced_files() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("notes.txt");
        std::fs::write(&file, "fresh").unwrap();
        let file_path = file.to_str().unwrap();

        let mut document = TimelineDocument::default();
        document
            .history
            .push(Message::user(format_file_message(file_path, "stale")));
        document
            .history
            .push(Message::user(format_file_message("/no/such/file.txt", "gone")));

        let mut timeline = Timeline::new();
        timeline.load(document).unwrap();

        assert_eq!(
            timeline.message(0).unwrap().text(),
            format_file_message(file_path, "fresh")
        );
        assert_eq!(
            timeline.message(1).unwrap().text(),
            "File sent: /no/such/file.txt\nError: File not found at '/no/such/file.txt'"
        );
    }

    #[test]
    fn test_save_recomputes_start_mode() {
        let mut timeline = five_message_timeline();
        timeline.freeze(1, 2).unwrap();
        let document = timeline.to_document(None, None);
        assert_eq!(document.metadata.start_mode, StartMode::Interactive);
        assert_eq!(document.metadata.name, "Default Name");
        assert_eq!(document.metadata.description, "Default Description");

        timeline.freeze(0, 0).unwrap();
        let document = timeline.to_document(None, None);
        assert_eq!(document.metadata.start_mode, StartMode::Frozen);
        assert_eq!(
            document.metadata.frozen_segments,
            vec![FrozenSegment::new(0, 0), FrozenSegment::new(1, 2)]
        );
    }

    #[test]
    fn test_freeze_rejects_overlap() {
        let mut timeline = five_message_timeline();
        timeline.freeze(0, 2).unwrap();
        assert!(timeline.freeze(2, 3).is_err());
        assert!(timeline.freeze(3, 9).is_err());
        assert_eq!(timeline.frozen_segments(), &[FrozenSegment::new(0, 2)]);
    }
}
