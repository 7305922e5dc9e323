//! Read-only views over a timeline: head, items, diagram and markdown export

use std::path::Path;

use crate::error::{Result, TimelineError};
use crate::timeline::{Timeline, TimelineHead};

const SUMMARY_WORDS: usize = 10;

impl Timeline {
    pub fn head(&self) -> TimelineHead {
        TimelineHead {
            total: self.len(),
            current_position: self.current_position(),
        }
    }

    pub fn display_item(&self, index: usize) -> Option<String> {
        self.message(index).map(|message| {
            format!(
                "Item at index {index}: {}: {}",
                message.role().label(),
                message.text()
            )
        })
    }

    /// `<index>: <first words>` for every message
    pub fn message_summaries(&self) -> Vec<String> {
        self.history()
            .iter()
            .enumerate()
            .map(|(index, message)| {
                let words: Vec<&str> = message.text().split_whitespace().take(SUMMARY_WORDS).collect();
                format!("{index}: {}", words.join(" "))
            })
            .collect()
    }

    /// Frozen segments render as `F(0,1,2)`, interactive messages as bare
    /// indices; the cursor shows as `H`.
    pub fn display_timeline(&self) -> String {
        let mark = |index: usize| {
            if self.current_position() == Some(index) {
                "H".to_string()
            } else {
                index.to_string()
            }
        };

        let mut parts = Vec::new();
        let mut index = 0;
        while index < self.len() {
            match self
                .frozen_segments()
                .iter()
                .find(|segment| segment.start == index)
            {
                Some(segment) => {
                    let end = segment.end.min(self.len() - 1);
                    let inner: Vec<String> = (segment.start..=end).map(mark).collect();
                    parts.push(format!("F({})", inner.join(",")));
                    index = end + 1;
                }
                None => {
                    parts.push(mark(index));
                    index += 1;
                }
            }
        }

        format!("Timeline Segments:\n{}", parts.join(" "))
    }

    pub fn message_markdown(&self, index: usize) -> Option<String> {
        let message = self.message(index)?;
        let source = self
            .loaded_filename()
            .map(|path| path.display().to_string())
            .unwrap_or_default();
        Some(format!(
            "---\ntitle: Message at Index {index}\nrole: {}\nsource_file: {source}\n---\n\n{}\n",
            message.role().label(),
            message.text()
        ))
    }

    pub fn export_message_to_markdown(&self, index: usize, destination: &Path) -> Result<()> {
        let markdown = self
            .message_markdown(index)
            .ok_or(TimelineError::IndexOutOfRange {
                index,
                len: self.len(),
            })?;
        if let Some(parent) = destination.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(destination, markdown)?;
        log::info!("Message {index} exported to {}", destination.display());
        Ok(())
    }
}
