//! Frozen segments - archived index ranges over a timeline's history

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Result, TimelineError};

/// An inclusive `[start, end]` range of history indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrozenSegment {
    pub start: usize,
    pub end: usize,
}

impl FrozenSegment {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    fn overlaps(&self, other: &FrozenSegment) -> bool {
        self.start <= other.end && other.start <= self.end
    }
}

/// Display-only tag derived from the segments at save time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StartMode {
    Frozen,
    #[default]
    Interactive,
}

impl StartMode {
    /// `Frozen` iff some segment starts at index 0
    pub fn for_segments(segments: &[FrozenSegment]) -> Self {
        if segments.first().is_some_and(|segment| segment.start == 0) {
            StartMode::Frozen
        } else {
            StartMode::Interactive
        }
    }
}

impl fmt::Display for StartMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StartMode::Frozen => f.write_str("frozen"),
            StartMode::Interactive => f.write_str("interactive"),
        }
    }
}

fn invalid(segment: &FrozenSegment, reason: impl Into<String>) -> TimelineError {
    TimelineError::InvalidSegment {
        start: segment.start,
        end: segment.end,
        reason: reason.into(),
    }
}

/// Sort segments ascending and check them against a history of `history_len`
/// messages. Overlaps, reversed bounds and out-of-range indices are errors.
pub fn normalize_segments(
    segments: &[FrozenSegment],
    history_len: usize,
) -> Result<Vec<FrozenSegment>> {
    let mut sorted = segments.to_vec();
    sorted.sort_by_key(|segment| (segment.start, segment.end));

    for segment in &sorted {
        if segment.start > segment.end {
            return Err(invalid(segment, "start is after end"));
        }
        if segment.end >= history_len {
            return Err(invalid(
                segment,
                format!("history has only {history_len} messages"),
            ));
        }
    }

    for pair in sorted.windows(2) {
        if pair[0].overlaps(&pair[1]) {
            return Err(invalid(
                &pair[1],
                format!("overlaps [{}, {}]", pair[0].start, pair[0].end),
            ));
        }
    }

    Ok(sorted)
}

/// Insert `segment` keeping the list sorted and disjoint.
pub fn insert_segment(
    segments: &[FrozenSegment],
    segment: FrozenSegment,
    history_len: usize,
) -> Result<Vec<FrozenSegment>> {
    let mut candidate = segments.to_vec();
    candidate.push(segment);
    normalize_segments(&candidate, history_len)
}
