//! File references inside dialog text
//!
//! Users send a file with `file <path>`. The file is expanded into a message
//! of the form `File sent: <path>\n\nFile Content:\n<content>`, and messages of
//! that form are re-read from disk whenever a timeline is loaded.

use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const FILE_COMMAND_PREFIX: &str = "file ";
pub const FILE_SENT_PREFIX: &str = "File sent: ";
pub const FILE_CONTENT_MARKER: &str = "\n\nFile Content:\n";

#[derive(Error, Debug)]
pub enum FileRefError {
    #[error("File not found: {0}")]
    NotFound(PathBuf),

    #[error("File is empty. Not sending: {0}")]
    Empty(PathBuf),

    #[error("Not a text file: {0}")]
    NotText(PathBuf),

    #[error("Error reading file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// The path of a `file <path>` input, if the input uses that syntax
pub fn parse_file_command(input: &str) -> Option<&str> {
    input
        .strip_prefix(FILE_COMMAND_PREFIX)
        .map(str::trim)
        .filter(|path| !path.is_empty())
}

/// Text files are valid UTF-8 without NUL bytes
pub fn is_text(bytes: &[u8]) -> bool {
    !bytes.contains(&0) && std::str::from_utf8(bytes).is_ok()
}

/// Read a file that must exist and be text
pub fn read_text_file(path: &Path) -> Result<String, FileRefError> {
    let bytes = std::fs::read(path).map_err(|source| match source.kind() {
        io::ErrorKind::NotFound => FileRefError::NotFound(path.to_path_buf()),
        _ => FileRefError::Io {
            path: path.to_path_buf(),
            source,
        },
    })?;
    if !is_text(&bytes) {
        return Err(FileRefError::NotText(path.to_path_buf()));
    }
    String::from_utf8(bytes).map_err(|_| FileRefError::NotText(path.to_path_buf()))
}

pub fn format_file_message(path: &str, content: &str) -> String {
    format!("{FILE_SENT_PREFIX}{path}{FILE_CONTENT_MARKER}{content}")
}

/// Expand `path` into a `File sent:` message. The path is made absolute; the
/// file must exist, be text, and be non-empty.
pub fn expand_file(path: &str) -> Result<String, FileRefError> {
    let abs_path = std::path::absolute(path).unwrap_or_else(|_| PathBuf::from(path));
    let content = read_text_file(&abs_path)?;
    if content.trim().is_empty() {
        return Err(FileRefError::Empty(abs_path));
    }
    Ok(format_file_message(&abs_path.to_string_lossy(), &content))
}

/// The path named by a `File sent:` message
pub fn referenced_path(text: &str) -> Option<&str> {
    let rest = text.strip_prefix(FILE_SENT_PREFIX)?;
    let end = rest.find(FILE_CONTENT_MARKER).unwrap_or(rest.len());
    let first = &rest[..end];
    Some(first.split('\n').next().unwrap_or(first))
}

/// Rebuild a `File sent:` message from the current file on disk. Returns
/// `None` for ordinary text. Never fails: read errors become inline text.
pub fn reconstruct_file_message(text: &str) -> Option<String> {
    let path = referenced_path(text)?;
    let base_text = format!("{FILE_SENT_PREFIX}{path}");

    let rebuilt = match read_text_file(Path::new(path)) {
        Ok(content) => format!("{base_text}{FILE_CONTENT_MARKER}{content}"),
        Err(FileRefError::NotFound(_)) => {
            log::warn!("Referenced file missing on load: {path}");
            format!("{base_text}\nError: File not found at '{path}'")
        }
        Err(e) => {
            log::warn!("Referenced file unreadable on load: {e}");
            format!("{base_text}\nError reading file: {e}")
        }
    };
    Some(rebuilt)
}
