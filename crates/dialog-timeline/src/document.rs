//! Persisted timeline form, shared by saved dialogs and agent seed files

use std::path::Path;

use dialog_core::Message;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::Result;
use crate::segment::{FrozenSegment, StartMode};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelineDocument {
    #[serde(default)]
    pub history: Vec<Message>,
    #[serde(default)]
    pub metadata: TimelineMetadata,
    #[serde(default)]
    pub system_message: Option<Message>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineMetadata {
    #[serde(default)]
    pub frozen_segments: Vec<FrozenSegment>,
    #[serde(default)]
    pub start_mode: StartMode,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub description: String,
}

fn null_as_empty<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

impl TimelineDocument {
    /// Empty document written for newly created dialogs and agents
    pub fn scaffold(name: impl Into<String>) -> Self {
        Self {
            history: Vec::new(),
            metadata: TimelineMetadata {
                frozen_segments: Vec::new(),
                start_mode: StartMode::Interactive,
                name: name.into(),
                description: String::new(),
            },
            system_message: Some(Message::system("")),
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn read(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Pretty JSON with a four-space indent
    pub fn to_json(&self) -> Result<String> {
        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
        self.serialize(&mut serializer)?;
        // serde_json only emits valid UTF-8
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_spec_field_names() {
        let mut doc = TimelineDocument::scaffold("demo");
        doc.history.push(Message::user("hi"));
        doc.metadata.frozen_segments.push(FrozenSegment::new(0, 0));
        doc.metadata.start_mode = StartMode::Frozen;

        let value: serde_json::Value = serde_json::from_str(&doc.to_json().unwrap()).unwrap();
        assert_eq!(value["history"][0]["text"], "hi");
        assert_eq!(value["metadata"]["frozenSegments"][0]["end"], 0);
        assert_eq!(value["metadata"]["startMode"], "frozen");
        assert_eq!(value["metadata"]["name"], "demo");
        assert_eq!(value["system_message"]["role"], "system");
    }

    #[test]
    fn indents_with_four_spaces() {
        let json = TimelineDocument::default().to_json().unwrap();
        assert!(json.contains("\n    \"history\""));
    }

    #[test]
    fn tolerates_sparse_documents() {
        let doc = TimelineDocument::from_json(
            r#"{"history": [{"role": "user", "content": "legacy"}], "metadata": {"name": null}}"#,
        )
        .unwrap();
        assert_eq!(doc.history[0].text(), "legacy");
        assert_eq!(doc.metadata.name, "");
        assert!(doc.metadata.frozen_segments.is_empty());
        assert!(doc.system_message.is_none());
    }

    #[test]
    fn null_system_message_is_none() {
        let doc = TimelineDocument::from_json(r#"{"history": [], "system_message": null}"#).unwrap();
        assert!(doc.system_message.is_none());
    }
}
