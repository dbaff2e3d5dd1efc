// Export module - serializing the transcript to a downloadable document
//
// The export document is a pure transformation of the transcript: a
// `{"messages": [...]}` JSON object, pretty-printed, written to
// chat-<unix-millis>.json in the configured export directory. It is the only
// artifact this tool persists.

use crate::session::Turn;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// The exported transcript document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptDocument {
    pub messages: Vec<Turn>,
}

impl TranscriptDocument {
    pub fn new(transcript: &[Turn]) -> Self {
        Self {
            messages: transcript.to_vec(),
        }
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("Failed to serialize transcript")
    }
}

/// Write the transcript to the export directory, returning the file path
pub fn write_transcript(export_dir: &Path, transcript: &[Turn]) -> Result<PathBuf> {
    fs::create_dir_all(export_dir).context("Failed to create export directory")?;

    let filename = format!("chat-{}.json", chrono::Utc::now().timestamp_millis());
    let path = export_dir.join(filename);

    let document = TranscriptDocument::new(transcript);
    fs::write(&path, document.to_json()?)
        .with_context(|| format!("Failed to write export file {:?}", path))?;

    tracing::info!("Transcript exported to {:?}", path);
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Role;

    fn sample_transcript() -> Vec<Turn> {
        vec![
            Turn::user("Hello"),
            Turn::assistant("Hi! How can I help?"),
            Turn::user("Summarize this:\n\nsome text"),
        ]
    }

    #[test]
    fn document_round_trips_identically() {
        let document = TranscriptDocument::new(&sample_transcript());
        let json = document.to_json().unwrap();
        let parsed: TranscriptDocument = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, document);
    }

    #[test]
    fn roles_serialize_lowercase() {
        let json = TranscriptDocument::new(&sample_transcript())
            .to_json()
            .unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["messages"][0]["role"], "user");
        assert_eq!(value["messages"][1]["role"], "assistant");
        assert_eq!(value["messages"][1]["content"], "Hi! How can I help?");
    }

    #[test]
    fn write_creates_file_in_export_dir() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_transcript(dir.path(), &sample_transcript()).unwrap();

        assert!(path.exists());
        assert!(path
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("chat-"));

        let parsed: TranscriptDocument =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(parsed.messages.len(), 3);
        assert_eq!(parsed.messages[0].role, Role::User);
    }

    #[test]
    fn empty_transcript_still_exports() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_transcript(dir.path(), &[]).unwrap();
        let parsed: TranscriptDocument =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert!(parsed.messages.is_empty());
    }
}
