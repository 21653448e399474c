//! Shared types for Represence components.
//!
//! This crate provides the snapshot record pushed to WebSocket clients.
//! All types are serializable with the exact key names clients expect.

use serde::{Deserialize, Serialize};

/// File name reported when the host has no active document.
pub const NO_FILE_OPEN: &str = "No file open";

/// Snapshot of the active document at a point in time.
///
/// Serializes to the single message type of the push protocol:
///
/// ```json
/// {"fileName":"main.rs","extension":".rs","fullPath":"/src/main.rs",
///  "languageId":"rust","lineCount":12,"wordCount":40,"timestamp":1700000000000}
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileInfo {
    pub file_name: String,
    pub extension: String,
    pub full_path: String,
    pub language_id: String,
    pub line_count: u64,
    pub word_count: u64,
    /// Capture time in milliseconds since the Unix epoch
    pub timestamp: i64,
}

impl FileInfo {
    /// Snapshot describing the absence of an active document.
    #[must_use]
    pub fn empty(timestamp: i64) -> Self {
        Self {
            file_name: NO_FILE_OPEN.to_string(),
            extension: String::new(),
            full_path: String::new(),
            language_id: String::new(),
            line_count: 0,
            word_count: 0,
            timestamp,
        }
    }

    /// Whether this snapshot is the no-document sentinel.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.full_path.is_empty() && self.file_name == NO_FILE_OPEN
    }

    /// Multi-line summary shown by the "show current file info" action.
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "File: {}\nLanguage: {}\nLines: {}\nWords: {}",
            self.file_name, self.language_id, self.line_count, self.word_count
        )
    }

    /// Encode as the JSON text frame payload.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> FileInfo {
        FileInfo {
            file_name: "main.rs".to_string(),
            extension: ".rs".to_string(),
            full_path: "/work/src/main.rs".to_string(),
            language_id: "rust".to_string(),
            line_count: 12,
            word_count: 40,
            timestamp: 1_700_000_000_000,
        }
    }

    #[test]
    fn test_empty_snapshot_fields() {
        let info = FileInfo::empty(42);
        assert_eq!(info.file_name, "No file open");
        assert!(info.extension.is_empty());
        assert!(info.full_path.is_empty());
        assert!(info.language_id.is_empty());
        assert_eq!(info.line_count, 0);
        assert_eq!(info.word_count, 0);
        assert_eq!(info.timestamp, 42);
        assert!(info.is_empty());
    }

    #[test]
    fn test_sample_is_not_empty() {
        assert!(!sample().is_empty());
    }

    #[test]
    fn test_json_uses_camel_case_keys() {
        let value = serde_json::to_value(sample()).unwrap();
        let obj = value.as_object().unwrap();

        let mut keys: Vec<&str> = obj.keys().map(String::as_str).collect();
        keys.sort_unstable();
        assert_eq!(
            keys,
            vec![
                "extension",
                "fileName",
                "fullPath",
                "languageId",
                "lineCount",
                "timestamp",
                "wordCount"
            ]
        );
        assert_eq!(obj["fileName"], "main.rs");
        assert_eq!(obj["lineCount"], 12);
        assert_eq!(obj["timestamp"], 1_700_000_000_000_i64);
    }

    #[test]
    fn test_counts_serialize_as_integers() {
        let json = sample().to_json().unwrap();
        assert!(json.contains("\"wordCount\":40"));
        assert!(json.contains("\"lineCount\":12"));
    }

    #[test]
    fn test_summary_format() {
        assert_eq!(sample().summary(), "File: main.rs\nLanguage: rust\nLines: 12\nWords: 40");
    }

    #[test]
    fn test_summary_for_empty_snapshot() {
        assert_eq!(
            FileInfo::empty(0).summary(),
            "File: No file open\nLanguage: \nLines: 0\nWords: 0"
        );
    }
}
