//! Snapshot builder: turns the host's active document into a [`FileInfo`].

use std::path::Path;

use represence_types::FileInfo;

use crate::document::Document;

/// Build a snapshot of `document`, or the "No file open" sentinel for `None`.
///
/// The timestamp is taken here, at construction time, not when the snapshot
/// is eventually sent.
#[must_use]
pub fn build(document: Option<&dyn Document>) -> FileInfo {
    let timestamp = chrono::Utc::now().timestamp_millis();

    let Some(document) = document else {
        return FileInfo::empty(timestamp);
    };

    let path = document.path();
    let text = document.text();

    FileInfo {
        file_name: file_name(path),
        extension: extension(path),
        full_path: path.to_string_lossy().into_owned(),
        language_id: document.language_id().to_string(),
        line_count: document.line_count() as u64,
        word_count: count_words(&text) as u64,
        timestamp,
    }
}

/// Number of maximal runs of non-whitespace characters.
///
/// Whitespace here is the set editors' regex engines match with `\s`:
/// Unicode `White_Space` minus U+0085 (NEL), plus U+FEFF (BOM).
#[must_use]
pub fn count_words(text: &str) -> usize {
    text.split(is_separator).filter(|word| !word.is_empty()).count()
}

fn is_separator(c: char) -> bool {
    (c.is_whitespace() && c != '\u{85}') || c == '\u{feff}'
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

// `.gitignore` has no extension, `notes.` has "."
fn extension(path: &Path) -> String {
    path.extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default()
}
