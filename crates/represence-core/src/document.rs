//! Abstraction over the host's active document.

use std::borrow::Cow;
use std::path::{Path, PathBuf};

use crate::Result;

/// Read-only view of a document as the host exposes it.
///
/// Implementations must answer synchronously from state they already hold;
/// snapshot building never performs I/O of its own.
pub trait Document: Send + Sync {
    /// Absolute path of the document
    fn path(&self) -> &Path;

    /// Host-assigned content type, e.g. `rust` or `markdown`
    fn language_id(&self) -> &str;

    fn line_count(&self) -> usize;

    /// Full text of the document
    fn text(&self) -> Cow<'_, str>;
}

/// Owned in-memory document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextDocument {
    path: PathBuf,
    language_id: String,
    text: String,
    line_count: usize,
}

impl TextDocument {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, language_id: impl Into<String>, text: String) -> Self {
        let line_count = count_lines(&text);
        Self {
            path: path.into(),
            language_id: language_id.into(),
            text,
            line_count,
        }
    }

    /// Create a document whose language is inferred from the path's extension.
    #[must_use]
    pub fn with_inferred_language(path: impl Into<PathBuf>, text: String) -> Self {
        let path = path.into();
        let language_id = language_for_path(&path);
        Self::new(path, language_id, text)
    }

    /// Read a document from disk. Invalid UTF-8 is replaced rather than rejected.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read.
    pub fn from_path(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let bytes = std::fs::read(&path)?;
        let text = String::from_utf8_lossy(&bytes).into_owned();
        Ok(Self::with_inferred_language(path, text))
    }
}

impl Document for TextDocument {
    fn path(&self) -> &Path {
        &self.path
    }

    fn language_id(&self) -> &str {
        &self.language_id
    }

    fn line_count(&self) -> usize {
        self.line_count
    }

    fn text(&self) -> Cow<'_, str> {
        Cow::Borrowed(&self.text)
    }
}

/// Editor line count: line breaks + 1. `\r\n`, `\n` and a lone `\r` each
/// count as a single break, so empty text still has one line.
fn count_lines(text: &str) -> usize {
    let bytes = text.as_bytes();
    let mut lines = 1;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'\r' => {
                lines += 1;
                if bytes.get(i + 1) == Some(&b'\n') {
                    i += 1;
                }
            }
            b'\n' => lines += 1,
            _ => {}
        }
        i += 1;
    }
    lines
}

fn language_for_path(path: &Path) -> &'static str {
    match path.file_name().and_then(|n| n.to_str()) {
        Some("Dockerfile") => "dockerfile",
        Some("Makefile" | "makefile") => "makefile",
        _ => path
            .extension()
            .and_then(|e| e.to_str())
            .map_or("plaintext", language_for_extension),
    }
}

/// Map a file extension (without the dot) to a language identifier.
#[must_use]
pub fn language_for_extension(ext: &str) -> &'static str {
    match ext.to_ascii_lowercase().as_str() {
        "rs" => "rust",
        "ts" | "mts" | "cts" => "typescript",
        "tsx" => "typescriptreact",
        "js" | "mjs" | "cjs" => "javascript",
        "jsx" => "javascriptreact",
        "py" => "python",
        "go" => "go",
        "java" => "java",
        "c" | "h" => "c",
        "cc" | "cpp" | "cxx" | "hpp" => "cpp",
        "cs" => "csharp",
        "rb" => "ruby",
        "sh" | "bash" | "zsh" => "shellscript",
        "md" | "markdown" => "markdown",
        "json" => "json",
        "jsonc" => "jsonc",
        "toml" => "toml",
        "yaml" | "yml" => "yaml",
        "html" | "htm" => "html",
        "css" => "css",
        "scss" => "scss",
        "xml" => "xml",
        "sql" => "sql",
        "lua" => "lua",
        _ => "plaintext",
    }
}
