//! Read-only view of an open source file.

use std::path::{Path, PathBuf};

/// An ordered sequence of lines belonging to one file.
///
/// The host owns the real buffer; the pipeline only needs line text for
/// range derivation and `include` searches.
pub trait Document: Send + Sync {
    fn path(&self) -> &Path;

    fn line_count(&self) -> usize;

    /// Text of the 0-indexed line, without its line terminator.
    fn line(&self, index: usize) -> Option<&str>;
}

/// In-memory [`Document`] built from a string.
#[derive(Debug, Clone)]
pub struct TextDocument {
    path: PathBuf,
    lines: Vec<String>,
}

impl TextDocument {
    /// Split `text` on `\n` / `\r\n` into lines.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, text: &str) -> Self {
        Self {
            path: path.into(),
            lines: text.lines().map(str::to_string).collect(),
        }
    }

    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.lines.iter().map(String::as_str)
    }
}

impl Document for TextDocument {
    fn path(&self) -> &Path {
        &self.path
    }

    fn line_count(&self) -> usize {
        self.lines.len()
    }

    fn line(&self, index: usize) -> Option<&str> {
        self.lines.get(index).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::{Document, TextDocument};

    #[test]
    fn splits_crlf_and_lf() {
        let doc = TextDocument::new("/w/main.s", "start:\r\n  move.l d0,d1\n  rts");
        assert_eq!(doc.line_count(), 3);
        assert_eq!(doc.line(0), Some("start:"));
        assert_eq!(doc.line(1), Some("  move.l d0,d1"));
        assert_eq!(doc.line(2), Some("  rts"));
        assert_eq!(doc.line(3), None);
    }

    #[test]
    fn empty_text_has_no_lines() {
        let doc = TextDocument::new("/w/empty.s", "");
        assert_eq!(doc.line_count(), 0);
        assert_eq!(doc.lines().count(), 0);
    }
}
