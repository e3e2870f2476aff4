//! Core diagnostic types for asmbuild.
//!
//! This crate contains pure value types with no IO and no async. Parsers
//! produce [`CheckResult`]s, the reconciler turns them into [`Marker`]s, and
//! both sides read source text through the [`Document`] trait.

#![allow(clippy::missing_errors_doc)]

mod document;
mod marker;
mod text;

pub use document::{Document, TextDocument};
pub use marker::{Marker, MarkerSeverity};
pub use text::{leading_whitespace, trailing_whitespace};

use serde::{Deserialize, Serialize};

// ============================================================================
// Severity
// ============================================================================

/// Severity label attached to a parsed diagnostic.
///
/// Tools emit free-form labels; `error` and `warning` are the two that own a
/// diagnostic store. Anything else (the assembler's `message`, for example)
/// is kept verbatim in [`Severity::Other`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Severity {
    Error,
    Warning,
    Other(String),
}

impl Severity {
    /// Parse a tool label. Matching is case-insensitive for the two known
    /// labels; unknown labels are lowercased and preserved.
    #[must_use]
    pub fn from_label(label: &str) -> Self {
        let lower = label.trim().to_ascii_lowercase();
        match lower.as_str() {
            "error" => Self::Error,
            "warning" => Self::Warning,
            _ => Self::Other(lower),
        }
    }

    #[must_use]
    pub fn label(&self) -> &str {
        match self {
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Other(label) => label,
        }
    }

    #[must_use]
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error)
    }

    /// Which store a diagnostic of this severity is filed in.
    ///
    /// Only `warning` goes to the warning store; every other label is
    /// treated as an error.
    #[must_use]
    pub fn marker_severity(&self) -> MarkerSeverity {
        match self {
            Self::Warning => MarkerSeverity::Warning,
            Self::Error | Self::Other(_) => MarkerSeverity::Error,
        }
    }
}

impl From<String> for Severity {
    fn from(value: String) -> Self {
        Self::from_label(&value)
    }
}

impl From<Severity> for String {
    fn from(value: Severity) -> Self {
        value.label().to_string()
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

// ============================================================================
// CheckResult
// ============================================================================

/// One diagnostic parsed from tool output.
///
/// `file` may be empty, meaning "the document currently being processed".
/// `line` is 1-based; zero or negative marks a global diagnostic with no
/// location. `col` is 1-based, zero meaning "derive from the line text".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckResult {
    pub file: String,
    pub line: i64,
    pub col: u32,
    pub msg: String,
    pub severity: Severity,
}

impl CheckResult {
    /// A diagnostic anchored at `line` of `file`.
    #[must_use]
    pub fn located(
        file: impl Into<String>,
        line: i64,
        msg: impl Into<String>,
        severity: Severity,
    ) -> Self {
        Self {
            file: file.into(),
            line,
            col: 0,
            msg: msg.into(),
            severity,
        }
    }

    /// A diagnostic with no file and no line.
    #[must_use]
    pub fn global(msg: impl Into<String>, severity: Severity) -> Self {
        Self {
            file: String::new(),
            line: 0,
            col: 0,
            msg: msg.into(),
            severity,
        }
    }

    #[must_use]
    pub fn with_col(mut self, col: u32) -> Self {
        self.col = col;
        self
    }

    /// True when the diagnostic carries no usable line number.
    #[must_use]
    pub fn is_global(&self) -> bool {
        self.line <= 0
    }

    /// 0-based line index, if the diagnostic is positioned.
    #[must_use]
    pub fn line_index(&self) -> Option<usize> {
        if self.is_global() {
            return None;
        }
        usize::try_from(self.line - 1).ok()
    }
}
