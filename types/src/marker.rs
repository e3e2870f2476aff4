//! Positioned markers - diagnostics resolved to a character range.

use std::path::Path;

use serde::{Deserialize, Serialize};

/// The two store-owning severities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarkerSeverity {
    Error,
    Warning,
}

impl MarkerSeverity {
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warning => "warning",
        }
    }
}

/// A diagnostic anchored to `[start_column, end_column)` on one line.
///
/// The owning file is the key of the store the marker lives in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Marker {
    /// 0-indexed line number.
    pub line: usize,
    /// 0-indexed, inclusive.
    pub start_column: usize,
    /// 0-indexed, exclusive.
    pub end_column: usize,
    pub message: String,
    pub severity: MarkerSeverity,
}

impl Marker {
    /// Format as `path:line:col: severity: message` (1-indexed for display).
    #[must_use]
    pub fn display_with_path(&self, path: &Path) -> String {
        format!(
            "{}:{}:{}: {}: {}",
            path.display(),
            self.line + 1,
            self.start_column + 1,
            self.severity.label(),
            self.message,
        )
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::{Marker, MarkerSeverity};

    #[test]
    fn display_with_path_is_one_indexed() {
        let marker = Marker {
            line: 9,
            start_column: 4,
            end_column: 12,
            message: "error 2: unknown mnemonic <mvoe>".to_string(),
            severity: MarkerSeverity::Error,
        };
        assert_eq!(
            marker.display_with_path(&PathBuf::from("src/main.s")),
            "src/main.s:10:5: error: error 2: unknown mnemonic <mvoe>"
        );
    }
}
