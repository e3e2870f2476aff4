//! Shared, append-only trace of tool runs.

use std::sync::{Mutex, PoisonError};

/// Human-readable log of tool invocations, shared by every runner.
///
/// Lines are kept for the host to display and mirrored to `tracing` under
/// the `asmbuild::output` target. Nothing here influences run results.
#[derive(Debug, Default)]
pub struct OutputChannel {
    lines: Mutex<Vec<String>>,
}

impl OutputChannel {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append_line(&self, line: impl Into<String>) {
        let line = line.into();
        tracing::info!(target: "asmbuild::output", "{line}");
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(line);
    }

    /// Snapshot of every line appended so far.
    #[must_use]
    pub fn lines(&self) -> Vec<String> {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn clear(&self) {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}
