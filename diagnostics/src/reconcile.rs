//! Turns parsed results into store contents.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use asmbuild_types::{
    CheckResult, Document, Marker, MarkerSeverity, leading_whitespace, trailing_whitespace,
};

use crate::notify::Notifier;
use crate::path::normalize_path;
use crate::store::DiagnosticStores;

/// Which stores a reconciliation pass replaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReconcileScope {
    ErrorsOnly,
    WarningsOnly,
    #[default]
    Both,
}

impl ReconcileScope {
    pub(crate) fn severities(self) -> &'static [MarkerSeverity] {
        match self {
            Self::ErrorsOnly => &[MarkerSeverity::Error],
            Self::WarningsOnly => &[MarkerSeverity::Warning],
            Self::Both => &[MarkerSeverity::Error, MarkerSeverity::Warning],
        }
    }
}

/// Applies whole reconciliation passes to a shared [`DiagnosticStores`].
#[derive(Debug, Clone)]
pub struct Reconciler {
    stores: Arc<DiagnosticStores>,
    notifier: Arc<dyn Notifier>,
    base_dir: Option<PathBuf>,
}

impl Reconciler {
    #[must_use]
    pub fn new(stores: Arc<DiagnosticStores>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            stores,
            notifier,
            base_dir: None,
        }
    }

    /// Resolve relative result paths against `dir` (the tool's cwd).
    pub fn with_base_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.base_dir = Some(dir.into());
        self
    }

    #[must_use]
    pub fn stores(&self) -> &Arc<DiagnosticStores> {
        &self.stores
    }

    /// Replace the stores in `scope` with markers built from `results`.
    ///
    /// `documents` are the files open in the host; they are only consulted
    /// to derive column ranges. Line-less results, and file-less ones when
    /// no document is open, go to the notifier.
    pub fn reconcile(
        &self,
        documents: &[&dyn Document],
        results: &[CheckResult],
        scope: ReconcileScope,
    ) {
        let open: Vec<(PathBuf, &dyn Document)> = documents
            .iter()
            .map(|doc| (self.identity(doc.path()), *doc))
            .collect();

        let mut pending: BTreeMap<PathBuf, Vec<Marker>> = BTreeMap::new();
        for result in results {
            let Some(line) = result.line_index() else {
                self.notifier.notify(&result.msg);
                continue;
            };

            let path = if result.file.is_empty() {
                let Some((path, _)) = open.first() else {
                    self.notifier.notify(&result.msg);
                    continue;
                };
                path.clone()
            } else {
                self.identity(Path::new(&result.file))
            };

            let (start_column, end_column) = open
                .iter()
                .find(|(open_path, _)| *open_path == path)
                .and_then(|(_, doc)| doc.line(line))
                .map_or((0, 1), |text| column_range(text, result.col));

            pending.entry(path).or_default().push(Marker {
                line,
                start_column,
                end_column,
                message: result.msg.clone(),
                severity: result.severity.marker_severity(),
            });
        }

        tracing::debug!(
            files = pending.len(),
            results = results.len(),
            ?scope,
            "Reconciling diagnostics"
        );
        self.stores.replace(scope, pending);
    }

    fn identity(&self, path: &Path) -> PathBuf {
        match &self.base_dir {
            Some(base) if path.is_relative() => normalize_path(&base.join(path)),
            _ => normalize_path(path),
        }
    }
}

/// Character range to highlight on `text` for a result with column `col`.
///
/// Defaults to the line without surrounding whitespace; an explicit 1-based
/// `col` pins the start. The range is never empty.
fn column_range(text: &str, col: u32) -> (usize, usize) {
    let len = text.chars().count();
    let start = match col {
        0 => leading_whitespace(text),
        col => usize::try_from(col - 1).unwrap_or(usize::MAX),
    };
    let end = len.saturating_sub(trailing_whitespace(text));
    (start, end.max(start.saturating_add(1)))
}
