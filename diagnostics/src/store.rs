//! Diagnostic stores - per-file markers, one map per severity.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use asmbuild_types::{Marker, MarkerSeverity};
use serde::Serialize;

use crate::reconcile::ReconcileScope;

#[derive(Debug, Default)]
struct Stores {
    errors: HashMap<PathBuf, Vec<Marker>>,
    warnings: HashMap<PathBuf, Vec<Marker>>,
}

impl Stores {
    fn map(&self, severity: MarkerSeverity) -> &HashMap<PathBuf, Vec<Marker>> {
        match severity {
            MarkerSeverity::Error => &self.errors,
            MarkerSeverity::Warning => &self.warnings,
        }
    }

    fn map_mut(&mut self, severity: MarkerSeverity) -> &mut HashMap<PathBuf, Vec<Marker>> {
        match severity {
            MarkerSeverity::Error => &mut self.errors,
            MarkerSeverity::Warning => &mut self.warnings,
        }
    }

    fn update(&mut self, severity: MarkerSeverity, path: PathBuf, items: Vec<Marker>) {
        let map = self.map_mut(severity);
        if items.is_empty() {
            map.remove(&path);
        } else {
            map.insert(path, items);
        }
    }

    /// Drop every warning that starts on a line holding an error.
    fn suppress_shadowed_warnings(&mut self, path: &Path) {
        let Some(errors) = self.errors.get(path) else {
            return;
        };
        let error_lines: HashSet<usize> = errors.iter().map(|m| m.line).collect();
        if let Some(warnings) = self.warnings.get_mut(path) {
            warnings.retain(|m| !error_lines.contains(&m.line));
            if warnings.is_empty() {
                self.warnings.remove(path);
            }
        }
    }
}

/// The error and warning stores shared by every build.
///
/// Construct once, share through an `Arc`. For any file and line there is
/// never both an error and a warning marker.
#[derive(Debug, Default)]
pub struct DiagnosticStores {
    inner: Mutex<Stores>,
}

impl DiagnosticStores {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Stores> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Empty both stores.
    pub fn clear(&self) {
        let mut stores = self.lock();
        stores.errors.clear();
        stores.warnings.clear();
    }

    pub fn clear_file(&self, path: &Path) {
        let mut stores = self.lock();
        stores.errors.remove(path);
        stores.warnings.remove(path);
    }

    #[must_use]
    pub fn errors(&self, path: &Path) -> Vec<Marker> {
        self.markers(MarkerSeverity::Error, path)
    }

    #[must_use]
    pub fn warnings(&self, path: &Path) -> Vec<Marker> {
        self.markers(MarkerSeverity::Warning, path)
    }

    #[must_use]
    pub fn markers(&self, severity: MarkerSeverity, path: &Path) -> Vec<Marker> {
        self.lock()
            .map(severity)
            .get(path)
            .cloned()
            .unwrap_or_default()
    }

    /// Replace the stores in `scope` with `pending` in one locked step.
    ///
    /// Markers of a severity outside `scope` are ignored.
    pub(crate) fn replace(&self, scope: ReconcileScope, pending: BTreeMap<PathBuf, Vec<Marker>>) {
        let mut stores = self.lock();
        for severity in scope.severities() {
            stores.map_mut(*severity).clear();
        }
        for (path, markers) in pending {
            for severity in scope.severities() {
                let group: Vec<Marker> = markers
                    .iter()
                    .filter(|m| m.severity == *severity)
                    .cloned()
                    .collect();
                stores.update(*severity, path.clone(), group);
            }
            stores.suppress_shadowed_warnings(&path);
        }
    }

    /// Per-file markers of both severities, files with errors first.
    #[must_use]
    pub fn snapshot(&self) -> DiagnosticsSnapshot {
        let stores = self.lock();
        let mut merged: HashMap<&Path, Vec<Marker>> = HashMap::new();
        for (path, items) in stores.errors.iter().chain(stores.warnings.iter()) {
            merged
                .entry(path.as_path())
                .or_default()
                .extend(items.iter().cloned());
        }

        let mut files: Vec<(PathBuf, Vec<Marker>)> = merged
            .into_iter()
            .map(|(path, mut items)| {
                items.sort_by_key(|m| (m.line, m.start_column, m.severity));
                (path.to_path_buf(), items)
            })
            .collect();

        files.sort_by(|a, b| {
            let a_has_errors = a.1.iter().any(|m| m.severity == MarkerSeverity::Error);
            let b_has_errors = b.1.iter().any(|m| m.severity == MarkerSeverity::Error);
            b_has_errors.cmp(&a_has_errors).then_with(|| a.0.cmp(&b.0))
        });

        DiagnosticsSnapshot { files }
    }
}

/// Immutable view of the stores at one point in time.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DiagnosticsSnapshot {
    files: Vec<(PathBuf, Vec<Marker>)>,
}

impl DiagnosticsSnapshot {
    /// Per-file markers, sorted with error-containing files first.
    #[must_use]
    pub fn files(&self) -> &[(PathBuf, Vec<Marker>)] {
        &self.files
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    fn count_by_severity(&self, severity: MarkerSeverity) -> usize {
        self.files
            .iter()
            .flat_map(|(_, items)| items)
            .filter(|m| m.severity == severity)
            .count()
    }

    #[must_use]
    pub fn error_count(&self) -> usize {
        self.count_by_severity(MarkerSeverity::Error)
    }

    #[must_use]
    pub fn warning_count(&self) -> usize {
        self.count_by_severity(MarkerSeverity::Warning)
    }

    /// Format a compact status string like "E:3 W:5".
    #[must_use]
    pub fn status_string(&self) -> String {
        if self.is_empty() {
            return String::new();
        }
        format!("E:{} W:{}", self.error_count(), self.warning_count())
    }
}
