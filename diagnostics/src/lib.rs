//! Diagnostic stores and the reconciliation pass that fills them.
//!
//! Parsed [`CheckResult`](asmbuild_types::CheckResult)s come in, positioned
//! [`Marker`](asmbuild_types::Marker)s land in [`DiagnosticStores`], and
//! anything without a location is handed to a [`Notifier`].

mod notify;
mod path;
mod reconcile;
mod resolve;
mod store;

pub use notify::{CollectingNotifier, Notifier, TracingNotifier};
pub use path::normalize_path;
pub use reconcile::{ReconcileScope, Reconciler};
pub use resolve::resolve_global_errors;
pub use store::{DiagnosticStores, DiagnosticsSnapshot};
