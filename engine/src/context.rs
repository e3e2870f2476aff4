//! Shared state for one workspace.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use asmbuild_config::BuildConfig;
use asmbuild_diagnostics::{DiagnosticStores, Notifier, Reconciler};
use asmbuild_tools::{HelperScriptKiller, OutputChannel, ProcessRunner};

use crate::error::BuildError;

/// Everything a build step needs: the workspace root, its configuration,
/// a runner and the reconciler feeding the shared stores.
#[derive(Debug, Clone)]
pub struct BuildContext {
    root: PathBuf,
    config: BuildConfig,
    runner: ProcessRunner,
    reconciler: Reconciler,
}

impl BuildContext {
    #[must_use]
    pub fn new(
        root: impl Into<PathBuf>,
        config: BuildConfig,
        output: Arc<OutputChannel>,
        stores: Arc<DiagnosticStores>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let root = root.into();
        let mut runner = ProcessRunner::new(output);
        if let Some(helper) = config.kill_helper(&root) {
            tracing::debug!(helper = %helper.display(), "Using kill helper script");
            runner = runner.with_tree_killer(Arc::new(HelperScriptKiller::new(helper)));
        }
        let reconciler = Reconciler::new(stores, notifier).with_base_dir(&root);
        Self {
            root,
            config,
            runner,
            reconciler,
        }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn config(&self) -> &BuildConfig {
        &self.config
    }

    #[must_use]
    pub fn runner(&self) -> &ProcessRunner {
        &self.runner
    }

    #[must_use]
    pub fn reconciler(&self) -> &Reconciler {
        &self.reconciler
    }

    #[must_use]
    pub fn build_dir(&self) -> PathBuf {
        self.config.build_dir(&self.root)
    }

    pub(crate) fn ensure_root(&self) -> Result<(), BuildError> {
        if self.root.is_dir() {
            Ok(())
        } else {
            Err(BuildError::MissingRoot(self.root.clone()))
        }
    }
}
