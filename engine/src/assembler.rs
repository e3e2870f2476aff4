//! Assembling single source files.

use std::path::Path;
use std::sync::Arc;

use asmbuild_diagnostics::{ReconcileScope, resolve_global_errors};
use asmbuild_tools::{AssemblerParser, CancelSignal, PrimaryOutput, ToolInvocation};
use asmbuild_types::{CheckResult, Document};

use crate::context::BuildContext;
use crate::error::BuildError;

/// Debug flag appended to the assembler options.
const LINE_DEBUG_FLAG: &str = "-linedebug";

/// Object file name for `source`: the extension becomes `.o`.
///
/// Names without an extension, or whose only dot is leading (`.hidden`),
/// get `.o` appended instead.
#[must_use]
pub fn object_file_name(source: &Path) -> String {
    let name = source
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    match (name.find('.'), name.rfind('.')) {
        (Some(first), Some(last)) if first > 0 => format!("{}.o", &name[..last]),
        _ => format!("{name}.o"),
    }
}

/// Runs the assembler on one file at a time.
#[derive(Debug, Clone)]
pub struct Assembler {
    ctx: Arc<BuildContext>,
}

impl Assembler {
    #[must_use]
    pub fn new(ctx: Arc<BuildContext>) -> Self {
        Self { ctx }
    }

    /// Arguments for assembling `source` into `object`.
    #[must_use]
    pub fn arguments(&self, source: &Path, object: &Path, debug: bool) -> Vec<String> {
        let mut args = self.ctx.config().assembler.options.clone();
        if debug {
            args.push(LINE_DEBUG_FLAG.to_string());
        }
        args.extend([
            "-o".to_string(),
            object.display().to_string(),
            source.display().to_string(),
        ]);
        args
    }

    /// Assemble `path` into the build directory and return its diagnostics.
    ///
    /// Fails only when the assembler is disabled, the workspace root is
    /// missing or the build directory cannot be created.
    pub async fn build_file(
        &self,
        path: &Path,
        debug: bool,
        cancel: &CancelSignal,
    ) -> Result<Vec<CheckResult>, BuildError> {
        let config = &self.ctx.config().assembler;
        if !config.enabled {
            return Err(BuildError::AssemblerDisabled);
        }
        self.ctx.ensure_root()?;

        let build_dir = self.ctx.build_dir();
        create_build_dir(&build_dir).await?;

        let object = build_dir.join(object_file_name(path));
        let invocation = ToolInvocation::new(&config.command, self.ctx.root())
            .args(self.arguments(path, &object, debug))
            .primary(PrimaryOutput::Stderr);

        tracing::info!(source = %path.display(), object = %object.display(), "Assembling");
        Ok(self
            .ctx
            .runner()
            .run(&invocation, cancel, &AssemblerParser)
            .await)
    }

    /// Assemble `doc` and anchor its global diagnostics, without touching
    /// the stores.
    pub async fn compile_document(
        &self,
        doc: &dyn Document,
        debug: bool,
        cancel: &CancelSignal,
    ) -> Result<Vec<CheckResult>, BuildError> {
        let mut results = self.build_file(doc.path(), debug, cancel).await?;
        resolve_global_errors(doc, &mut results);
        Ok(results)
    }

    /// Assemble `doc` and publish the outcome to the diagnostic stores.
    pub async fn build_document(
        &self,
        doc: &dyn Document,
        debug: bool,
        cancel: &CancelSignal,
    ) -> Result<Vec<CheckResult>, BuildError> {
        let results = self.compile_document(doc, debug, cancel).await?;
        self.ctx
            .reconciler()
            .reconcile(&[doc], &results, ReconcileScope::Both);
        Ok(results)
    }
}

pub(crate) async fn create_build_dir(dir: &Path) -> Result<(), BuildError> {
    match tokio::fs::create_dir_all(dir).await {
        Ok(()) => Ok(()),
        Err(source) => {
            tracing::warn!(dir = %dir.display(), error = %source, "Error creating build dir");
            Err(BuildError::CreateBuildDir {
                path: dir.to_path_buf(),
                source,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;
    use std::sync::Arc;

    use asmbuild_config::BuildConfig;
    use asmbuild_diagnostics::{CollectingNotifier, DiagnosticStores};
    use asmbuild_tools::{CancelSignal, OutputChannel};

    use super::{Assembler, object_file_name};
    use crate::context::BuildContext;
    use crate::error::BuildError;

    fn assembler(root: &Path, config: BuildConfig) -> Assembler {
        Assembler::new(Arc::new(BuildContext::new(
            root,
            config,
            Arc::new(OutputChannel::new()),
            Arc::new(DiagnosticStores::new()),
            Arc::new(CollectingNotifier::new()),
        )))
    }

    #[test]
    fn object_name_replaces_last_extension() {
        assert_eq!(object_file_name(Path::new("/src/main.s")), "main.o");
        assert_eq!(object_file_name(Path::new("gfx.blit.asm")), "gfx.blit.o");
    }

    #[test]
    fn object_name_appends_without_extension() {
        assert_eq!(object_file_name(Path::new("/src/file2")), "file2.o");
        assert_eq!(object_file_name(Path::new(".hidden")), ".hidden.o");
    }

    #[test]
    fn arguments_put_output_last() {
        let asm = assembler(Path::new("/work"), BuildConfig::default());
        let args = asm.arguments(Path::new("/work/main.s"), Path::new("/work/build/main.o"), true);
        assert_eq!(
            args,
            vec![
                "-m68000",
                "-Fhunk",
                "-devpac",
                "-linedebug",
                "-o",
                "/work/build/main.o",
                "/work/main.s"
            ]
        );
    }

    #[tokio::test]
    async fn disabled_assembler_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = BuildConfig::default();
        config.assembler.enabled = false;
        let err = assembler(dir.path(), config)
            .build_file(&dir.path().join("main.s"), false, &CancelSignal::new())
            .await
            .unwrap_err();
        assert!(matches!(err, BuildError::AssemblerDisabled));
    }

    #[tokio::test]
    async fn missing_root_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("gone");
        let err = assembler(&root, BuildConfig::default())
            .build_file(&root.join("main.s"), false, &CancelSignal::new())
            .await
            .unwrap_err();
        assert!(matches!(err, BuildError::MissingRoot(_)));
    }

    #[tokio::test]
    async fn missing_tool_yields_no_diagnostics_and_creates_build_dir() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = BuildConfig::default();
        config.assembler.command = "nonexistent-tool-xyz".to_string();
        let results = assembler(dir.path(), config)
            .build_file(&dir.path().join("main.s"), false, &CancelSignal::new())
            .await
            .unwrap();
        assert!(results.is_empty());
        assert!(dir.path().join("build").is_dir());
    }
}
