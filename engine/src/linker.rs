//! Linking assembled objects into an executable.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use asmbuild_tools::{CancelSignal, LinkerParser, PrimaryOutput, ToolInvocation};
use asmbuild_types::CheckResult;

use crate::assembler::object_file_name;
use crate::context::BuildContext;
use crate::error::BuildError;

#[derive(Debug, Clone)]
pub struct Linker {
    ctx: Arc<BuildContext>,
}

impl Linker {
    #[must_use]
    pub fn new(ctx: Arc<BuildContext>) -> Self {
        Self { ctx }
    }

    /// Options, then `-o <build>/<exe_name>`, then one object per source.
    #[must_use]
    pub fn arguments(&self, sources: &[PathBuf], exe_name: &str, build_dir: &Path) -> Vec<String> {
        let mut args = self.ctx.config().linker.options.clone();
        args.push("-o".to_string());
        args.push(build_dir.join(exe_name).display().to_string());
        args.extend(
            sources
                .iter()
                .map(|source| build_dir.join(object_file_name(source)).display().to_string()),
        );
        args
    }

    /// Link the objects built from `sources` into `<build_dir>/<exe_name>`.
    ///
    /// The linker runs in `root` and reports on stderr.
    pub async fn link_files(
        &self,
        sources: &[PathBuf],
        exe_name: &str,
        root: &Path,
        build_dir: &Path,
        cancel: &CancelSignal,
    ) -> Result<Vec<CheckResult>, BuildError> {
        let config = &self.ctx.config().linker;
        if !config.enabled {
            return Err(BuildError::LinkerDisabled);
        }
        if !root.is_dir() {
            return Err(BuildError::MissingRoot(root.to_path_buf()));
        }

        let invocation = ToolInvocation::new(&config.command, root)
            .args(self.arguments(sources, exe_name, build_dir))
            .primary(PrimaryOutput::Stderr);

        tracing::info!(objects = sources.len(), exe = %exe_name, "Linking");
        Ok(self
            .ctx
            .runner()
            .run(&invocation, cancel, &LinkerParser)
            .await)
    }
}

#[cfg(test)]
mod tests {
    use std::path::{Path, PathBuf};
    use std::sync::Arc;

    use asmbuild_config::BuildConfig;
    use asmbuild_diagnostics::{DiagnosticStores, TracingNotifier};
    use asmbuild_tools::{CancelSignal, OutputChannel};

    use super::Linker;
    use crate::context::BuildContext;
    use crate::error::BuildError;

    fn linker(config: BuildConfig) -> Linker {
        Linker::new(Arc::new(BuildContext::new(
            "/workdir",
            config,
            Arc::new(OutputChannel::new()),
            Arc::new(DiagnosticStores::new()),
            Arc::new(TracingNotifier),
        )))
    }

    #[test]
    fn arguments_list_exe_then_objects() {
        let sources = [PathBuf::from("/file1.s"), PathBuf::from("/file2")];
        let args = linker(BuildConfig::default()).arguments(
            &sources,
            "myprog",
            Path::new("/workdir/build"),
        );
        assert_eq!(
            args,
            vec![
                "-bamigahunk",
                "-Bstatic",
                "-o",
                "/workdir/build/myprog",
                "/workdir/build/file1.o",
                "/workdir/build/file2.o"
            ]
        );
    }

    #[tokio::test]
    async fn disabled_linker_is_an_error() {
        let mut config = BuildConfig::default();
        config.linker.enabled = false;
        let err = linker(config)
            .link_files(
                &[],
                "a.out",
                Path::new("/workdir"),
                Path::new("/workdir/build"),
                &CancelSignal::new(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, BuildError::LinkerDisabled));
    }
}
