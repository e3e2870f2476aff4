//! Whole-workspace builds: assemble every source, then link.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use asmbuild_diagnostics::ReconcileScope;
use asmbuild_tools::CancelSignal;
use asmbuild_types::{CheckResult, Document, TextDocument};
use futures_util::future::join_all;
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use ignore::WalkBuilder;

use crate::assembler::Assembler;
use crate::context::BuildContext;
use crate::error::BuildError;
use crate::linker::Linker;

fn build_glob_set(patterns: &[String]) -> Result<GlobSet, BuildError> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let mut glob = GlobBuilder::new(pattern);
        glob.literal_separator(true);
        if cfg!(windows) {
            glob.case_insensitive(true);
        }
        let glob = glob.build().map_err(|source| BuildError::InvalidGlob {
            pattern: pattern.clone(),
            source,
        })?;
        builder.add(glob);
    }
    builder.build().map_err(|source| BuildError::InvalidGlob {
        pattern: patterns.join(","),
        source,
    })
}

#[derive(Debug, Clone)]
pub struct Workspace {
    ctx: Arc<BuildContext>,
    assembler: Assembler,
    linker: Linker,
}

impl Workspace {
    #[must_use]
    pub fn new(ctx: Arc<BuildContext>) -> Self {
        Self {
            assembler: Assembler::new(Arc::clone(&ctx)),
            linker: Linker::new(Arc::clone(&ctx)),
            ctx,
        }
    }

    /// Sources under the root matching the include globs and none of the
    /// exclude globs, sorted. Ignore files are honored and the build
    /// directory is skipped.
    pub fn discover_sources(&self) -> Result<Vec<PathBuf>, BuildError> {
        self.ctx.ensure_root()?;
        let config = &self.ctx.config().linker;
        let includes = build_glob_set(&config.includes)?;
        let excludes = build_glob_set(&config.excludes)?;
        let root = self.ctx.root();
        let build_dir = self.ctx.build_dir();

        let walker = WalkBuilder::new(root)
            .git_ignore(true)
            .git_exclude(true)
            .require_git(false)
            .filter_entry(move |entry| entry.file_name() != ".git" && entry.path() != build_dir)
            .build();

        let mut sources = Vec::new();
        for entry in walker {
            let entry = match entry {
                Ok(e) => e,
                Err(err) => {
                    tracing::debug!(error = %err, "Skipping unreadable entry");
                    continue;
                }
            };
            if !entry.file_type().is_some_and(|ft| ft.is_file()) {
                continue;
            }
            let path = entry.path();
            let rel = path.strip_prefix(root).unwrap_or(path);
            if includes.is_match(rel) && !excludes.is_match(rel) {
                sources.push(path.to_path_buf());
            }
        }
        sources.sort();
        Ok(sources)
    }

    /// Assemble every source concurrently, then link.
    ///
    /// All compile diagnostics are published in one pass. If any source
    /// reported diagnostics the link step is skipped and
    /// [`BuildError::CompileErrors`] is returned. Otherwise the linker's
    /// diagnostics are published and returned.
    pub async fn build(&self, cancel: &CancelSignal) -> Result<Vec<CheckResult>, BuildError> {
        let linker_config = &self.ctx.config().linker;
        if !linker_config.enabled {
            return Err(BuildError::LinkerDisabled);
        }

        let sources = self.discover_sources()?;
        tracing::info!(count = sources.len(), root = %self.ctx.root().display(), "Building workspace");

        let mut documents = Vec::with_capacity(sources.len());
        for path in &sources {
            documents.push(read_document(path).await?);
        }

        let compiled = join_all(
            documents
                .iter()
                .map(|doc| self.assembler.compile_document(doc, false, cancel)),
        )
        .await;

        let mut all_results = Vec::new();
        let mut failed_files = 0;
        for outcome in compiled {
            let results = outcome?;
            if !results.is_empty() {
                failed_files += 1;
            }
            all_results.extend(results);
        }

        let open: Vec<&dyn Document> = documents.iter().map(|d| d as &dyn Document).collect();
        self.ctx
            .reconciler()
            .reconcile(&open, &all_results, ReconcileScope::Both);

        if failed_files > 0 {
            tracing::info!(files = failed_files, "Build aborted: there are compile errors");
            return Err(BuildError::CompileErrors {
                files: failed_files,
            });
        }

        let results = self
            .linker
            .link_files(
                &sources,
                &linker_config.exe_name,
                self.ctx.root(),
                &self.ctx.build_dir(),
                cancel,
            )
            .await?;
        self.ctx
            .reconciler()
            .reconcile(&[], &results, ReconcileScope::Both);
        Ok(results)
    }
}

/// Load a source file as a document. Bytes that are not UTF-8 (Latin-1
/// comments, say) are replaced rather than failing the read.
pub async fn read_document(path: &Path) -> Result<TextDocument, BuildError> {
    match tokio::fs::read(path).await {
        Ok(bytes) => Ok(TextDocument::new(path, &String::from_utf8_lossy(&bytes))),
        Err(source) => Err(BuildError::ReadSource {
            path: path.to_path_buf(),
            source,
        }),
    }
}
