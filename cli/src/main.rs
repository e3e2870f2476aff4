//! asmbuild - assemble and link m68k projects from the command line.
//!
//! Runs the configured assembler and linker, then prints the resulting
//! markers as `path:line:col: severity: message`. Diagnostics that could not
//! be placed on a line are printed to stderr.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use asmbuild_config::BuildConfig;
use asmbuild_diagnostics::{
    CollectingNotifier, DiagnosticStores, DiagnosticsSnapshot, ReconcileScope,
};
use asmbuild_engine::{Assembler, BuildContext, BuildError, Linker, Workspace, read_document};
use asmbuild_tools::{CancelSignal, OutputChannel};

#[derive(Parser)]
#[command(name = "asmbuild")]
#[command(about = "Assemble and link m68k projects, reporting tool diagnostics")]
struct Cli {
    /// Workspace root (defaults to the current directory)
    #[arg(long, global = true)]
    root: Option<PathBuf>,
    /// Print diagnostics as JSON
    #[arg(long, global = true)]
    json: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Assemble a single source file
    Build {
        /// Source file to assemble
        file: PathBuf,
        /// Emit line debug information
        #[arg(long)]
        debug: bool,
    },
    /// Assemble every source in the workspace, then link
    Workspace,
    /// Link the objects built from the given sources
    Link {
        /// Sources whose objects should be linked
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Executable name (defaults to the configured one)
        #[arg(long)]
        exe: Option<String>,
    },
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap_or_else(|_| EnvFilter::try_new("warn").expect("warn filter is valid"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(env_filter)
        .init();
}

/// `path` made absolute against `base`.
fn resolve_path(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

/// One line per marker, files with errors first.
fn render_markers(snapshot: &DiagnosticsSnapshot) -> Vec<String> {
    snapshot
        .files()
        .iter()
        .flat_map(|(path, markers)| markers.iter().map(|m| m.display_with_path(path)))
        .collect()
}

fn report(snapshot: &DiagnosticsSnapshot, notifications: &[String], json: bool) -> Result<()> {
    if json {
        let value = serde_json::json!({
            "markers": snapshot,
            "notifications": notifications,
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&value).context("serializing diagnostics")?
        );
        return Ok(());
    }

    for line in render_markers(snapshot) {
        println!("{line}");
    }
    for message in notifications {
        eprintln!("error: {message}");
    }
    if !snapshot.is_empty() {
        eprintln!("{}", snapshot.status_string());
    }
    Ok(())
}

/// Fire `cancel` on Ctrl-C so running tools are torn down.
fn cancel_on_interrupt(cancel: &CancelSignal) {
    let cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted; stopping tools");
            cancel.cancel();
        }
    });
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let cwd = std::env::current_dir().context("reading current directory")?;
    let root = cli
        .root
        .as_deref()
        .map_or_else(|| cwd.clone(), |root| resolve_path(&cwd, root));

    let config = BuildConfig::load(&root).context("loading configuration")?;
    let stores = Arc::new(DiagnosticStores::new());
    let notifier = Arc::new(CollectingNotifier::new());
    let ctx = Arc::new(BuildContext::new(
        &root,
        config,
        Arc::new(OutputChannel::new()),
        stores.clone(),
        notifier.clone(),
    ));

    let cancel = CancelSignal::new();
    cancel_on_interrupt(&cancel);

    let mut aborted = false;
    match cli.command {
        Commands::Build { file, debug } => {
            let doc = read_document(&resolve_path(&cwd, &file)).await?;
            Assembler::new(Arc::clone(&ctx))
                .build_document(&doc, debug, &cancel)
                .await?;
        }
        Commands::Workspace => match Workspace::new(Arc::clone(&ctx)).build(&cancel).await {
            Ok(_) => {}
            Err(err @ BuildError::CompileErrors { .. }) => {
                eprintln!("{err}");
                aborted = true;
            }
            Err(err) => return Err(err.into()),
        },
        Commands::Link { files, exe } => {
            let sources: Vec<PathBuf> = files.iter().map(|f| resolve_path(&cwd, f)).collect();
            let exe_name = exe.unwrap_or_else(|| ctx.config().linker.exe_name.clone());
            let results = Linker::new(Arc::clone(&ctx))
                .link_files(&sources, &exe_name, &root, &ctx.build_dir(), &cancel)
                .await?;
            ctx.reconciler()
                .reconcile(&[], &results, ReconcileScope::Both);
        }
    }

    let snapshot = stores.snapshot();
    let notifications = notifier.take();
    report(&snapshot, &notifications, cli.json)?;

    if aborted || snapshot.error_count() > 0 || !notifications.is_empty() {
        Ok(ExitCode::FAILURE)
    } else {
        Ok(ExitCode::SUCCESS)
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    init_tracing();
    let cli = Cli::parse();
    run(cli).await
}
