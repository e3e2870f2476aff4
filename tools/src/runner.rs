//! Runs an external tool and turns its output into diagnostics.
//!
//! Infrastructure failures stop here. A missing binary, a spawn error or
//! unexpected fatal stderr all reduce to an empty result plus a log line, so
//! callers only ever see parsed diagnostics.

use std::collections::HashMap;
use std::io;
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use std::time::Duration;

use asmbuild_types::CheckResult;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::task::JoinHandle;
use tokio::time::timeout;

use crate::cancel::CancelSignal;
use crate::output::OutputChannel;
use crate::parser::OutputParser;
use crate::process::{ChildGuard, TreeKiller, default_tree_killer};

/// How long to wait for pipes to drain after a cancelled run.
const CANCELLED_DRAIN_TIMEOUT: Duration = Duration::from_millis(2_000);

/// The stream a tool writes its diagnostics to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PrimaryOutput {
    #[default]
    Stdout,
    Stderr,
}

/// One fully-resolved tool execution.
#[derive(Debug, Clone)]
pub struct ToolInvocation {
    pub command: PathBuf,
    pub args: Vec<String>,
    pub cwd: PathBuf,
    /// Replaces the inherited environment when set.
    pub env: Option<HashMap<String, String>>,
    pub primary: PrimaryOutput,
}

impl ToolInvocation {
    #[must_use]
    pub fn new(command: impl Into<PathBuf>, cwd: impl Into<PathBuf>) -> Self {
        Self {
            command: command.into(),
            args: Vec::new(),
            cwd: cwd.into(),
            env: None,
            primary: PrimaryOutput::Stdout,
        }
    }

    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn env(mut self, env: HashMap<String, String>) -> Self {
        self.env = Some(env);
        self
    }

    #[must_use]
    pub fn primary(mut self, primary: PrimaryOutput) -> Self {
        self.primary = primary;
        self
    }

    /// `<cmd> <args...>` joined with single spaces, for trace lines.
    #[must_use]
    pub fn command_line(&self) -> String {
        std::iter::once(self.command.display().to_string())
            .chain(self.args.iter().cloned())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Captured result of a process that was spawned successfully.
#[derive(Debug)]
struct Captured {
    status: ExitStatus,
    stdout: String,
    stderr: String,
}

/// Spawns tools, supports cancellation and hands output to a parser.
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    output: Arc<OutputChannel>,
    killer: Arc<dyn TreeKiller>,
}

impl ProcessRunner {
    /// Runner using the platform's default tree-kill strategy.
    #[must_use]
    pub fn new(output: Arc<OutputChannel>) -> Self {
        Self {
            output,
            killer: default_tree_killer(),
        }
    }

    #[must_use]
    pub fn with_tree_killer(mut self, killer: Arc<dyn TreeKiller>) -> Self {
        self.killer = killer;
        self
    }

    #[must_use]
    pub fn output(&self) -> &Arc<OutputChannel> {
        &self.output
    }

    /// Run `invocation` to completion (or cancellation) and parse its output.
    ///
    /// Never fails: infrastructure problems yield an empty result. A non-zero
    /// exit is normal for tools that report diagnostics and is parsed as usual.
    pub async fn run(
        &self,
        invocation: &ToolInvocation,
        cancel: &CancelSignal,
        parser: &dyn OutputParser,
    ) -> Vec<CheckResult> {
        match self.execute(invocation, cancel).await {
            Some(captured) => self.classify(invocation, captured, parser),
            None => Vec::new(),
        }
    }

    async fn execute(&self, invocation: &ToolInvocation, cancel: &CancelSignal) -> Option<Captured> {
        let tool = invocation.command.display().to_string();

        let mut cmd = Command::new(&invocation.command);
        cmd.args(&invocation.args)
            .current_dir(&invocation.cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(env) = &invocation.env {
            cmd.env_clear().envs(env);
        }
        self.killer.prepare(&mut cmd);

        let child = match cmd.spawn() {
            Ok(child) => child,
            // Builds run on every save; a missing tool must stay quiet.
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::debug!(tool = %tool, "Cannot find tool");
                return None;
            }
            Err(e) => {
                tracing::warn!(tool = %tool, error = %e, "Failed to spawn tool");
                return None;
            }
        };
        let mut guard = ChildGuard::new(child, Arc::clone(&self.killer));

        let child = guard.child_mut()?;
        let stdout_task = tokio::spawn(read_to_string_lossy(child.stdout.take()));
        let stderr_task = tokio::spawn(read_to_string_lossy(child.stderr.take()));

        let finished = tokio::select! {
            res = child.wait() => Some(res),
            () = cancel.cancelled() => None,
        };

        let cancelled = finished.is_none();
        let status = match finished {
            Some(res) => res,
            None => {
                tracing::info!(tool = %tool, "Cancellation requested; killing tool process tree");
                guard.kill_tree().await;
                let child = guard.child_mut()?;
                child.wait().await
            }
        };
        let status = match status {
            Ok(status) => status,
            Err(e) => {
                tracing::warn!(tool = %tool, error = %e, "Failed to wait for tool");
                return None;
            }
        };
        guard.disarm();

        let stdout = drain(stdout_task, cancelled).await;
        let stderr = drain(stderr_task, cancelled).await;

        Some(Captured {
            status,
            stdout,
            stderr,
        })
    }

    fn classify(
        &self,
        invocation: &ToolInvocation,
        captured: Captured,
        parser: &dyn OutputParser,
    ) -> Vec<CheckResult> {
        let command_line = invocation.command_line();

        // Fatal output on a stream that is not supposed to carry diagnostics
        // means the tool itself broke; report it in the trace and move on.
        if !captured.status.success()
            && !captured.stderr.is_empty()
            && invocation.primary != PrimaryOutput::Stderr
        {
            tracing::warn!(
                command = %command_line,
                status = %captured.status,
                "Tool failed with unexpected stderr output"
            );
            self.output
                .append_line(format!("Error while running tool: {command_line}"));
            self.output.append_line(captured.stderr);
            return Vec::new();
        }

        let text = match invocation.primary {
            PrimaryOutput::Stdout => &captured.stdout,
            PrimaryOutput::Stderr => &captured.stderr,
        };
        self.output.append_line(format!(
            "{}>Finished running tool: {command_line}",
            invocation.cwd.display()
        ));
        let results = parser.parse(text);
        self.output.append_line("");
        tracing::debug!(command = %command_line, count = results.len(), "Parsed tool output");
        results
    }
}

async fn read_to_string_lossy<R: AsyncRead + Unpin + Send + 'static>(reader: Option<R>) -> String {
    let Some(mut reader) = reader else {
        return String::new();
    };
    let mut buf = Vec::new();
    if let Err(e) = reader.read_to_end(&mut buf).await {
        tracing::debug!(error = %e, "Tool output stream ended with an error");
    }
    String::from_utf8_lossy(&buf).into_owned()
}

/// Collect a reader task. After cancellation a surviving grandchild may
/// still hold the pipe, so the wait is bounded.
async fn drain(task: JoinHandle<String>, cancelled: bool) -> String {
    if cancelled {
        match timeout(CANCELLED_DRAIN_TIMEOUT, task).await {
            Ok(joined) => joined.unwrap_or_default(),
            Err(_) => String::new(),
        }
    } else {
        task.await.unwrap_or_default()
    }
}
