//! Process-tree termination and child-process guards.
//!
//! Killing a tool must also take down everything it spawned (assemblers
//! that shell out to preprocessors, wrapper scripts, ...). How that is done
//! is platform specific, so it sits behind the [`TreeKiller`] trait:
//!
//! - [`ProcessGroupKiller`] (Unix): the child is started in its own session
//!   and the whole process group is sent `SIGKILL`.
//! - [`TaskkillKiller`] (Windows): `taskkill.exe /F /T /PID <pid>`.
//! - [`HelperScriptKiller`]: an external script that receives the pid and
//!   walks the tree itself.
//!
//! Every implementation is best-effort. Failures are logged at debug level
//! and never reach the caller.

use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;

use tokio::process::{Child, Command};

/// Terminates a process together with all of its descendants.
pub trait TreeKiller: fmt::Debug + Send + Sync {
    /// Adjust the command before spawning (e.g. start a new session).
    fn prepare(&self, _cmd: &mut Command) {}

    /// Kill `pid` and its descendants. Must not panic and must not fail.
    fn kill_tree(&self, pid: u32);
}

/// Platform default: process groups on Unix, `taskkill` on Windows.
#[must_use]
pub fn default_tree_killer() -> Arc<dyn TreeKiller> {
    #[cfg(unix)]
    {
        Arc::new(ProcessGroupKiller)
    }
    #[cfg(not(unix))]
    {
        Arc::new(TaskkillKiller::default())
    }
}

/// Kills the session/process group created for the child.
#[cfg(unix)]
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessGroupKiller;

#[cfg(unix)]
impl TreeKiller for ProcessGroupKiller {
    fn prepare(&self, cmd: &mut Command) {
        set_new_session(cmd);
    }

    fn kill_tree(&self, pid: u32) {
        let Ok(pgid) = libc::pid_t::try_from(pid) else {
            return;
        };
        // SAFETY: plain syscall, no memory is shared with the kernel.
        if unsafe { libc::killpg(pgid, libc::SIGKILL) } == -1 {
            let err = std::io::Error::last_os_error();
            if err.raw_os_error() != Some(libc::ESRCH) {
                tracing::debug!(pid, error = %err, "killpg failed");
            }
        }
    }
}

/// Uses the Windows `taskkill` utility, which walks the tree natively.
#[derive(Debug, Clone)]
pub struct TaskkillKiller {
    binary: PathBuf,
}

impl Default for TaskkillKiller {
    fn default() -> Self {
        Self {
            binary: PathBuf::from(r"C:\Windows\System32\taskkill.exe"),
        }
    }
}

impl TreeKiller for TaskkillKiller {
    fn kill_tree(&self, pid: u32) {
        let pid_arg = pid.to_string();
        run_blocking_quietly(&self.binary, &["/F", "/T", "/PID", &pid_arg]);
    }
}

/// Delegates to an external script invoked as `<script> <pid>`.
#[derive(Debug, Clone)]
pub struct HelperScriptKiller {
    script: PathBuf,
}

impl HelperScriptKiller {
    #[must_use]
    pub fn new(script: impl Into<PathBuf>) -> Self {
        Self {
            script: script.into(),
        }
    }
}

impl TreeKiller for HelperScriptKiller {
    fn kill_tree(&self, pid: u32) {
        let pid_arg = pid.to_string();
        run_blocking_quietly(&self.script, &[&pid_arg]);
    }
}

/// Run a short-lived helper to completion, discarding output and errors.
fn run_blocking_quietly(program: &Path, args: &[&str]) {
    let status = std::process::Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status();
    match status {
        Ok(status) if !status.success() => {
            tracing::debug!(helper = %program.display(), %status, "tree kill helper failed");
        }
        Ok(_) => {}
        Err(e) => {
            tracing::debug!(helper = %program.display(), error = %e, "tree kill helper did not run");
        }
    }
}

/// Put the child process in its own session (Unix only) so the entire process
/// group can be killed via `killpg`.
#[cfg(unix)]
pub fn set_new_session(cmd: &mut Command) {
    use std::os::unix::process::CommandExt;
    // SAFETY: the closure only calls async-signal-safe functions.
    unsafe {
        cmd.as_std_mut().pre_exec(|| {
            if libc::setsid() == -1 {
                return Err(std::io::Error::last_os_error());
            }
            // Linux-only: the tool dies with us instead of lingering as an orphan.
            #[cfg(target_os = "linux")]
            if libc::prctl(libc::PR_SET_PDEATHSIG, libc::SIGKILL) == -1 {
                return Err(std::io::Error::last_os_error());
            }
            Ok(())
        });
    }
}

/// RAII guard that kills a child process tree on drop.
///
/// Wrap a spawned child immediately after `spawn()` so the tree is cleaned
/// up if the owning future is dropped mid-run. Call `disarm()` once the
/// process has exited normally.
pub struct ChildGuard {
    child: Option<Child>,
    killer: Arc<dyn TreeKiller>,
}

impl ChildGuard {
    #[must_use]
    pub fn new(child: Child, killer: Arc<dyn TreeKiller>) -> Self {
        Self {
            child: Some(child),
            killer,
        }
    }

    pub fn child_mut(&mut self) -> Option<&mut Child> {
        self.child.as_mut()
    }

    /// Best-effort termination of the child and its descendants.
    ///
    /// The tree killer runs on the blocking pool, since helpers such as
    /// `taskkill` or a kill script are synchronous processes of their own.
    /// It finishes before the direct child is signalled so a helper can
    /// still walk the live tree.
    pub async fn kill_tree(&mut self) {
        let Some(pid) = self.child.as_ref().and_then(Child::id) else {
            return;
        };
        let killer = Arc::clone(&self.killer);
        if let Err(e) = tokio::task::spawn_blocking(move || killer.kill_tree(pid)).await {
            tracing::debug!(pid, error = %e, "tree kill task failed");
        }
        // The tree killer may not reach the direct child (helper missing,
        // group already gone); signal it directly as well.
        if let Some(child) = self.child.as_mut() {
            let _ = child.start_kill();
        }
    }

    pub fn disarm(&mut self) {
        self.child = None;
    }
}

impl Drop for ChildGuard {
    fn drop(&mut self) {
        let Some(mut child) = self.child.take() else {
            return;
        };
        let killer = Arc::clone(&self.killer);
        let mut kill = move || {
            if let Some(pid) = child.id() {
                killer.kill_tree(pid);
            }
            let _ = child.start_kill();
            let _ = child.try_wait();
        };
        // Outside a runtime there is no worker to protect.
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn_blocking(kill);
            }
            Err(_) => kill(),
        }
    }
}

/// Whether `pid` names a live (non-zombie) process.
///
/// Used to verify tree termination. Returns `false` when the process cannot
/// be inspected.
#[must_use]
pub fn is_process_running(pid: u32) -> bool {
    #[cfg(target_os = "linux")]
    {
        let Ok(stat) = std::fs::read_to_string(format!("/proc/{pid}/stat")) else {
            return false;
        };
        !matches!(parse_linux_proc_stat_state(&stat), Some('Z' | 'X') | None)
    }
    #[cfg(all(unix, not(target_os = "linux")))]
    {
        let Ok(pid) = libc::pid_t::try_from(pid) else {
            return false;
        };
        // SAFETY: signal 0 only probes for existence.
        unsafe { libc::kill(pid, 0) == 0 }
    }
    #[cfg(not(unix))]
    {
        let _ = pid;
        false
    }
}

#[cfg(target_os = "linux")]
fn parse_linux_proc_stat_state(proc_stat: &str) -> Option<char> {
    // /proc/<pid>/stat format: pid (comm) state ppid ...
    // The comm field may contain spaces; find the last ')' to locate the end.
    let close_paren = proc_stat.rfind(')')?;
    proc_stat.get(close_paren + 1..)?.trim_start().chars().next()
}

#[cfg(test)]
mod tests {
    use super::{HelperScriptKiller, TaskkillKiller, TreeKiller};

    #[test]
    fn missing_helper_script_is_swallowed() {
        let killer = HelperScriptKiller::new("/nonexistent/terminate-tree.sh");
        killer.kill_tree(u32::MAX);
    }

    #[cfg(unix)]
    #[test]
    fn taskkill_missing_on_unix_is_swallowed() {
        TaskkillKiller::default().kill_tree(u32::MAX);
    }

    #[cfg(unix)]
    #[test]
    fn process_group_kill_of_unknown_pid_is_swallowed() {
        super::ProcessGroupKiller.kill_tree(i32::MAX as u32);
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn parses_state_after_comm_with_spaces() {
        let stat = "1234 (my tool (x)) S 1 1234 1234 0 -1";
        assert_eq!(super::parse_linux_proc_stat_state(stat), Some('S'));
        assert_eq!(super::parse_linux_proc_stat_state("garbage"), None);
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn current_process_is_running() {
        assert!(super::is_process_running(std::process::id()));
    }
}
