//! External tool execution for asmbuild.
//!
//! [`ProcessRunner`] launches an assembler or linker, captures its output,
//! kills the whole process tree on cancellation and feeds the designated
//! output stream to an [`OutputParser`].

pub mod cancel;
pub mod output;
pub mod parser;
pub mod process;
pub mod runner;

pub use cancel::CancelSignal;
pub use output::OutputChannel;
pub use parser::{AssemblerParser, LinkerParser, OutputParser};
pub use process::{HelperScriptKiller, TaskkillKiller, TreeKiller, default_tree_killer};
#[cfg(unix)]
pub use process::ProcessGroupKiller;
pub use runner::{PrimaryOutput, ProcessRunner, ToolInvocation};
