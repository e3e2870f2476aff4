//! Build orchestration for asmbuild.
//!
//! [`Assembler`] builds one file, [`Linker`] links a set of objects and
//! [`Workspace`] does both for every source under the root. All of them
//! share a [`BuildContext`] holding the configuration, the process runner
//! and the reconciler that publishes diagnostics.

mod assembler;
mod context;
mod error;
mod linker;
mod workspace;

pub use assembler::{Assembler, object_file_name};
pub use context::BuildContext;
pub use error::BuildError;
pub use linker::Linker;
pub use workspace::{Workspace, read_document};
