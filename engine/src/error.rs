use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Why a build could not be carried out.
///
/// Diagnostics reported by the tools are not errors; they come back as
/// data. These variants cover configuration and filesystem problems, plus
/// the deliberate abort of a workspace build.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("assembler is disabled in the configuration")]
    AssemblerDisabled,

    #[error("linker is disabled in the configuration")]
    LinkerDisabled,

    #[error("workspace root not found: {}", .0.display())]
    MissingRoot(PathBuf),

    #[error("error creating build dir {}: {source}", path.display())]
    CreateBuildDir { path: PathBuf, source: io::Error },

    #[error("failed to read source {}: {source}", path.display())]
    ReadSource { path: PathBuf, source: io::Error },

    #[error("invalid glob '{pattern}': {source}")]
    InvalidGlob {
        pattern: String,
        source: globset::Error,
    },

    #[error("Build aborted: there are compile errors ({files} file(s) reported diagnostics)")]
    CompileErrors { files: usize },
}
