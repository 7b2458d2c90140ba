//! Unified error types for the build pipeline.
//!
//! Every fatal condition the orchestrator can hit maps to one `BuildError`
//! variant. The distinction between `CommandFailed` and `ExecutableNotFound`
//! is deliberate: the former is a tool-level build problem, the latter an
//! environment/installation problem, and they get different diagnostics.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Fatal pipeline errors. The only recoverable condition in the whole
/// program (a missing GN args override file) is handled as a warning before
/// it can ever become one of these.
#[derive(Error, Debug)]
pub enum BuildError {
    /// One or more required executables could not be resolved on the
    /// composed search path.
    #[error("missing prerequisites: {}", .0.join(", "))]
    MissingPrerequisites(Vec<String>),

    /// An external process exited nonzero.
    #[error("command `{command}` failed with exit code {code} (in {})", .dir.display())]
    CommandFailed {
        command: String,
        dir: PathBuf,
        code: i32,
    },

    /// The executable itself could not be started. Reported separately from
    /// `CommandFailed` because it points at the environment, not the build.
    #[error("executable not found: `{command}` (in {}). Is it installed and on PATH?", .dir.display())]
    ExecutableNotFound { command: String, dir: PathBuf },

    /// A stage aborted the sequence; carries the failing stage's name.
    #[error("stage `{stage}` failed: {source}")]
    StageFailed {
        stage: &'static str,
        #[source]
        source: Box<BuildError>,
    },

    /// Workspace setup or validation failure.
    #[error("workspace error: {0}")]
    Workspace(String),

    /// Filesystem or pipe I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl BuildError {
    /// Process exit code to report for this failure.
    ///
    /// Command failures propagate the child's own exit code; everything else
    /// maps to a generic 1.
    pub fn exit_code(&self) -> i32 {
        match self {
            BuildError::CommandFailed { code, .. } if *code > 0 => *code,
            BuildError::StageFailed { source, .. } => source.exit_code(),
            _ => 1,
        }
    }
}

/// Result type for all fallible pipeline operations.
pub type Result<T> = std::result::Result<T, BuildError>;
