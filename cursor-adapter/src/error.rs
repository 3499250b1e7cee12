//! Error types for the Cursor Agent adapter.

use thiserror::Error;

/// Errors that can occur when interacting with the Cursor Agent CLI.
#[derive(Debug, Error)]
pub enum CursorError {
    /// The Cursor Agent executable was not found at the expected path.
    #[error("cursor-agent executable not found: {0}")]
    ExecutableNotFound(String),

    /// Path lookup via `which` failed.
    #[error("Executable not found via which: {0}")]
    WhichError(#[from] which::Error),

    /// A subprocess I/O operation failed.
    #[error("Failed to spawn cursor-agent: {0}")]
    SpawnFailed(#[source] std::io::Error),

    /// The subprocess stdout handle was `None`.
    #[error("Subprocess stdout was None")]
    NoStdout,

    /// The subprocess exceeded its configured timeout.
    #[error("cursor-agent process timed out after {elapsed:?} (PID: {pid})")]
    Timeout {
        /// How long the process ran before being killed.
        elapsed: std::time::Duration,
        /// OS process identifier.
        pid: u32,
    },
}
