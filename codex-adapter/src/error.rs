//! Error types for the Codex adapter.

use thiserror::Error;

/// Errors that can occur when interacting with the Codex CLI.
#[derive(Debug, Error)]
pub enum CodexError {
    /// The Codex executable was not found at the expected path.
    #[error("Codex executable not found: {0}")]
    ExecutableNotFound(String),

    /// Path lookup via `which` failed.
    #[error("Executable not found via which: {0}")]
    WhichError(#[from] which::Error),

    /// A subprocess I/O operation failed.
    #[error("Failed to spawn process at stage {stage}: {source}")]
    SpawnFailed {
        /// The lifecycle stage where the failure occurred.
        stage: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Writing a line to the subprocess's stdin failed.
    #[error("failed to write to Codex process stdin: {0}")]
    Write(#[source] std::io::Error),

    /// `session_configured` did not arrive within the read budget.
    #[error("Codex session did not configure: {0}")]
    SessionFailed(String),

    /// The subprocess exited (or its stdout closed) before sending
    /// `task_complete`.
    #[error("Codex process ended before completing the turn")]
    ConnectionClosed,

    /// The subprocess exceeded its configured timeout.
    #[error("Codex process timed out after {elapsed:?} (PID: {pid})")]
    Timeout {
        /// How long the process ran before being killed.
        elapsed: std::time::Duration,
        /// OS process identifier.
        pid: u32,
    },

    /// Sending a signal to the subprocess failed.
    #[error("Failed to send signal {signal} to PID {pid}: {reason}")]
    SignalFailed {
        /// The signal name (e.g. `"SIGTERM"`).
        signal: String,
        /// OS process identifier.
        pid: u32,
        /// Platform-specific error description.
        reason: String,
    },

    /// Subprocess stdout handle was `None`.
    #[error("Subprocess stdout was None")]
    NoStdout,

    /// Subprocess stdin handle was `None`.
    #[error("Subprocess stdin was None")]
    NoStdin,

    /// Subprocess PID was `None`.
    #[error("Subprocess PID was None")]
    NoPid,
}
