//! Error types for the Gemini adapter.

use thiserror::Error;

/// All errors that can occur during Gemini adapter operations.
#[derive(Debug, Error)]
pub enum GeminiError {
    /// `gemini` did not resolve to an executable on `$PATH`.
    #[error("Gemini CLI not found. Install Gemini CLI and ensure it is in PATH.")]
    ExecutableNotFound,

    /// The shared ACP transport could not be started.
    #[error("failed to start Gemini ACP process: {0}")]
    Acp(#[from] acp_client::AcpError),

    /// `session/new` (and, if attempted, `authenticate` + retry) both failed.
    #[error("Gemini session/authentication failed: {0}")]
    SessionFailed(String),

    /// A `session/prompt` call failed for a reason other than an expired
    /// session (those are retried once transparently, see
    /// [`crate::turn`]).
    #[error("Gemini prompt error: {0}")]
    PromptFailed(String),
}
