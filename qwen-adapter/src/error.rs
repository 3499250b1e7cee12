//! Error types for the Qwen adapter.

use thiserror::Error;

/// All errors that can occur during Qwen adapter operations.
#[derive(Debug, Error)]
pub enum QwenError {
    /// Neither `QWEN_CMD`, `qwen`, nor `qwen-code` resolved to an executable.
    #[error("Qwen CLI not found. Set QWEN_CMD or install 'qwen' in PATH.")]
    ExecutableNotFound,

    /// The shared ACP transport could not be started.
    #[error("failed to start Qwen ACP process: {0}")]
    Acp(#[from] acp_client::AcpError),

    /// `session/new` (and, if attempted, `authenticate` + retry) both failed.
    #[error("Qwen session/authentication failed: {0}")]
    SessionFailed(String),

    /// A `session/prompt` call failed for a reason other than an expired
    /// session (those are retried once transparently, see
    /// [`crate::turn`]).
    #[error("Qwen prompt error: {0}")]
    PromptFailed(String),

    /// Writing the `QWEN.md` marker file failed. Non-fatal: logged, not
    /// surfaced to the turn's event stream.
    #[error("failed to write QWEN.md: {0}")]
    MarkerWriteFailed(#[source] std::io::Error),
}
