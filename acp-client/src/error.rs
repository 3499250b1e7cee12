//! Error types for the ACP transport.

use thiserror::Error;

/// Errors that can occur over an ACP connection.
#[derive(Debug, Error)]
pub enum AcpError {
    /// The provider executable could not be spawned.
    #[error("failed to spawn ACP process at stage '{stage}': {source}")]
    SpawnFailed {
        stage: String,
        #[source]
        source: std::io::Error,
    },

    /// Writing a request/response to the process's stdin failed.
    #[error("failed to write to ACP process stdin: {0}")]
    Write(#[source] std::io::Error),

    /// A line of output could not be parsed as JSON.
    #[error("malformed ACP message: {0}")]
    MalformedMessage(String),

    /// The peer returned a JSON-RPC error object.
    #[error("ACP error {code}: {message}")]
    JsonRpc {
        code: i64,
        message: String,
        data: Option<serde_json::Value>,
    },

    /// The reader loop exited (process closed stdout) while a request was
    /// still pending.
    #[error("ACP connection closed before a response arrived")]
    ConnectionClosed,

    /// A request timed out waiting for a response.
    #[error("ACP request '{method}' timed out")]
    Timeout { method: String },
}
