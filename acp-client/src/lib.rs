#![warn(clippy::pedantic)]
//! Shared Agent Client Protocol transport: JSON-RPC 2.0 requests/responses
//! and notifications over newline-delimited JSON, exchanged with a
//! long-lived subprocess. Used by both `qwen-adapter` and `gemini-adapter`
//! so neither reimplements wire framing (spec.md §4.6.4).

pub mod client;
pub mod error;

pub use client::{AcpClient, NotificationSink, RequestHandler};
pub use error::AcpError;
