//! The Broadcaster interface boundary (spec.md §6.2): best-effort fan-out
//! of non-hidden events to subscribed clients. The WebSocket transport
//! itself is out of scope (spec.md §1); this crate only defines the
//! boundary and a reference implementation for tests and manual smoke runs.

use async_trait::async_trait;
use provider_model::event::Event;

/// Publishes events to whatever live subscribers exist for a project.
/// Failures are the implementor's problem to log; the Manager never
/// treats a broadcast failure as a turn failure.
#[async_trait]
pub trait Broadcaster: Send + Sync {
    async fn send(&self, project_id: &str, event: &Event);
}

/// Reference `Broadcaster` that logs each publish at `info` level instead
/// of fanning out over a transport. Used by tests and by
/// `orchestration-cli`'s manual smoke-test mode.
#[derive(Debug, Clone, Default)]
pub struct LoggingBroadcaster;

#[async_trait]
impl Broadcaster for LoggingBroadcaster {
    async fn send(&self, project_id: &str, event: &Event) {
        tracing::info!(
            project_id,
            provider = %event.provider,
            kind = ?event.kind,
            content = %event.content,
            "broadcast event"
        );
    }
}
