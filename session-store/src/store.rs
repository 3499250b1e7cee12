//! The `Store` interface boundary (spec.md §6.1).

use async_trait::async_trait;
use provider_model::event::{Event, Provider, SessionHandle};
use thiserror::Error;

/// Errors a `Store` implementation may report. The core never interprets
/// these beyond logging and failing the current turn; it does not retry.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("backend unavailable: {0}")]
    Unavailable(String),
    #[error("io error listing repo files: {0}")]
    Io(#[from] std::io::Error),
}

/// Durable, ordered, per-project event log plus per-`(project_id, provider)`
/// session state. Implementations MUST make `SetSession`/`SetResumeHint`
/// atomic per key (spec.md §4.4, §9): a write for `(p, cursor)` must never
/// observe or clobber a concurrent write for `(p, codex)`.
#[async_trait]
pub trait Store: Send + Sync {
    /// Appends `event` to the project's durable log. Ordered per
    /// `project_id`; idempotent on `event.id` (re-appending the same id is a
    /// no-op, not an error).
    async fn append_event(&self, event: Event) -> Result<(), StoreError>;

    /// Returns the stored session handle for `(project_id, provider)`, if
    /// any. Reads are repeatable-read within a turn.
    async fn get_session(
        &self,
        project_id: &str,
        provider: Provider,
    ) -> Result<Option<SessionHandle>, StoreError>;

    /// Upserts the session handle for `(project_id, provider)`.
    async fn set_session(
        &self,
        project_id: &str,
        provider: Provider,
        handle: SessionHandle,
    ) -> Result<(), StoreError>;

    /// Convenience accessor over `SessionHandle::resume_hint`.
    async fn get_resume_hint(
        &self,
        project_id: &str,
        provider: Provider,
    ) -> Result<Option<String>, StoreError> {
        Ok(self
            .get_session(project_id, provider)
            .await?
            .and_then(|h| h.resume_hint))
    }

    /// Sets `resume_hint` on the existing handle for `(project_id,
    /// provider)`, creating one with an empty `session_id` if none exists
    /// yet.
    async fn set_resume_hint(
        &self,
        project_id: &str,
        provider: Provider,
        hint: String,
    ) -> Result<(), StoreError> {
        let mut handle = self
            .get_session(project_id, provider)
            .await?
            .unwrap_or_default();
        handle.resume_hint = Some(hint);
        self.set_session(project_id, provider, handle).await
    }

    /// Lists repo-relative file paths under `project_path`, used for
    /// initial-prompt context injection (spec.md §6.1). Excludes `.git*`
    /// and the provider marker files (`AGENTS.md`, `QWEN.md`, `GEMINI.md`).
    async fn list_repo_files(&self, project_path: &str) -> Result<Vec<String>, StoreError>;
}
