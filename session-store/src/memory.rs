//! Reference in-memory `Store`. Not for production use (spec.md §1 keeps
//! the real persistence layer out of scope); this backs unit/integration
//! tests and `orchestration-cli`'s manual smoke-test mode.

use crate::store::{Store, StoreError};
use async_trait::async_trait;
use provider_model::event::{Event, Provider, SessionHandle};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use tokio::sync::RwLock;

type SessionKey = (String, Provider);

#[derive(Default)]
pub struct InMemoryStore {
    events: RwLock<HashMap<String, Vec<Event>>>,
    seen_ids: RwLock<HashSet<String>>,
    sessions: RwLock<HashMap<SessionKey, SessionHandle>>,
}

impl InMemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every event persisted for `project_id`, in append order.
    /// Used by tests to assert on the full transcript (spec.md §8 scenarios).
    pub async fn transcript(&self, project_id: &str) -> Vec<Event> {
        self.events
            .read()
            .await
            .get(project_id)
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn append_event(&self, event: Event) -> Result<(), StoreError> {
        let mut seen = self.seen_ids.write().await;
        if !seen.insert(event.id.clone()) {
            return Ok(());
        }
        drop(seen);

        let mut events = self.events.write().await;
        events.entry(event.project_id.clone()).or_default().push(event);
        Ok(())
    }

    async fn get_session(
        &self,
        project_id: &str,
        provider: Provider,
    ) -> Result<Option<SessionHandle>, StoreError> {
        let key = (project_id.to_string(), provider);
        Ok(self.sessions.read().await.get(&key).cloned())
    }

    async fn set_session(
        &self,
        project_id: &str,
        provider: Provider,
        handle: SessionHandle,
    ) -> Result<(), StoreError> {
        let key = (project_id.to_string(), provider);
        // Single write-lock critical section: the whole map is locked only
        // for the duration of one insert, so a concurrent writer for a
        // different (project_id, provider) key is blocked momentarily but
        // never observes a torn or clobbered value (spec.md §4.4, §9).
        self.sessions.write().await.insert(key, handle);
        Ok(())
    }

    async fn list_repo_files(&self, project_path: &str) -> Result<Vec<String>, StoreError> {
        let root = project_path.to_string();
        tokio::task::spawn_blocking(move || walk(Path::new(&root)))
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?
    }
}

fn walk(root: &Path) -> Result<Vec<String>, StoreError> {
    let mut out = Vec::new();
    walk_into(root, root, &mut out)?;
    out.sort();
    Ok(out)
}

fn walk_into(root: &Path, dir: &Path, out: &mut Vec<String>) -> Result<(), StoreError> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Ok(());
    };
    for entry in entries.flatten() {
        let path = entry.path();
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if name.starts_with(".git")
            || name == "AGENTS.md"
            || name == "QWEN.md"
            || name == "GEMINI.md"
        {
            continue;
        }
        if path.is_dir() {
            walk_into(root, &path, out)?;
        } else if let Ok(rel) = path.strip_prefix(root) {
            out.push(rel.to_string_lossy().into_owned());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use provider_model::event::{EventKind, Metadata, Role};

    fn ev(project: &str, provider: Provider) -> Event {
        Event::new(
            project,
            "s1",
            provider,
            Role::Assistant,
            EventKind::Chat,
            "hi",
            Metadata::default(),
        )
    }

    #[tokio::test]
    async fn append_is_idempotent_on_id() {
        let store = InMemoryStore::new();
        let e = ev("p1", Provider::Claude);
        store.append_event(e.clone()).await.unwrap();
        store.append_event(e).await.unwrap();
        assert_eq!(store.transcript("p1").await.len(), 1);
    }

    #[tokio::test]
    async fn session_round_trip_is_per_provider() {
        // spec.md §8 property 6
        let store = InMemoryStore::new();
        store
            .set_session(
                "p1",
                Provider::Cursor,
                SessionHandle {
                    session_id: "S1".to_string(),
                    resume_hint: None,
                },
            )
            .await
            .unwrap();

        let codex_before = store.get_session("p1", Provider::Codex).await.unwrap();
        assert!(codex_before.is_none());

        store
            .set_session(
                "p1",
                Provider::Codex,
                SessionHandle {
                    session_id: "C1".to_string(),
                    resume_hint: Some("/rollouts/a.jsonl".to_string()),
                },
            )
            .await
            .unwrap();

        let cursor = store.get_session("p1", Provider::Cursor).await.unwrap().unwrap();
        assert_eq!(cursor.session_id, "S1");
        let codex = store.get_session("p1", Provider::Codex).await.unwrap().unwrap();
        assert_eq!(codex.session_id, "C1");
    }

    #[tokio::test]
    async fn resume_hint_helpers_round_trip() {
        let store = InMemoryStore::new();
        store
            .set_resume_hint("p1", Provider::Qwen, "blob".to_string())
            .await
            .unwrap();
        let hint = store.get_resume_hint("p1", Provider::Qwen).await.unwrap();
        assert_eq!(hint.as_deref(), Some("blob"));
    }
}
