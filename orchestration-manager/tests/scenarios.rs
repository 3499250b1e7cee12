//! End-to-end scenarios from spec.md §8, driven against `Manager::execute`
//! with an in-process fake adapter standing in for a real Cursor subprocess.

use async_trait::async_trait;
use orchestration_manager::{AdapterRegistry, CancellationToken, ExecuteOptions, LoggingBroadcaster, Manager};
use provider_model::event::{Event, EventKind, Metadata, Provider, ProviderStatus, Role};
use provider_model::{EventStream, ProviderAdapter, TurnOptions};
use serde_json::json;
use session_store::InMemoryStore;
use std::sync::Arc;
use tokio_stream::wrappers::ReceiverStream;

struct FakeCursorAdapter {
    events: Vec<Event>,
}

#[async_trait]
impl ProviderAdapter for FakeCursorAdapter {
    async fn check_availability(&self) -> ProviderStatus {
        ProviderStatus {
            available: true,
            configured: true,
            error: None,
            models: Some(vec!["gpt-5".to_string()]),
            default_models: Some(vec!["gpt-5".to_string()]),
        }
    }

    async fn stream(&self, _options: TurnOptions) -> EventStream {
        let (tx, rx) = tokio::sync::mpsc::channel(16);
        let events = self.events.clone();
        tokio::spawn(async move {
            for event in events {
                let _ = tx.send(event).await;
            }
        });
        Box::pin(ReceiverStream::new(rx))
    }

    fn supported_models(&self) -> Vec<String> {
        vec!["gpt-5".to_string()]
    }
}

fn init_event() -> Event {
    Event::new(
        "p1",
        "",
        Provider::Cursor,
        Role::System,
        EventKind::System,
        "Cursor session initialized",
        Metadata::hidden(),
    )
}

fn chat_event(session_id: &str) -> Event {
    Event::new("p1", session_id, Provider::Cursor, Role::Assistant, EventKind::Chat, "ok", Metadata::default())
}

fn result_event(session_id: &str, subtype: &str) -> Event {
    Event::new(
        "p1",
        session_id,
        Provider::Cursor,
        Role::System,
        EventKind::Result,
        "Cursor turn completed",
        Metadata {
            duration_ms: Some(12),
            original_event: Some(json!({"type": "result", "session_id": session_id, "duration_ms": 12, "subtype": subtype})),
            ..Metadata::hidden()
        },
    )
}

#[tokio::test]
async fn s1_cursor_happy_path() {
    let adapter = Arc::new(FakeCursorAdapter {
        events: vec![init_event(), chat_event("S1"), result_event("S1", "success")],
    });
    let mut registry = AdapterRegistry::new();
    registry.register(Provider::Cursor, adapter);
    let store = Arc::new(InMemoryStore::new());
    let manager = Manager::new(registry, store.clone(), Arc::new(LoggingBroadcaster));

    let outcome = manager
        .execute(
            "p1",
            "/tmp/p1/repo",
            "",
            "conv1",
            Provider::Cursor,
            ExecuteOptions {
                instruction: "list files".to_string(),
                ..ExecuteOptions::default()
            },
            CancellationToken::new(),
        )
        .await;

    assert!(outcome.success);
    assert_eq!(outcome.provider, Provider::Cursor);
    assert_eq!(outcome.messages_count, 3);

    let transcript = store.transcript("p1").await;
    assert_eq!(transcript.len(), 3);
    assert_eq!(transcript[1].kind, EventKind::Chat);
    assert_eq!(transcript[1].content, "ok");
}

#[tokio::test]
async fn s2_cursor_error_result() {
    let adapter = Arc::new(FakeCursorAdapter {
        events: vec![init_event(), chat_event("S1"), result_event("S1", "error")],
    });
    let mut registry = AdapterRegistry::new();
    registry.register(Provider::Cursor, adapter);
    let store = Arc::new(InMemoryStore::new());
    let manager = Manager::new(registry, store, Arc::new(LoggingBroadcaster));

    let outcome = manager
        .execute(
            "p1",
            "/tmp/p1/repo",
            "",
            "conv1",
            Provider::Cursor,
            ExecuteOptions {
                instruction: "list files".to_string(),
                ..ExecuteOptions::default()
            },
            CancellationToken::new(),
        )
        .await;

    assert!(!outcome.success);
}

#[tokio::test]
async fn unregistered_provider_fails_without_spawning() {
    let registry = AdapterRegistry::new();
    let store = Arc::new(InMemoryStore::new());
    let manager = Manager::new(registry, store, Arc::new(LoggingBroadcaster));

    let outcome = manager
        .execute(
            "p1",
            "/tmp/p1/repo",
            "",
            "conv1",
            Provider::Gemini,
            ExecuteOptions::default(),
            CancellationToken::new(),
        )
        .await;

    assert!(!outcome.success);
    assert_eq!(outcome.error.as_deref(), Some("provider not implemented"));
}

/// An adapter whose stream never finishes on its own, standing in for a
/// real subprocess still running when the caller cancels. Asserts that it
/// observes the same `cancellation` token the Manager was given (spec.md
/// §5: the adapter is responsible for tearing down its own subprocess).
struct NeverEndingAdapter;

#[async_trait]
impl ProviderAdapter for NeverEndingAdapter {
    async fn check_availability(&self) -> ProviderStatus {
        ProviderStatus {
            available: true,
            configured: true,
            error: None,
            models: None,
            default_models: None,
        }
    }

    async fn stream(&self, options: TurnOptions) -> EventStream {
        let (tx, rx) = tokio::sync::mpsc::channel(4);
        tokio::spawn(async move {
            let _ = tx
                .send(Event::new(
                    "p1",
                    "",
                    Provider::Codex,
                    Role::System,
                    EventKind::System,
                    "started",
                    Metadata::hidden(),
                ))
                .await;
            // Simulates a subprocess that only exits once its own copy of
            // the token fires.
            options.cancellation.cancelled().await;
        });
        Box::pin(ReceiverStream::new(rx))
    }

    fn supported_models(&self) -> Vec<String> {
        Vec::new()
    }
}

#[tokio::test]
async fn cancelling_the_token_ends_the_turn_as_cancelled() {
    let mut registry = AdapterRegistry::new();
    registry.register(Provider::Codex, Arc::new(NeverEndingAdapter));
    let store = Arc::new(InMemoryStore::new());
    let manager = Manager::new(registry, store, Arc::new(LoggingBroadcaster));

    let cancellation = CancellationToken::new();
    let cancel_handle = cancellation.clone();
    tokio::spawn(async move {
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        cancel_handle.cancel();
    });

    let outcome = manager
        .execute(
            "p1",
            "/tmp/p1/repo",
            "",
            "conv1",
            Provider::Codex,
            ExecuteOptions::default(),
            cancellation,
        )
        .await;

    assert!(!outcome.success);
    assert_eq!(outcome.error.as_deref(), Some("cancelled"));
}
