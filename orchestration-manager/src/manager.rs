//! The concurrent execution manager: `Execute` (spec.md §4.5).

use crate::broadcaster::Broadcaster;
use crate::outcome::{ExecuteOptions, TurnOutcome};
use crate::registry::AdapterRegistry;
use provider_model::event::{EventKind, Provider};
use provider_model::{CancellationToken, TurnOptions};
use serde_json::Value;
use session_store::Store;
use std::sync::Arc;
use tokio_stream::StreamExt;

/// Binds the adapter registry, session store, and broadcaster together and
/// drives one turn per `execute` call. Many calls may run concurrently for
/// distinct `(project_id, session_id)` pairs; the Store is the only shared
/// mutable state and is expected to serialize per-key writes itself
/// (spec.md §4.5, §9).
pub struct Manager {
    registry: AdapterRegistry,
    store: Arc<dyn Store>,
    broadcaster: Arc<dyn Broadcaster>,
}

impl Manager {
    #[must_use]
    pub fn new(registry: AdapterRegistry, store: Arc<dyn Store>, broadcaster: Arc<dyn Broadcaster>) -> Self {
        Self {
            registry,
            store,
            broadcaster,
        }
    }

    /// Runs one turn against `provider` for `project_id`, persisting and
    /// broadcasting every normalized event, and returns the turn outcome.
    ///
    /// `session_id` is the caller's best-known prior correlation id for
    /// this turn; it seeds the `session_id` stamped on events emitted
    /// before the adapter has reported its own provider-assigned session
    /// (e.g. a `provider not implemented`/`not available` failure). Once
    /// the adapter's stream carries its own `session_id`, that value wins.
    ///
    /// `cancellation` is the turn's deadline/cancellation signal (spec.md
    /// §5): cancelling it ends the turn early with `error:"cancelled"` and
    /// is also handed to the adapter via `TurnOptions` so it can terminate
    /// its own subprocess or in-flight request. Pass
    /// [`CancellationToken::new`] when the caller has no deadline to
    /// impose.
    #[allow(clippy::too_many_arguments)]
    pub async fn execute(
        &self,
        project_id: &str,
        project_path: &str,
        session_id: &str,
        conversation_id: &str,
        provider: Provider,
        opts: ExecuteOptions,
        cancellation: CancellationToken,
    ) -> TurnOutcome {
        let Some(adapter) = self.registry.get(provider) else {
            return TurnOutcome {
                success: false,
                provider,
                has_changes: false,
                messages_count: 0,
                error: Some("provider not implemented".to_string()),
            };
        };

        let probe = adapter.check_availability().await;
        if !probe.available || !probe.configured {
            return TurnOutcome {
                success: false,
                provider,
                has_changes: false,
                messages_count: 0,
                error: Some(probe.error.unwrap_or_else(|| "provider not available".to_string())),
            };
        }

        let turn_options = TurnOptions {
            project_id: project_id.to_string(),
            project_path: project_path.to_string(),
            instruction: opts.instruction,
            is_initial_prompt: opts.is_initial_prompt,
            model: opts.model,
            images: opts.images,
            cancellation: cancellation.clone(),
        };

        let mut stream = adapter.stream(turn_options).await;

        let mut has_error = false;
        let mut has_changes = false;
        let mut messages_count = 0usize;
        let mut last_error: Option<String> = None;
        let mut cursor_success: Option<bool> = None;
        let mut fallback_session_id = session_id.to_string();
        let mut was_cancelled = false;

        loop {
            let next = tokio::select! {
                biased;
                () = cancellation.cancelled() => {
                    was_cancelled = true;
                    None
                }
                event = stream.next() => event,
            };
            let Some(mut event) = next else { break };
            messages_count += 1;

            event
                .metadata
                .extra
                .insert("conversation_id".to_string(), Value::String(conversation_id.to_string()));

            if !event.session_id.is_empty() {
                fallback_session_id = event.session_id.clone();
            } else {
                event.session_id = fallback_session_id.clone();
            }

            if event.kind == EventKind::Error {
                has_error = true;
                last_error = Some(event.content.clone());
            }
            if event.metadata.changes_made == Some(true) {
                has_changes = true;
            }

            if provider == Provider::Cursor && event.kind == EventKind::Result {
                cursor_success = event.metadata.original_event.as_ref().map(cursor_result_is_success);
                if last_error.is_none() && cursor_success == Some(false) {
                    last_error = event
                        .metadata
                        .original_event
                        .as_ref()
                        .and_then(|v| v.get("result"))
                        .and_then(Value::as_str)
                        .map(str::to_string);
                }
            }

            if !event.metadata.hidden_from_ui {
                self.broadcaster.send(project_id, &event).await;
            }

            if let Err(e) = self.store.append_event(event).await {
                tracing::warn!(error = %e, project_id, "failed to persist event");
            }
        }

        if was_cancelled {
            // The adapter owns its own copy of `cancellation` and is
            // responsible for terminating its subprocess/request itself
            // (spec.md §5); the Manager's job here is only to stop waiting
            // on the stream and report the outcome.
            return TurnOutcome {
                success: false,
                provider,
                has_changes,
                messages_count,
                error: Some("cancelled".to_string()),
            };
        }

        let success = match provider {
            Provider::Cursor => cursor_success.unwrap_or(!has_error),
            _ => !has_error,
        };

        TurnOutcome {
            success,
            provider,
            has_changes,
            messages_count,
            error: if success { None } else { last_error.or_else(|| Some("turn failed".to_string())) },
        }
    }
}

/// Applies the Cursor-specific success rule (spec.md §4.5) to the raw
/// `result` event carried in `metadata.original_event`.
fn cursor_result_is_success(original_event: &Value) -> bool {
    let subtype = original_event.get("subtype").and_then(Value::as_str);
    let is_error = original_event.get("is_error").and_then(Value::as_bool).unwrap_or(false);

    if subtype == Some("success") {
        true
    } else {
        !(is_error || subtype == Some("error"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn subtype_success_wins_even_if_is_error_absent() {
        assert!(cursor_result_is_success(&json!({"subtype": "success"})));
    }

    #[test]
    fn subtype_error_fails() {
        assert!(!cursor_result_is_success(&json!({"subtype": "error"})));
    }

    #[test]
    fn is_error_true_fails_without_subtype() {
        assert!(!cursor_result_is_success(&json!({"is_error": true})));
    }

    #[test]
    fn absent_fields_assume_success() {
        assert!(cursor_result_is_success(&json!({})));
    }
}
