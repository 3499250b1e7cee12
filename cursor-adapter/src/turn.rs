//! One Cursor Agent turn: spawns `cursor-agent`, parses its NDJSON stream,
//! and maps it onto normalized [`Event`]s (spec.md §4.6.2).

use crate::cmd::RunConfig;
use crate::error::CursorError;
use crate::process::CursorProcess;
use provider_model::event::{Event, Metadata, Provider, Role, SessionHandle};
use provider_model::{render_tool_summary, EventKind, TurnOptions};
use serde_json::Value;
use session_store::Store;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Top-level / nested keys consulted for a session id when the event is
/// not itself a `result` (spec.md §4.6.2 extraction order).
const SESSION_ID_KEYS: &[&str] = &[
    "sessionId",
    "chatId",
    "session_id",
    "chat_id",
    "threadId",
    "thread_id",
];

fn resolve_repo_cwd(project_path: &Path) -> PathBuf {
    let repo = project_path.join("repo");
    if repo.is_dir() {
        repo
    } else {
        project_path.to_path_buf()
    }
}

/// Extracts a session id from one parsed NDJSON event, following the
/// priority order: `result.session_id` (authoritative) → top-level
/// `sessionId|chatId|session_id|chat_id|threadId|thread_id` → the same
/// keys nested inside `message`.
fn extract_session_id(event: &Value) -> Option<String> {
    if event.get("type").and_then(Value::as_str) == Some("result") {
        if let Some(sid) = event.get("session_id").and_then(Value::as_str) {
            return Some(sid.to_string());
        }
    }

    for key in SESSION_ID_KEYS {
        if let Some(sid) = event.get(*key).and_then(Value::as_str) {
            return Some(sid.to_string());
        }
    }

    if let Some(message) = event.get("message") {
        for key in SESSION_ID_KEYS {
            if let Some(sid) = message.get(*key).and_then(Value::as_str) {
                return Some(sid.to_string());
            }
        }
    }

    None
}

/// Drives one Cursor Agent turn, sending normalized events into `tx`.
pub async fn run_turn(
    store: Arc<dyn Store>,
    options: TurnOptions,
    binary: PathBuf,
    tx: mpsc::Sender<Event>,
) {
    let repo_cwd = resolve_repo_cwd(Path::new(&options.project_path));

    let stored_session = match store.get_session(&options.project_id, Provider::Cursor).await {
        Ok(existing) => existing.map(|h| h.session_id),
        Err(e) => {
            send_error(&tx, &options, "provider_error", e.to_string()).await;
            return;
        }
    };

    let config = RunConfig {
        resume: stored_session.clone(),
        api_key: std::env::var("CURSOR_API_KEY").ok(),
        model: options.model.clone().or_else(|| std::env::var("CURSOR_MODEL").ok()),
    };

    let mut process = match CursorProcess::spawn(&binary, &repo_cwd, &options.instruction, &config) {
        Ok(p) => p,
        Err(e) => {
            send_error(&tx, &options, "cli_not_found", e.to_string()).await;
            return;
        }
    };

    let mut session_id = stored_session.unwrap_or_default();
    let mut buffer = String::new();

    loop {
        let line = tokio::select! {
            biased;
            () = options.cancellation.cancelled() => {
                send_error(&tx, &options, "cancelled", "Cursor turn cancelled".to_string()).await;
                process.terminate().await;
                return;
            }
            line = process.next_line() => match line {
                Ok(Some(line)) => line,
                Ok(None) => break,
                Err(e) => {
                    send_error(&tx, &options, "execution_failed", e.to_string()).await;
                    break;
                }
            },
        };

        let event: Value = match serde_json::from_str(&line) {
            Ok(v) => v,
            Err(e) => {
                send_parse_error(&tx, &options, &session_id, &line, &e.to_string()).await;
                continue;
            }
        };

        if let Some(new_sid) = extract_session_id(&event) {
            if new_sid != session_id {
                session_id = new_sid.clone();
                if let Err(e) = store
                    .set_session(
                        &options.project_id,
                        Provider::Cursor,
                        SessionHandle {
                            session_id: new_sid,
                            resume_hint: None,
                        },
                    )
                    .await
                {
                    tracing::warn!(error = %e, "failed to persist Cursor session id");
                }
            }
        }

        let event_type = event.get("type").and_then(Value::as_str);

        if event_type != Some("assistant") && !buffer.is_empty() {
            flush_buffer(&tx, &options, &session_id, &mut buffer).await;
        }

        match event_type {
            Some("system") => {
                let model = event.get("model").and_then(Value::as_str).map(str::to_string);
                let init = Event::new(
                    options.project_id.clone(),
                    session_id.clone(),
                    Provider::Cursor,
                    Role::System,
                    EventKind::System,
                    "Cursor session initialized",
                    Metadata {
                        event_type: Some("system".to_string()),
                        cli_type: Some("cursor".to_string()),
                        model,
                        original_event: Some(event.clone()),
                        ..Metadata::hidden()
                    },
                );
                let _ = tx.send(init).await;
            }
            Some("user") => {
                // Cursor echoes the prompt back; suppress to avoid duplicates.
            }
            Some("assistant") => {
                if let Some(parts) = event.pointer("/message/content").and_then(Value::as_array) {
                    for part in parts {
                        if part.get("type").and_then(Value::as_str) == Some("text") {
                            if let Some(text) = part.get("text").and_then(Value::as_str) {
                                buffer.push_str(text);
                            }
                        }
                    }
                }
            }
            Some("tool_call") => {
                handle_tool_call(&tx, &options, &session_id, &event).await;
            }
            Some("result") => {
                send_result(&tx, &options, &session_id, &event).await;
                process.terminate().await;
                return;
            }
            _ => {}
        }
    }

    if !buffer.is_empty() {
        flush_buffer(&tx, &options, &session_id, &mut buffer).await;
    }

    process.terminate().await;
}

async fn handle_tool_call(
    tx: &mpsc::Sender<Event>,
    options: &TurnOptions,
    session_id: &str,
    event: &Value,
) {
    let Some(tool_call) = event.get("tool_call").and_then(Value::as_object) else {
        return;
    };
    let Some((tool_name_raw, inner)) = tool_call.iter().next() else {
        return;
    };
    let tool_name = tool_name_raw.replace("ToolCall", "");
    let subtype = event.get("subtype").and_then(Value::as_str);

    match subtype {
        Some("started") => {
            let tool_input = inner.get("args").cloned().unwrap_or(Value::Null);
            let summary = render_tool_summary(&tool_name, &tool_input);
            let chat = Event::new(
                options.project_id.clone(),
                session_id.to_string(),
                Provider::Cursor,
                Role::Assistant,
                EventKind::Chat,
                summary,
                Metadata {
                    event_type: Some("tool_call_started".to_string()),
                    tool_name: Some(tool_name),
                    tool_input: Some(tool_input),
                    cli_type: Some("cursor".to_string()),
                    ..Metadata::default()
                },
            );
            let _ = tx.send(chat).await;
        }
        Some("completed") => {
            let result = inner.get("result");
            let content = result
                .and_then(|r| r.get("success"))
                .map(ToString::to_string)
                .or_else(|| result.and_then(|r| r.get("error")).map(ToString::to_string))
                .unwrap_or_default();
            let tool_result = Event::new(
                options.project_id.clone(),
                session_id.to_string(),
                Provider::Cursor,
                Role::System,
                EventKind::ToolResult,
                content,
                Metadata {
                    tool_name: Some(tool_name),
                    original_event: Some(event.clone()),
                    ..Metadata::hidden()
                },
            );
            let _ = tx.send(tool_result).await;
        }
        _ => {}
    }
}

async fn flush_buffer(
    tx: &mpsc::Sender<Event>,
    options: &TurnOptions,
    session_id: &str,
    buffer: &mut String,
) {
    let content = std::mem::take(buffer);
    let chat = Event::new(
        options.project_id.clone(),
        session_id.to_string(),
        Provider::Cursor,
        Role::Assistant,
        EventKind::Chat,
        content,
        Metadata {
            event_type: Some("assistant_aggregated".to_string()),
            cli_type: Some("cursor".to_string()),
            ..Metadata::default()
        },
    );
    let _ = tx.send(chat).await;
}

async fn send_result(tx: &mpsc::Sender<Event>, options: &TurnOptions, session_id: &str, event: &Value) {
    let duration_ms = event.get("duration_ms").and_then(Value::as_u64);
    let result = Event::new(
        options.project_id.clone(),
        session_id.to_string(),
        Provider::Cursor,
        Role::System,
        EventKind::Result,
        "Cursor turn completed",
        Metadata {
            event_type: Some("result".to_string()),
            duration_ms,
            original_event: Some(event.clone()),
            ..Metadata::hidden()
        },
    );
    let _ = tx.send(result).await;
}

async fn send_parse_error(
    tx: &mpsc::Sender<Event>,
    options: &TurnOptions,
    session_id: &str,
    raw_line: &str,
    parse_error: &str,
) {
    let chat = Event::new(
        options.project_id.clone(),
        session_id.to_string(),
        Provider::Cursor,
        Role::Assistant,
        EventKind::Chat,
        raw_line.to_string(),
        Metadata {
            cli_type: Some("cursor".to_string()),
            parse_error: Some(parse_error.to_string()),
            ..Metadata::default()
        },
    );
    let _ = tx.send(chat).await;
}

async fn send_error(tx: &mpsc::Sender<Event>, options: &TurnOptions, reason: &str, message: String) {
    let event = Event::new(
        options.project_id.clone(),
        String::new(),
        Provider::Cursor,
        Role::Assistant,
        EventKind::Error,
        message,
        Metadata {
            reason: Some(reason.to_string()),
            cli_type: Some("cursor".to_string()),
            ..Metadata::default()
        },
    );
    let _ = tx.send(event).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn result_session_id_takes_priority() {
        let event = json!({"type": "result", "session_id": "S1", "sessionId": "other"});
        assert_eq!(extract_session_id(&event), Some("S1".to_string()));
    }

    #[test]
    fn falls_back_to_top_level_chat_id() {
        let event = json!({"type": "system", "chatId": "C1"});
        assert_eq!(extract_session_id(&event), Some("C1".to_string()));
    }

    #[test]
    fn falls_back_to_nested_message_fields() {
        let event = json!({"type": "assistant", "message": {"threadId": "T1"}});
        assert_eq!(extract_session_id(&event), Some("T1".to_string()));
    }

    #[test]
    fn returns_none_when_absent() {
        let event = json!({"type": "assistant", "message": {"content": []}});
        assert_eq!(extract_session_id(&event), None);
    }
}
