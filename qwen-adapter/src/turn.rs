//! Per-turn ACP session management and `session/update` → [`Event`]
//! translation, grounded on `QwenCLI.execute_with_streaming` /
//! `_update_to_messages` in the original Python adapter.

use crate::client::shared_client;
use crate::error::QwenError;
use crate::markers::{ensure_qwen_md, resolve_repo_cwd};
use crate::tool_names::{extract_tool_input, is_opaque_tool_name, parse_tool_name};
use acp_client::AcpClient;
use provider_model::event::{Event, Metadata, Provider, Role};
use provider_model::{render_tool_summary, EventKind, TurnOptions};
use regex::Regex;
use serde_json::{json, Value};
use session_store::Store;
use std::sync::{Arc, OnceLock};
use tokio::sync::mpsc;

const MAX_SESSION_RETRIES: u32 = 1;

fn call_id_line_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?m)^call[_-][A-Za-z0-9]+.*$\n?").expect("valid regex"))
}

fn blank_run_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\n{3,}").expect("valid regex"))
}

/// Strips Qwen's internal `call_XXXXXXXX executing...` lines and collapses
/// runs of 3+ newlines down to two, matching `_compose_content`.
fn compose_content(thought_buffer: &[String], text_buffer: &[String]) -> String {
    let mut combined = String::new();
    if !thought_buffer.is_empty() {
        combined.push_str(&thought_buffer.concat());
        if !text_buffer.is_empty() {
            combined.push_str("\n\n");
        }
    }
    combined.push_str(&text_buffer.concat());

    let combined = call_id_line_re().replace_all(&combined, "");
    let combined = blank_run_re().replace_all(&combined, "\n\n");
    combined.trim().to_string()
}

/// Drives one Qwen turn, sending normalized events into `tx` as they are
/// produced. Returns once the terminal event has been sent.
pub async fn run_turn(
    store: Arc<dyn Store>,
    options: TurnOptions,
    system_prompt: Option<String>,
    auth_method: String,
    tx: mpsc::Sender<Event>,
) {
    let client = match shared_client(&auth_method).await {
        Ok(c) => c,
        Err(e) => {
            send_error(&tx, &options, "cli_not_found", e.to_string()).await;
            return;
        }
    };

    let project_path = std::path::PathBuf::from(&options.project_path);
    let repo_cwd = resolve_repo_cwd(&project_path);
    ensure_qwen_md(&repo_cwd, system_prompt.as_deref()).await;

    let mut session_id = match store.get_session(&options.project_id, Provider::Qwen).await {
        Ok(existing) => existing.map(|h| h.session_id),
        Err(e) => {
            send_error(&tx, &options, "provider_error", e.to_string()).await;
            return;
        }
    };

    if session_id.is_none() {
        match new_session(&client, &repo_cwd, &auth_method).await {
            Ok(sid) => {
                if let Err(e) = store
                    .set_session(
                        &options.project_id,
                        Provider::Qwen,
                        provider_model::event::SessionHandle {
                            session_id: sid.clone(),
                            resume_hint: None,
                        },
                    )
                    .await
                {
                    tracing::warn!(error = %e, "failed to persist new Qwen session id");
                }
                session_id = Some(sid);
            }
            Err(e) => {
                send_error(&tx, &options, "session_expired", e.to_string()).await;
                return;
            }
        }
    }
    let Some(mut session_id) = session_id else {
        return;
    };

    if !options.images.is_empty() {
        tracing::warn!(count = options.images.len(), "Qwen adapter ignores image attachments");
    }

    let mut notif_rx = client.on_notification("session/update").await;
    let parts = vec![json!({"type": "text", "text": options.instruction})];

    let mut thought_buffer: Vec<String> = Vec::new();
    let mut text_buffer: Vec<String> = Vec::new();
    let mut retries = 0;

    let mut prompt_task = spawn_prompt(&client, &session_id, parts.clone());

    loop {
        tokio::select! {
            biased;
            () = options.cancellation.cancelled() => {
                // The ACP client is shared across turns, so cancellation aborts
                // only this turn's in-flight `session/prompt` wait rather than
                // killing the subprocess (spec.md §5).
                prompt_task.abort();
                send_error(&tx, &options, "cancelled", "Qwen turn cancelled".to_string()).await;
                return;
            }
            update = notif_rx.recv() => {
                let Some(update) = update else { continue };
                if update.get("sessionId").and_then(Value::as_str) != Some(session_id.as_str()) {
                    continue;
                }
                let Some(payload) = update.get("update").cloned() else { continue };
                handle_update(&payload, &options, &tx, &mut thought_buffer, &mut text_buffer).await;
            }
            result = &mut prompt_task => {
                // Drain anything still queued before deciding the outcome.
                while let Ok(update) = notif_rx.try_recv() {
                    if update.get("sessionId").and_then(Value::as_str) == Some(session_id.as_str()) {
                        if let Some(payload) = update.get("update").cloned() {
                            handle_update(&payload, &options, &tx, &mut thought_buffer, &mut text_buffer).await;
                        }
                    }
                }

                let outcome = result.unwrap_or_else(|_| Err(QwenError::PromptFailed("prompt task panicked".to_string())));
                if let Err(e) = outcome {
                    let message = e.to_string();
                    if retries < MAX_SESSION_RETRIES && message.to_lowercase().contains("session not found") {
                        tracing::warn!("Qwen session expired; creating a new session and retrying");
                        retries += 1;
                        match new_session(&client, &repo_cwd, &auth_method).await {
                            Ok(sid) => {
                                let _ = store.set_session(&options.project_id, Provider::Qwen, provider_model::event::SessionHandle { session_id: sid.clone(), resume_hint: None }).await;
                                session_id = sid;
                                prompt_task = spawn_prompt(&client, &session_id, parts.clone());
                                continue;
                            }
                            Err(e2) => {
                                send_error(&tx, &options, "session_expired", format!("Qwen session recovery failed: {e2}")).await;
                            }
                        }
                    } else {
                        send_error(&tx, &options, "protocol_error", message).await;
                    }
                }

                if !thought_buffer.is_empty() || !text_buffer.is_empty() {
                    let content = compose_content(&thought_buffer, &text_buffer);
                    send_chat(&tx, &options, &session_id, content).await;
                }
                break;
            }
        }
    }

    let event = Event::new(
        options.project_id.clone(),
        session_id,
        Provider::Qwen,
        Role::System,
        EventKind::Result,
        "Qwen turn completed",
        Metadata::hidden(),
    );
    let _ = tx.send(event).await;
}

fn spawn_prompt(
    client: &AcpClient,
    session_id: &str,
    parts: Vec<Value>,
) -> tokio::task::JoinHandle<Result<(), QwenError>> {
    let client = client.clone();
    let session_id = session_id.to_string();
    tokio::spawn(async move {
        client
            .request(
                "session/prompt",
                json!({"sessionId": session_id, "prompt": parts}),
            )
            .await
            .map(|_| ())
            .map_err(|e| QwenError::PromptFailed(e.to_string()))
    })
}

async fn new_session(
    client: &AcpClient,
    repo_cwd: &std::path::Path,
    auth_method: &str,
) -> Result<String, QwenError> {
    let cwd = repo_cwd.to_string_lossy().to_string();
    let params = json!({"cwd": cwd, "mcpServers": []});

    match client.request("session/new", params.clone()).await {
        Ok(result) => extract_session_id(&result),
        Err(e) => {
            tracing::warn!(error = %e, auth_method, "Qwen session/new failed; authenticating");
            client
                .request("authenticate", json!({"methodId": auth_method}))
                .await
                .map_err(|e2| QwenError::SessionFailed(e2.to_string()))?;
            let result = client
                .request("session/new", params)
                .await
                .map_err(|e2| QwenError::SessionFailed(e2.to_string()))?;
            extract_session_id(&result)
        }
    }
}

fn extract_session_id(result: &Value) -> Result<String, QwenError> {
    result
        .get("sessionId")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| QwenError::SessionFailed("response carried no sessionId".to_string()))
}

async fn handle_update(
    update: &Value,
    options: &TurnOptions,
    tx: &mpsc::Sender<Event>,
    thought_buffer: &mut Vec<String>,
    text_buffer: &mut Vec<String>,
) {
    let kind = update
        .get("sessionUpdate")
        .or_else(|| update.get("type"))
        .and_then(Value::as_str)
        .unwrap_or_default();

    match kind {
        "agent_message_chunk" | "agent_thought_chunk" => {
            let text = update
                .pointer("/content/text")
                .or_else(|| update.get("text"))
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            if kind == "agent_thought_chunk" {
                thought_buffer.push(text);
            } else {
                text_buffer.push(text);
            }
        }
        "tool_call" => {
            let tool_name = parse_tool_name(update);
            let tool_input = extract_tool_input(update);
            let summary = render_tool_summary(&tool_name, &tool_input);
            if is_opaque_tool_name(&tool_name) || summary.ends_with("`executing...`") {
                return;
            }

            if !thought_buffer.is_empty() || !text_buffer.is_empty() {
                let content = compose_content(thought_buffer, text_buffer);
                send_chat(tx, options, &options.project_id, content).await;
                thought_buffer.clear();
                text_buffer.clear();
            }

            let event = Event::new(
                options.project_id.clone(),
                String::new(),
                Provider::Qwen,
                Role::Assistant,
                EventKind::ToolUse,
                summary,
                Metadata {
                    tool_name: Some(tool_name),
                    tool_input: Some(tool_input),
                    event_type: Some("tool_call".to_string()),
                    cli_type: Some("qwen".to_string()),
                    ..Metadata::default()
                },
            );
            let _ = tx.send(event).await;
        }
        "tool_call_update" => {}
        "plan" => {
            let entries = update.get("entries").and_then(Value::as_array);
            let lines: Vec<String> = entries
                .into_iter()
                .flatten()
                .take(6)
                .filter_map(|e| e.get("title").and_then(Value::as_str))
                .map(|t| format!("• {t}"))
                .collect();
            let content = if lines.is_empty() {
                "Planning…".to_string()
            } else {
                lines.join("\n")
            };

            if !thought_buffer.is_empty() || !text_buffer.is_empty() {
                let buffered = compose_content(thought_buffer, text_buffer);
                send_chat(tx, options, &options.project_id, buffered).await;
                thought_buffer.clear();
                text_buffer.clear();
            }
            send_chat_tagged(tx, options, content, "plan").await;
        }
        _ => {}
    }
}

async fn send_chat(tx: &mpsc::Sender<Event>, options: &TurnOptions, session_id: &str, content: String) {
    let event = Event::new(
        options.project_id.clone(),
        session_id.to_string(),
        Provider::Qwen,
        Role::Assistant,
        EventKind::Chat,
        content,
        Metadata {
            cli_type: Some("qwen".to_string()),
            ..Metadata::default()
        },
    );
    let _ = tx.send(event).await;
}

async fn send_chat_tagged(tx: &mpsc::Sender<Event>, options: &TurnOptions, content: String, event_type: &str) {
    let event = Event::new(
        options.project_id.clone(),
        String::new(),
        Provider::Qwen,
        Role::Assistant,
        EventKind::Chat,
        content,
        Metadata {
            event_type: Some(event_type.to_string()),
            cli_type: Some("qwen".to_string()),
            ..Metadata::default()
        },
    );
    let _ = tx.send(event).await;
}

async fn send_error(tx: &mpsc::Sender<Event>, options: &TurnOptions, reason: &str, message: String) {
    let event = Event::new(
        options.project_id.clone(),
        String::new(),
        Provider::Qwen,
        Role::Assistant,
        EventKind::Error,
        message,
        Metadata {
            reason: Some(reason.to_string()),
            cli_type: Some("qwen".to_string()),
            ..Metadata::default()
        },
    );
    let _ = tx.send(event).await;
}

#[cfg(test)]
mod tests {
    use super::compose_content;

    #[test]
    fn merges_thought_then_text_with_blank_line() {
        let thought = vec!["thinking...".to_string()];
        let text = vec!["done.".to_string()];
        assert_eq!(compose_content(&thought, &text), "thinking...\n\ndone.");
    }

    #[test]
    fn strips_call_id_lines_and_collapses_blank_runs() {
        let text = vec!["hello\ncall_390e8f executing...\n\n\n\nworld".to_string()];
        assert_eq!(compose_content(&[], &text), "hello\n\nworld");
    }

    #[test]
    fn text_only_has_no_leading_separator() {
        let text = vec!["just text".to_string()];
        assert_eq!(compose_content(&[], &text), "just text");
    }
}
