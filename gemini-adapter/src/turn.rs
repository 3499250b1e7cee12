//! Per-turn ACP session management and `session/update` → [`Event`]
//! translation, grounded on `GeminiCLI.execute_with_streaming` /
//! `_update_to_messages` in the original Python adapter.

use crate::client::shared_client;
use crate::error::GeminiError;
use crate::markers::{ensure_gemini_md, resolve_repo_cwd};
use crate::tool_names::{extract_tool_input, parse_tool_name, should_render};
use acp_client::AcpClient;
use provider_model::event::{Event, Metadata, Provider, Role};
use provider_model::{render_tool_summary, EventKind, TurnOptions};
use serde_json::{json, Value};
use session_store::Store;
use std::sync::Arc;
use tokio::sync::mpsc;

const MAX_SESSION_RETRIES: u32 = 1;

/// Wraps buffered thought content in `<thinking>` tags, matching
/// `_compose_content`: thinking first (if non-empty after trimming), then
/// the assistant's text.
fn compose_content(thought_buffer: &[String], text_buffer: &[String]) -> String {
    let mut out = String::new();
    let thinking = thought_buffer.concat();
    let thinking = thinking.trim();
    if !thinking.is_empty() {
        out.push_str(&format!("<thinking>\n{thinking}\n</thinking>\n"));
    }
    out.push_str(&text_buffer.concat());
    out
}

/// Drives one Gemini turn, sending normalized events into `tx`.
pub async fn run_turn(
    store: Arc<dyn Store>,
    options: TurnOptions,
    system_prompt: Option<String>,
    auth_method: String,
    tx: mpsc::Sender<Event>,
) {
    let client = match shared_client().await {
        Ok(c) => c,
        Err(e) => {
            send_error(&tx, &options, "cli_not_found", e.to_string()).await;
            return;
        }
    };

    let project_path = std::path::PathBuf::from(&options.project_path);
    let repo_cwd = resolve_repo_cwd(&project_path);
    ensure_gemini_md(&repo_cwd, system_prompt.as_deref()).await;

    let mut session_id = match store.get_session(&options.project_id, Provider::Gemini).await {
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
                        Provider::Gemini,
                        provider_model::event::SessionHandle {
                            session_id: sid.clone(),
                            resume_hint: None,
                        },
                    )
                    .await
                {
                    tracing::warn!(error = %e, "failed to persist new Gemini session id");
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

    let mut notif_rx = client.on_notification("session/update").await;
    let mut parts = vec![json!({"type": "text", "text": options.instruction})];
    for image in &options.images {
        match provider_model::image::resolve_inline(image) {
            Some(provider_model::ResolvedImage::Inline { mime_type, base64_data }) => {
                parts.push(json!({"type": "image", "mimeType": mime_type, "data": base64_data}));
            }
            Some(provider_model::ResolvedImage::Path(_)) => {
                tracing::warn!("Gemini ACP adapter does not forward local image paths");
            }
            None => {}
        }
    }

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
                send_error(&tx, &options, "cancelled", "Gemini turn cancelled".to_string()).await;
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
                while let Ok(update) = notif_rx.try_recv() {
                    if update.get("sessionId").and_then(Value::as_str) == Some(session_id.as_str()) {
                        if let Some(payload) = update.get("update").cloned() {
                            handle_update(&payload, &options, &tx, &mut thought_buffer, &mut text_buffer).await;
                        }
                    }
                }

                let outcome = result.unwrap_or_else(|_| Err(GeminiError::PromptFailed("prompt task panicked".to_string())));
                if let Err(e) = outcome {
                    let message = e.to_string();
                    if retries < MAX_SESSION_RETRIES && message.to_lowercase().contains("session not found") {
                        tracing::warn!("Gemini session expired; creating a new session and retrying");
                        retries += 1;
                        match new_session(&client, &repo_cwd, &auth_method).await {
                            Ok(sid) => {
                                let _ = store.set_session(&options.project_id, Provider::Gemini, provider_model::event::SessionHandle { session_id: sid.clone(), resume_hint: None }).await;
                                session_id = sid;
                                prompt_task = spawn_prompt(&client, &session_id, parts.clone());
                                continue;
                            }
                            Err(e2) => {
                                send_error(&tx, &options, "session_expired", format!("Gemini session recovery failed: {e2}")).await;
                            }
                        }
                    } else {
                        send_error(&tx, &options, "protocol_error", message).await;
                    }
                }

                if !thought_buffer.is_empty() || !text_buffer.is_empty() {
                    let content = compose_content(&thought_buffer, &text_buffer);
                    send_chat(&tx, &options, &session_id, content, None).await;
                }
                break;
            }
        }
    }

    let event = Event::new(
        options.project_id.clone(),
        session_id,
        Provider::Gemini,
        Role::System,
        EventKind::Result,
        "Gemini turn completed",
        Metadata::hidden(),
    );
    let _ = tx.send(event).await;
}

fn spawn_prompt(
    client: &AcpClient,
    session_id: &str,
    parts: Vec<Value>,
) -> tokio::task::JoinHandle<Result<(), GeminiError>> {
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
            .map_err(|e| GeminiError::PromptFailed(e.to_string()))
    })
}

async fn new_session(
    client: &AcpClient,
    repo_cwd: &std::path::Path,
    auth_method: &str,
) -> Result<String, GeminiError> {
    let cwd = repo_cwd.to_string_lossy().to_string();
    let params = json!({"cwd": cwd, "mcpServers": []});

    match client.request("session/new", params.clone()).await {
        Ok(result) => extract_session_id(&result),
        Err(e) => {
            tracing::warn!(error = %e, auth_method, "Gemini session/new failed; authenticating");
            client
                .request("authenticate", json!({"methodId": auth_method}))
                .await
                .map_err(|e2| GeminiError::SessionFailed(e2.to_string()))?;
            let result = client
                .request("session/new", params)
                .await
                .map_err(|e2| GeminiError::SessionFailed(e2.to_string()))?;
            extract_session_id(&result)
        }
    }
}

fn extract_session_id(result: &Value) -> Result<String, GeminiError> {
    result
        .get("sessionId")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| GeminiError::SessionFailed("response carried no sessionId".to_string()))
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
                return;
            }

            // First assistant chunk after a run of thinking: flush the
            // thought immediately as its own tagged chat event (spec.md
            // §8 S4's "thinking flushes before the first message chunk").
            if !thought_buffer.is_empty() && text_buffer.is_empty() {
                let thinking_only = compose_content(thought_buffer, &[]);
                send_chat(tx, options, &options.project_id, thinking_only, Some("thinking")).await;
                thought_buffer.clear();
            }
            text_buffer.push(text);
        }
        "tool_call" | "tool_call_update" => {
            let tool_name = parse_tool_name(update);
            if !should_render(&tool_name, kind) {
                return;
            }
            let tool_input = extract_tool_input(update);
            let summary = render_tool_summary(&tool_name, &tool_input);

            if !thought_buffer.is_empty() || !text_buffer.is_empty() {
                let content = compose_content(thought_buffer, text_buffer);
                send_chat(tx, options, &options.project_id, content, None).await;
                thought_buffer.clear();
                text_buffer.clear();
            }

            let event = Event::new(
                options.project_id.clone(),
                String::new(),
                Provider::Gemini,
                Role::Assistant,
                EventKind::ToolUse,
                summary,
                Metadata {
                    tool_name: Some(tool_name),
                    tool_input: Some(tool_input),
                    event_type: Some(kind.to_string()),
                    cli_type: Some("gemini".to_string()),
                    ..Metadata::default()
                },
            );
            let _ = tx.send(event).await;
        }
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
                send_chat(tx, options, &options.project_id, buffered, None).await;
                thought_buffer.clear();
                text_buffer.clear();
            }
            send_chat(tx, options, &options.project_id, content, Some("plan")).await;
        }
        _ => {}
    }
}

async fn send_chat(
    tx: &mpsc::Sender<Event>,
    options: &TurnOptions,
    session_id: &str,
    content: String,
    event_type: Option<&str>,
) {
    let event = Event::new(
        options.project_id.clone(),
        session_id.to_string(),
        Provider::Gemini,
        Role::Assistant,
        EventKind::Chat,
        content,
        Metadata {
            event_type: event_type.map(str::to_string),
            cli_type: Some("gemini".to_string()),
            ..Metadata::default()
        },
    );
    let _ = tx.send(event).await;
}

async fn send_error(tx: &mpsc::Sender<Event>, options: &TurnOptions, reason: &str, message: String) {
    let event = Event::new(
        options.project_id.clone(),
        String::new(),
        Provider::Gemini,
        Role::Assistant,
        EventKind::Error,
        message,
        Metadata {
            reason: Some(reason.to_string()),
            cli_type: Some("gemini".to_string()),
            ..Metadata::default()
        },
    );
    let _ = tx.send(event).await;
}

#[cfg(test)]
mod tests {
    use super::{compose_content, handle_update};
    use provider_model::event::EventKind;
    use provider_model::TurnOptions;
    use serde_json::json;

    #[test]
    fn wraps_thinking_in_tags_before_text() {
        let thought = vec!["step one".to_string()];
        let text = vec!["final answer".to_string()];
        assert_eq!(
            compose_content(&thought, &text),
            "<thinking>\nstep one\n</thinking>\nfinal answer"
        );
    }

    #[test]
    fn text_only_has_no_thinking_tags() {
        let text = vec!["just text".to_string()];
        assert_eq!(compose_content(&[], &text), "just text");
    }

    /// spec.md §8 S4: a thought chunk followed by a message chunk flushes
    /// the thinking immediately (tagged), leaving the message text
    /// buffered for the trailing flush on prompt resolution.
    #[tokio::test]
    async fn thought_then_message_chunk_flushes_thinking_immediately() {
        let options = TurnOptions {
            project_id: "p1".to_string(),
            ..TurnOptions::default()
        };
        let (tx, mut rx) = tokio::sync::mpsc::channel(8);
        let mut thought_buffer = Vec::new();
        let mut text_buffer = Vec::new();

        handle_update(
            &json!({"sessionUpdate": "agent_thought_chunk", "content": {"text": "think…"}}),
            &options,
            &tx,
            &mut thought_buffer,
            &mut text_buffer,
        )
        .await;
        assert!(rx.try_recv().is_err());

        handle_update(
            &json!({"sessionUpdate": "agent_message_chunk", "content": {"text": "hello"}}),
            &options,
            &tx,
            &mut thought_buffer,
            &mut text_buffer,
        )
        .await;

        let flushed = rx.try_recv().expect("thinking should flush on first message chunk");
        assert_eq!(flushed.kind, EventKind::Chat);
        assert_eq!(flushed.content, "<thinking>\nthink…\n</thinking>\n");
        assert!(thought_buffer.is_empty());

        let trailing = compose_content(&thought_buffer, &text_buffer);
        assert_eq!(trailing, "hello");
    }
}
