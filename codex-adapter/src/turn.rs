//! One Codex turn over the `proto` wire protocol, grounded on
//! `CodexCLI.execute_with_streaming` in the original Python adapter
//! (spec.md §4.6.3).

use crate::discovery::discover_codex;
use crate::error::CodexError;
use crate::markers::{ensure_agents_md, resolve_repo_cwd};
use crate::process::CodexProcess;
use crate::rollout::find_latest_rollout;
use crate::types::CodexConfig;
use provider_model::event::{Event, Metadata, Provider, Role};
use provider_model::{render_tool_summary, EventKind, TurnOptions};
use serde_json::{json, Value};
use session_store::Store;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::timeout;

/// Lines read while waiting for `session_configured` before giving up.
const MAX_INIT_LINES: usize = 100;

/// Drives one Codex turn, sending normalized events into `tx`.
pub async fn run_turn(store: Arc<dyn Store>, options: TurnOptions, config: CodexConfig, tx: mpsc::Sender<Event>) {
    let binary = match discover_codex(None) {
        Ok(path) => path,
        Err(e) => {
            send_error(&tx, &options, "cli_not_found", e.to_string()).await;
            return;
        }
    };

    let project_path = PathBuf::from(&options.project_path);
    let repo_cwd = resolve_repo_cwd(&project_path);
    ensure_agents_md(&repo_cwd, config.system_prompt.as_deref()).await;

    let resume_path = resolve_resume_path(&store, &options.project_id, &config).await;

    let mut process = match CodexProcess::spawn(&binary, &repo_cwd, resume_path.as_deref()) {
        Ok(p) => p,
        Err(e) => {
            send_error(&tx, &options, "cli_not_found", e.to_string()).await;
            return;
        }
    };

    let session_id = tokio::select! {
        biased;
        () = options.cancellation.cancelled() => {
            send_error(&tx, &options, "cancelled", "Codex turn cancelled during handshake".to_string()).await;
            process.shutdown().await;
            return;
        }
        session_id = await_session_configured(&mut process, &options, &tx) => {
            let Some(session_id) = session_id else { return };
            session_id
        }
    };

    if let Err(e) = send_override_turn_context(&mut process).await {
        tracing::warn!(error = %e, "failed to set Codex approval policy");
    }

    let request_id = format!("msg_{}", &uuid::Uuid::new_v4().simple().to_string()[..8]);
    let items = match build_items(&store, &options, &repo_cwd).await {
        Ok(items) => items,
        Err(e) => {
            send_error(&tx, &options, "execution_failed", e.to_string()).await;
            process.shutdown().await;
            return;
        }
    };

    let user_input = json!({"id": request_id, "op": {"type": "user_input", "items": items}});
    if let Err(e) = process.write_line(&user_input).await {
        send_error(&tx, &options, "protocol_error", e.to_string()).await;
        process.shutdown().await;
        return;
    }

    tokio::select! {
        biased;
        () = options.cancellation.cancelled() => {
            send_error(&tx, &options, "cancelled", "Codex turn cancelled".to_string()).await;
            process.shutdown().await;
            return;
        }
        outcome = timeout(config.timeout, stream_events(&mut process, &request_id, &session_id, &options, &tx)) => {
            match outcome {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    send_error(&tx, &options, "execution_failed", e.to_string()).await;
                }
                Err(_) => {
                    send_error(&tx, &options, "execution_failed", "Codex turn timed out".to_string()).await;
                }
            }
        }
    }

    if let Some(latest) = find_latest_rollout() {
        let path_str = latest.to_string_lossy().into_owned();
        if let Err(e) = store.set_resume_hint(&options.project_id, Provider::Codex, path_str).await {
            tracing::warn!(error = %e, "failed to persist Codex rollout path");
        }
    }

    process.shutdown().await;

    let event = Event::new(
        options.project_id.clone(),
        session_id,
        Provider::Codex,
        Role::System,
        EventKind::Result,
        "Codex turn completed",
        Metadata::hidden(),
    );
    let _ = tx.send(event).await;
}

async fn resolve_resume_path(store: &Arc<dyn Store>, project_id: &str, config: &CodexConfig) -> Option<PathBuf> {
    if !config.resolved_enable_resume() {
        tracing::debug!("Codex resume disabled (fresh session)");
        return None;
    }

    if let Ok(Some(hint)) = store.get_resume_hint(project_id, Provider::Codex).await {
        let path = PathBuf::from(&hint);
        if path.exists() {
            tracing::info!(path = %hint, "resuming Codex from stored rollout");
            return Some(path);
        }
    }

    let latest = find_latest_rollout()?;
    tracing::info!(path = %latest.display(), "resuming Codex from latest rollout");
    let _ = store
        .set_resume_hint(project_id, Provider::Codex, latest.to_string_lossy().into_owned())
        .await;
    Some(latest)
}

async fn await_session_configured(
    process: &mut CodexProcess,
    options: &TurnOptions,
    tx: &mpsc::Sender<Event>,
) -> Option<String> {
    for _ in 0..MAX_INIT_LINES {
        let event = match process.next_event().await {
            Ok(Some(e)) => e,
            Ok(None) => break,
            Err(e) => {
                send_error(tx, options, "protocol_error", e.to_string()).await;
                return None;
            }
        };

        let msg = event.get("msg");
        if msg.and_then(|m| m.get("type")).and_then(Value::as_str) == Some("session_configured") {
            let Some(msg) = msg else { continue };
            let session_id = msg.get("session_id").and_then(Value::as_str).unwrap_or_default().to_string();
            let model = msg.get("model").and_then(Value::as_str).unwrap_or("codex");

            let init = Event::new(
                options.project_id.clone(),
                session_id.clone(),
                Provider::Codex,
                Role::System,
                EventKind::System,
                format!("Codex initialized (Model: {model})"),
                Metadata::hidden(),
            );
            let _ = tx.send(init).await;
            return Some(session_id);
        }
    }

    send_error(tx, options, "session_expired", "Codex session did not configure".to_string()).await;
    None
}

async fn send_override_turn_context(process: &mut CodexProcess) -> Result<(), CodexError> {
    let ctl_id = format!("ctl_{}", &uuid::Uuid::new_v4().simple().to_string()[..8]);
    let payload = json!({
        "id": ctl_id,
        "op": {
            "type": "override_turn_context",
            "approval_policy": "never",
            "sandbox_policy": {"mode": "danger-full-access"},
        },
    });
    process.write_line(&payload).await
}

async fn build_items(store: &Arc<dyn Store>, options: &TurnOptions, repo_cwd: &std::path::Path) -> std::io::Result<Vec<Value>> {
    let mut instruction = options.instruction.clone();

    if options.is_initial_prompt {
        let files = store
            .list_repo_files(&repo_cwd.to_string_lossy())
            .await
            .unwrap_or_default();
        instruction.push_str(&project_context_block(&files));
    }

    if !options.images.is_empty() {
        let refs: Vec<String> = (1..=options.images.len()).map(|i| format!("[Image #{i}]")).collect();
        instruction.push_str(&format!(
            "\n\nI've attached {} image(s) for you to analyze: {}",
            options.images.len(),
            refs.join(", ")
        ));
    }

    let mut items = vec![json!({"type": "text", "text": instruction})];
    for image in &options.images {
        match provider_model::image::resolve_inline(image) {
            Some(provider_model::ResolvedImage::Path(path)) => {
                items.push(json!({"type": "local_image", "path": path.to_string_lossy()}));
            }
            Some(provider_model::ResolvedImage::Inline { .. }) => {
                if let Some(path) = provider_model::image::write_temp_file(image).await? {
                    items.push(json!({"type": "local_image", "path": path.to_string_lossy()}));
                }
            }
            None => {}
        }
    }

    Ok(items)
}

fn project_context_block(files: &[String]) -> String {
    if files.is_empty() {
        "\n\n<current_project_context>\nThis is an empty project directory. Create files \
directly in the current working directory. Do not create subdirectories unless specifically \
requested by the user.\n</current_project_context>"
            .to_string()
    } else {
        let mut sorted = files.to_vec();
        sorted.sort();
        format!(
            "\n\n<current_project_context>\nCurrent files in project directory: {}\n\
Work directly in the current directory. Do not create subdirectories unless specifically requested.\n\
</current_project_context>",
            sorted.join(", ")
        )
    }
}

async fn stream_events(
    process: &mut CodexProcess,
    request_id: &str,
    session_id: &str,
    options: &TurnOptions,
    tx: &mpsc::Sender<Event>,
) -> Result<(), CodexError> {
    let mut agent_message_buffer = String::new();

    loop {
        let Some(event) = process.next_event().await? else {
            return Err(CodexError::ConnectionClosed);
        };

        let event_id = event.get("id").and_then(Value::as_str).unwrap_or_default();
        let msg_type = event.get("msg").and_then(|m| m.get("type")).and_then(Value::as_str).unwrap_or_default();

        let is_system_event = matches!(msg_type, "session_configured" | "mcp_list_tools_response");
        if event_id != request_id && !is_system_event {
            continue;
        }

        let msg = event.get("msg");

        match msg_type {
            "agent_message_delta" => {
                if let Some(delta) = msg.and_then(|m| m.get("delta")).and_then(Value::as_str) {
                    agent_message_buffer.push_str(delta);
                }
            }
            "agent_message" => {
                if agent_message_buffer.is_empty() {
                    if let Some(final_msg) = msg.and_then(|m| m.get("message")).and_then(Value::as_str) {
                        agent_message_buffer.push_str(final_msg);
                    }
                }
                if !agent_message_buffer.is_empty() {
                    send_chat(tx, options, session_id, std::mem::take(&mut agent_message_buffer)).await;
                }
            }
            "exec_command_begin" => {
                let command = msg
                    .and_then(|m| m.get("command"))
                    .and_then(Value::as_array)
                    .map(|parts| {
                        parts
                            .iter()
                            .filter_map(Value::as_str)
                            .collect::<Vec<_>>()
                            .join(" ")
                    })
                    .unwrap_or_default();
                send_tool_use(tx, options, session_id, "exec_command", json!({"command": command}), "Bash").await;
            }
            "patch_apply_begin" => {
                let changes = msg.and_then(|m| m.get("changes")).cloned().unwrap_or_else(|| json!({}));
                send_tool_use(tx, options, session_id, "apply_patch", json!({"changes": changes}), "Edit").await;
            }
            "web_search_begin" => {
                let query = msg.and_then(|m| m.get("query")).and_then(Value::as_str).unwrap_or_default();
                send_tool_use(tx, options, session_id, "web_search", json!({"query": query}), "WebSearch").await;
            }
            "mcp_tool_call_begin" => {
                let invocation = msg.and_then(|m| m.get("invocation"));
                let server = invocation.and_then(|i| i.get("server")).cloned().unwrap_or(Value::Null);
                let tool = invocation.and_then(|i| i.get("tool")).cloned().unwrap_or(Value::Null);
                send_tool_use(tx, options, session_id, "mcp_tool_call", json!({"server": server, "tool": tool}), "MCPTool").await;
            }
            "exec_command_output_delta" => {}
            "exec_command_end" | "patch_apply_end" | "mcp_tool_call_end" => {
                tracing::debug!(msg_type, "Codex tool completed");
            }
            "task_complete" => {
                if !agent_message_buffer.is_empty() {
                    send_chat(tx, options, session_id, std::mem::take(&mut agent_message_buffer)).await;
                }
                return Ok(());
            }
            "error" => {
                let message = msg.and_then(|m| m.get("message")).and_then(Value::as_str).unwrap_or("unknown error");
                send_error(tx, options, "execution_failed", message.to_string()).await;
            }
            _ => {}
        }
    }
}

async fn send_chat(tx: &mpsc::Sender<Event>, options: &TurnOptions, session_id: &str, content: String) {
    let event = Event::new(
        options.project_id.clone(),
        session_id.to_string(),
        Provider::Codex,
        Role::Assistant,
        EventKind::Chat,
        content,
        Metadata {
            cli_type: Some("codex".to_string()),
            ..Metadata::default()
        },
    );
    let _ = tx.send(event).await;
}

async fn send_tool_use(
    tx: &mpsc::Sender<Event>,
    options: &TurnOptions,
    session_id: &str,
    raw_name: &str,
    input: Value,
    canonical_tool: &str,
) {
    let summary = render_tool_summary(raw_name, &input);
    let event = Event::new(
        options.project_id.clone(),
        session_id.to_string(),
        Provider::Codex,
        Role::Assistant,
        EventKind::ToolUse,
        summary,
        Metadata {
            tool_name: Some(canonical_tool.to_string()),
            tool_input: Some(input),
            cli_type: Some("codex".to_string()),
            ..Metadata::default()
        },
    );
    let _ = tx.send(event).await;
}

async fn send_error(tx: &mpsc::Sender<Event>, options: &TurnOptions, reason: &str, message: String) {
    let event = Event::new(
        options.project_id.clone(),
        String::new(),
        Provider::Codex,
        Role::Assistant,
        EventKind::Error,
        message,
        Metadata {
            reason: Some(reason.to_string()),
            cli_type: Some("codex".to_string()),
            ..Metadata::default()
        },
    );
    let _ = tx.send(event).await;
}

#[cfg(test)]
mod tests {
    use super::project_context_block;

    #[test]
    fn empty_project_gets_empty_directory_note() {
        let block = project_context_block(&[]);
        assert!(block.contains("empty project directory"));
    }

    #[test]
    fn populated_project_lists_sorted_files() {
        let block = project_context_block(&["b.ts".to_string(), "a.ts".to_string()]);
        assert!(block.contains("a.ts, b.ts"));
    }
}
