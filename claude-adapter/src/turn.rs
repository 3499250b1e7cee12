//! One Claude turn: builds a `RunConfig`, drives `process::run_claude` with a
//! live event channel, and maps its [`StreamEvent`]s onto normalized
//! [`Event`]s (spec.md §4.6.1).

use crate::error::ClaudeError;
use crate::process::run_claude;
use crate::types::{BuiltinToolSet, RunConfig, StreamEvent, SystemPromptMode, ToolPolicy};
use provider_model::event::{Event, Metadata, Provider, Role};
use provider_model::{EventKind, TurnOptions};
use session_store::Store;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc;

const FALLBACK_SYSTEM_PROMPT: &str =
    "You are a helpful coding assistant working in the current project directory.";

const BASE_ALLOWED_TOOLS: &[&str] = &[
    "Read", "Write", "Edit", "MultiEdit", "Bash", "Glob", "Grep", "LS", "WebFetch", "WebSearch",
];

fn resolve_repo_cwd(project_path: &Path) -> PathBuf {
    let repo = project_path.join("repo");
    if repo.is_dir() {
        repo
    } else {
        project_path.to_path_buf()
    }
}

fn build_tool_policy(is_initial_prompt: bool) -> ToolPolicy {
    let mut allowed: Vec<String> = BASE_ALLOWED_TOOLS.iter().map(|s| (*s).to_string()).collect();
    let disallowed = if is_initial_prompt {
        Some(vec!["TodoWrite".to_string()])
    } else {
        allowed.push("TodoWrite".to_string());
        None
    };

    ToolPolicy {
        builtin: BuiltinToolSet::Default,
        allowed: Some(allowed),
        disallowed,
        disable_slash_commands: false,
    }
}

/// Drives one Claude turn, sending normalized events into `tx`.
pub async fn run_turn(
    store: Arc<dyn Store>,
    options: TurnOptions,
    binary: PathBuf,
    system_prompt: Option<String>,
    tx: mpsc::Sender<Event>,
) {
    let repo_cwd = resolve_repo_cwd(&Path::new(&options.project_path));

    let resume = match store.get_session(&options.project_id, Provider::Claude).await {
        Ok(existing) => existing.map(|h| h.session_id),
        Err(e) => {
            send_error(&tx, &options, "provider_error", e.to_string()).await;
            return;
        }
    };

    let prompt = build_prompt(&store, &options, &repo_cwd).await;

    let system_prompt_text = system_prompt.unwrap_or_else(|| FALLBACK_SYSTEM_PROMPT.to_string());
    let config = RunConfig {
        model: options.model.clone(),
        system_prompt: SystemPromptMode::Append(system_prompt_text),
        tools: build_tool_policy(options.is_initial_prompt),
        cwd: Some(repo_cwd),
        resume,
        ..RunConfig::default()
    };

    let (stream_tx, mut stream_rx) = mpsc::channel::<StreamEvent>(64);
    let run = tokio::spawn({
        let binary = binary.clone();
        let prompt = prompt.clone();
        let config = config.clone();
        let cancellation = options.cancellation.clone();
        async move { run_claude(&binary, &prompt, &config, Some(stream_tx), &cancellation).await }
    });

    let mut session_id = String::new();

    while let Some(event) = stream_rx.recv().await {
        match event {
            StreamEvent::System { session_id: sid } => {
                if let Some(sid) = sid {
                    session_id = sid.clone();
                    if let Err(e) = store
                        .set_session(
                            &options.project_id,
                            Provider::Claude,
                            provider_model::event::SessionHandle {
                                session_id: sid,
                                resume_hint: None,
                            },
                        )
                        .await
                    {
                        tracing::warn!(error = %e, "failed to persist Claude session id");
                    }
                }
                let init = Event::new(
                    options.project_id.clone(),
                    session_id.clone(),
                    Provider::Claude,
                    Role::System,
                    EventKind::System,
                    "Claude session initialized",
                    Metadata::hidden(),
                );
                let _ = tx.send(init).await;
            }
            StreamEvent::Text { text } => {
                send_chat(&tx, &options, &session_id, text).await;
            }
            StreamEvent::ToolCall { name, input } => {
                send_tool_use(&tx, &options, &session_id, &name, input).await;
            }
            StreamEvent::ToolResult { .. } => {
                // User-role tool results are suppressed from the UI.
            }
            StreamEvent::Result {
                session_id: sid,
                is_error,
                duration_ms,
                result,
            } => {
                if let Some(sid) = sid {
                    session_id = sid;
                }
                if is_error {
                    send_error(
                        &tx,
                        &options,
                        "execution_failed",
                        result.unwrap_or_else(|| "Claude turn ended in error".to_string()),
                    )
                    .await;
                } else {
                    let event = Event::new(
                        options.project_id.clone(),
                        session_id.clone(),
                        Provider::Claude,
                        Role::System,
                        EventKind::Result,
                        "Claude turn completed",
                        Metadata {
                            duration_ms,
                            ..Metadata::hidden()
                        },
                    );
                    let _ = tx.send(event).await;
                }
            }
            StreamEvent::Error { message } => {
                send_error(&tx, &options, "execution_failed", message).await;
            }
            StreamEvent::Unknown(_) => {}
        }
    }

    match run.await {
        Ok(Ok(_)) => {}
        Ok(Err(ClaudeError::Timeout { elapsed, pid, .. })) => {
            send_error(
                &tx,
                &options,
                "execution_failed",
                format!("Claude process timed out after {elapsed:?} (PID {pid})"),
            )
            .await;
        }
        Ok(Err(ClaudeError::Cancelled { .. })) => {
            send_error(&tx, &options, "cancelled", "Claude turn cancelled".to_string()).await;
        }
        Ok(Err(e)) => {
            send_error(&tx, &options, "execution_failed", e.to_string()).await;
        }
        Err(e) => {
            send_error(&tx, &options, "execution_failed", format!("Claude task panicked: {e}")).await;
        }
    }
}

async fn build_prompt(store: &Arc<dyn Store>, options: &TurnOptions, repo_cwd: &Path) -> String {
    let mut prompt = options.instruction.clone();

    if !options.images.is_empty() {
        let mut paths = Vec::new();
        for image in &options.images {
            match provider_model::image::resolve_inline(image) {
                Some(provider_model::ResolvedImage::Path(path)) => paths.push(path),
                Some(provider_model::ResolvedImage::Inline { .. }) => {
                    if let Ok(Some(path)) = provider_model::image::write_temp_file(image).await {
                        paths.push(path);
                    }
                }
                None => {}
            }
        }
        if !paths.is_empty() {
            let refs: Vec<String> = paths.iter().map(|p| format!("- {}", p.display())).collect();
            prompt.push_str(&format!(
                "\n\nAttached images (read these files to view them):\n{}",
                refs.join("\n")
            ));
        }
    }

    if options.is_initial_prompt {
        let files = store
            .list_repo_files(&repo_cwd.to_string_lossy())
            .await
            .unwrap_or_default();
        if !files.is_empty() {
            let mut sorted = files;
            sorted.sort();
            prompt.push_str(&format!(
                "\n\n<current_project_context>\nCurrent files in project directory: {}\n</current_project_context>",
                sorted.join(", ")
            ));
        }
    }

    prompt
}

async fn send_chat(tx: &mpsc::Sender<Event>, options: &TurnOptions, session_id: &str, content: String) {
    let event = Event::new(
        options.project_id.clone(),
        session_id.to_string(),
        Provider::Claude,
        Role::Assistant,
        EventKind::Chat,
        content,
        Metadata {
            cli_type: Some("claude".to_string()),
            ..Metadata::default()
        },
    );
    let _ = tx.send(event).await;
}

async fn send_tool_use(
    tx: &mpsc::Sender<Event>,
    options: &TurnOptions,
    session_id: &str,
    name: &str,
    input: serde_json::Value,
) {
    let summary = provider_model::render_tool_summary(name, &input);
    let event = Event::new(
        options.project_id.clone(),
        session_id.to_string(),
        Provider::Claude,
        Role::Assistant,
        EventKind::ToolUse,
        summary,
        Metadata {
            tool_name: Some(name.to_string()),
            tool_input: Some(input),
            cli_type: Some("claude".to_string()),
            ..Metadata::default()
        },
    );
    let _ = tx.send(event).await;
}

async fn send_error(tx: &mpsc::Sender<Event>, options: &TurnOptions, reason: &str, message: String) {
    let event = Event::new(
        options.project_id.clone(),
        String::new(),
        Provider::Claude,
        Role::Assistant,
        EventKind::Error,
        message,
        Metadata {
            reason: Some(reason.to_string()),
            cli_type: Some("claude".to_string()),
            ..Metadata::default()
        },
    );
    let _ = tx.send(event).await;
}

#[cfg(test)]
mod tests {
    use super::build_tool_policy;

    #[test]
    fn initial_prompt_disallows_todo_write() {
        let policy = build_tool_policy(true);
        assert_eq!(policy.disallowed, Some(vec!["TodoWrite".to_string()]));
        assert!(!policy.allowed.unwrap().contains(&"TodoWrite".to_string()));
    }

    #[test]
    fn followup_prompt_allows_todo_write() {
        let policy = build_tool_policy(false);
        assert!(policy.disallowed.is_none());
        assert!(policy.allowed.unwrap().contains(&"TodoWrite".to_string()));
    }
}
