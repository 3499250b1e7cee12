#![warn(clippy::pedantic)]
//! Cursor Agent provider adapter: drives the `cursor-agent` CLI in
//! `--output-format stream-json` mode, translating its NDJSON event stream
//! into normalized events (spec.md §4.6.2).

pub mod cmd;
pub mod discovery;
pub mod error;
pub mod process;
pub mod turn;

use async_trait::async_trait;
use provider_model::event::{Provider, ProviderStatus};
use provider_model::{models, EventStream, ProviderAdapter, TurnOptions};
use session_store::Store;
use std::sync::Arc;
use tokio_stream::wrappers::ReceiverStream;

const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Runtime configuration for a [`CursorAdapter`]. Currently empty: Cursor
/// has no provider-supplied system prompt or marker file (spec.md §6.4
/// lists marker files only for Codex, Qwen, and Gemini).
#[derive(Debug, Clone, Default)]
pub struct CursorConfig {}

/// Adapter for the Cursor Agent CLI.
pub struct CursorAdapter {
    store: Arc<dyn Store>,
    #[allow(dead_code)]
    config: CursorConfig,
}

impl CursorAdapter {
    #[must_use]
    pub fn new(store: Arc<dyn Store>, config: CursorConfig) -> Self {
        Self { store, config }
    }

    /// Runs `cursor-agent -h` to check installation, matching the
    /// availability probe's own approach of inspecting help text.
    pub async fn check_availability_impl(&self) -> ProviderStatus {
        let binary = match discovery::discover_cursor(None) {
            Ok(bin) => bin,
            Err(e) => return ProviderStatus::unavailable(e.to_string()),
        };

        match tokio::process::Command::new(&binary).arg("-h").output().await {
            Ok(output) if output.status.success() => {
                let help = String::from_utf8_lossy(&output.stdout).to_lowercase();
                if help.contains("cursor-agent") {
                    ProviderStatus {
                        available: true,
                        configured: true,
                        error: None,
                        models: Some(models::supported_models(Provider::Cursor)),
                        default_models: Some(vec!["gpt-5".to_string(), "sonnet-4".to_string()]),
                    }
                } else {
                    ProviderStatus::unavailable("cursor-agent CLI not responding correctly")
                }
            }
            Ok(_) => ProviderStatus::unavailable("cursor-agent -h exited non-zero"),
            Err(e) => ProviderStatus::unavailable(format!("failed to run cursor-agent -h: {e}")),
        }
    }
}

#[async_trait]
impl ProviderAdapter for CursorAdapter {
    async fn check_availability(&self) -> ProviderStatus {
        self.check_availability_impl().await
    }

    async fn stream(&self, options: TurnOptions) -> EventStream {
        let (tx, rx) = tokio::sync::mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let store = self.store.clone();

        match discovery::discover_cursor(None) {
            Ok(binary) => {
                tokio::spawn(async move {
                    turn::run_turn(store, options, binary, tx).await;
                });
            }
            Err(e) => {
                tokio::spawn(async move {
                    let event = provider_model::event::Event::new(
                        options.project_id.clone(),
                        String::new(),
                        Provider::Cursor,
                        provider_model::event::Role::Assistant,
                        provider_model::EventKind::Error,
                        e.to_string(),
                        provider_model::event::Metadata {
                            reason: Some("cli_not_found".to_string()),
                            cli_type: Some("cursor".to_string()),
                            ..provider_model::event::Metadata::default()
                        },
                    );
                    let _ = tx.send(event).await;
                });
            }
        }

        Box::pin(ReceiverStream::new(rx))
    }

    fn supported_models(&self) -> Vec<String> {
        models::supported_models(Provider::Cursor)
    }
}
