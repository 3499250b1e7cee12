#![warn(clippy::pedantic)]
//! Claude Code provider adapter: drives the `claude` CLI in `--print
//! --output-format stream-json` mode, translating its SDK message envelope
//! into normalized events (spec.md §4.6.1).

pub mod cmd;
pub mod discovery;
pub mod error;
pub mod process;
pub mod turn;
pub mod types;

use async_trait::async_trait;
use provider_model::event::{Provider, ProviderStatus};
use provider_model::{models, EventStream, ProviderAdapter, TurnOptions};
use session_store::Store;
use std::sync::Arc;
use tokio_stream::wrappers::ReceiverStream;

const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Runtime configuration for a [`ClaudeAdapter`].
#[derive(Debug, Clone, Default)]
pub struct ClaudeConfig {
    /// System-prompt content loaded from an external provider. `None` falls
    /// back to a hard-coded short default (spec.md §4.6.1).
    pub system_prompt: Option<String>,
}

/// Adapter for the Claude Code CLI.
pub struct ClaudeAdapter {
    store: Arc<dyn Store>,
    config: ClaudeConfig,
}

impl ClaudeAdapter {
    #[must_use]
    pub fn new(store: Arc<dyn Store>, config: ClaudeConfig) -> Self {
        Self { store, config }
    }

    /// Runs `claude --version` to check installation.
    pub async fn check_availability_impl(&self) -> ProviderStatus {
        let binary = match discovery::discover_claude(None) {
            Ok(bin) => bin,
            Err(e) => return ProviderStatus::unavailable(e.to_string()),
        };

        match tokio::process::Command::new(&binary).arg("--version").output().await {
            Ok(output) if output.status.success() => ProviderStatus {
                available: true,
                configured: true,
                error: None,
                models: Some(models::supported_models(Provider::Claude)),
                default_models: Some(Vec::new()),
            },
            Ok(_) => ProviderStatus::unavailable("claude --version exited non-zero"),
            Err(e) => ProviderStatus::unavailable(format!("failed to run claude --version: {e}")),
        }
    }
}

#[async_trait]
impl ProviderAdapter for ClaudeAdapter {
    async fn check_availability(&self) -> ProviderStatus {
        self.check_availability_impl().await
    }

    async fn stream(&self, options: TurnOptions) -> EventStream {
        let (tx, rx) = tokio::sync::mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let store = self.store.clone();
        let system_prompt = self.config.system_prompt.clone();

        match discovery::discover_claude(None) {
            Ok(binary) => {
                tokio::spawn(async move {
                    turn::run_turn(store, options, binary, system_prompt, tx).await;
                });
            }
            Err(e) => {
                tokio::spawn(async move {
                    let event = provider_model::event::Event::new(
                        options.project_id.clone(),
                        String::new(),
                        Provider::Claude,
                        provider_model::event::Role::Assistant,
                        provider_model::EventKind::Error,
                        e.to_string(),
                        provider_model::event::Metadata {
                            reason: Some("cli_not_found".to_string()),
                            cli_type: Some("claude".to_string()),
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
        models::supported_models(Provider::Claude)
    }
}
