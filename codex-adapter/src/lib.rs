#![warn(clippy::pedantic)]
//! Codex provider adapter: drives `codex proto` as a long-lived subprocess
//! per turn, speaking its line-delimited JSON protocol directly rather than
//! the Agent Client Protocol used by Qwen and Gemini (spec.md §4.6.3).

pub mod cmd;
pub mod discovery;
pub mod error;
pub mod markers;
pub mod process;
pub mod rollout;
pub mod turn;
pub mod types;

use async_trait::async_trait;
use provider_model::event::{Provider, ProviderStatus};
use provider_model::{models, EventStream, ProviderAdapter, TurnOptions};
use session_store::Store;
use std::sync::Arc;
use tokio_stream::wrappers::ReceiverStream;
pub use types::CodexConfig;

const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Adapter for the Codex CLI.
pub struct CodexAdapter {
    store: Arc<dyn Store>,
    config: CodexConfig,
}

impl CodexAdapter {
    #[must_use]
    pub fn new(store: Arc<dyn Store>, config: CodexConfig) -> Self {
        Self { store, config }
    }

    /// Runs `codex --version` to check installation, without spawning a
    /// `proto` session.
    pub async fn check_availability_impl(&self) -> ProviderStatus {
        let binary = match discovery::discover_codex(None) {
            Ok(bin) => bin,
            Err(e) => return ProviderStatus::unavailable(e.to_string()),
        };

        match tokio::process::Command::new(&binary).arg("--version").output().await {
            Ok(output) if output.status.success() => ProviderStatus {
                available: true,
                configured: true,
                error: None,
                models: Some(models::supported_models(Provider::Codex)),
                default_models: Some(Vec::new()),
            },
            Ok(_) => ProviderStatus::unavailable("codex --version exited non-zero"),
            Err(e) => ProviderStatus::unavailable(format!("failed to run codex --version: {e}")),
        }
    }
}

#[async_trait]
impl ProviderAdapter for CodexAdapter {
    async fn check_availability(&self) -> ProviderStatus {
        self.check_availability_impl().await
    }

    async fn stream(&self, options: TurnOptions) -> EventStream {
        let (tx, rx) = tokio::sync::mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let store = self.store.clone();
        let config = self.config.clone();
        tokio::spawn(async move {
            turn::run_turn(store, options, config, tx).await;
        });
        Box::pin(ReceiverStream::new(rx))
    }

    fn supported_models(&self) -> Vec<String> {
        models::supported_models(Provider::Codex)
    }
}
