#![warn(clippy::pedantic)]
//! Gemini CLI provider adapter: drives `gemini --experimental-acp` over the
//! shared [`acp_client::AcpClient`] transport (spec.md §4.6.4).

pub mod client;
pub mod discovery;
pub mod error;
pub mod markers;
pub mod tool_names;
pub mod turn;

use async_trait::async_trait;
use error::GeminiError;
use provider_model::event::Provider;
use provider_model::event::ProviderStatus;
use provider_model::{models, EventStream, ProviderAdapter, TurnOptions};
use session_store::Store;
use std::sync::Arc;
use tokio_stream::wrappers::ReceiverStream;

const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Runtime configuration for a [`GeminiAdapter`].
#[derive(Debug, Clone, Default)]
pub struct GeminiConfig {
    /// System-prompt content written into a fresh `GEMINI.md`. `None` writes
    /// only the bare `# GEMINI` header.
    pub system_prompt: Option<String>,
    /// ACP `authenticate` method id, defaulting to `oauth-personal`
    /// (overridable via `GEMINI_AUTH_METHOD`, matching the original).
    pub auth_method: Option<String>,
}

impl GeminiConfig {
    fn resolved_auth_method(&self) -> String {
        self.auth_method.clone().unwrap_or_else(|| {
            std::env::var("GEMINI_AUTH_METHOD").unwrap_or_else(|_| "oauth-personal".to_string())
        })
    }
}

/// Adapter for the Gemini CLI.
pub struct GeminiAdapter {
    store: Arc<dyn Store>,
    config: GeminiConfig,
}

impl GeminiAdapter {
    #[must_use]
    pub fn new(store: Arc<dyn Store>, config: GeminiConfig) -> Self {
        Self { store, config }
    }

    /// Runs `gemini --help` to check installation, without touching the
    /// shared long-lived ACP subprocess.
    pub async fn check_availability_impl(&self) -> ProviderStatus {
        let resolved = match discovery::resolve_gemini_binary() {
            Ok(bin) => bin,
            Err(e) => return ProviderStatus::unavailable(e.to_string()),
        };

        match tokio::process::Command::new(&resolved).arg("--help").output().await {
            Ok(output) if output.status.success() => ProviderStatus {
                available: true,
                configured: true,
                error: None,
                models: Some(models::supported_models(Provider::Gemini)),
                default_models: Some(Vec::new()),
            },
            Ok(_) => ProviderStatus::unavailable(
                "Gemini CLI not found. Install Gemini CLI and ensure it is in PATH.",
            ),
            Err(e) => ProviderStatus::unavailable(
                GeminiError::Acp(acp_client::AcpError::SpawnFailed {
                    stage: "--help".to_string(),
                    source: e,
                })
                .to_string(),
            ),
        }
    }
}

#[async_trait]
impl ProviderAdapter for GeminiAdapter {
    async fn check_availability(&self) -> ProviderStatus {
        self.check_availability_impl().await
    }

    async fn stream(&self, options: TurnOptions) -> EventStream {
        let (tx, rx) = tokio::sync::mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let store = self.store.clone();
        let system_prompt = self.config.system_prompt.clone();
        let auth_method = self.config.resolved_auth_method();
        tokio::spawn(async move {
            turn::run_turn(store, options, system_prompt, auth_method, tx).await;
        });
        Box::pin(ReceiverStream::new(rx))
    }

    fn supported_models(&self) -> Vec<String> {
        models::supported_models(Provider::Gemini)
    }
}
