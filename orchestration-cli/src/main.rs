//! Command-line front end for the Provider Orchestration Core: wires the
//! five adapters, the session store, and the orchestration manager
//! together for manual smoke-testing (spec.md §1 keeps the HTTP/WebSocket
//! transport itself out of scope — this binary is the local stand-in).

use claude_adapter::{ClaudeAdapter, ClaudeConfig};
use clap::{Parser, Subcommand};
use codex_adapter::{CodexAdapter, CodexConfig};
use cursor_adapter::{CursorAdapter, CursorConfig};
use gemini_adapter::{GeminiAdapter, GeminiConfig};
use orchestration_manager::{AdapterRegistry, ExecuteOptions, LoggingBroadcaster, Manager};
use provider_model::event::Provider;
use qwen_adapter::{QwenAdapter, QwenConfig};
use session_store::InMemoryStore;
use std::sync::Arc;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Probes every provider's CLI for installation and configuration.
    Doctor,
    /// Runs a single turn against one provider and prints the outcome.
    Run {
        /// Which provider to target.
        #[arg(long, value_enum)]
        provider: ProviderArg,
        /// Directory containing the project (a `repo` subdir is used if
        /// present, else this path directly).
        #[arg(long)]
        project_path: String,
        /// The instruction to send.
        #[arg(long)]
        instruction: String,
        /// Project id under which events and sessions are tracked.
        #[arg(long, default_value = "manual")]
        project_id: String,
        /// Treat this as the project's first turn (affects tool policy /
        /// context injection per adapter).
        #[arg(long)]
        initial: bool,
        /// Model alias override.
        #[arg(long)]
        model: Option<String>,
    },
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum ProviderArg {
    Claude,
    Cursor,
    Codex,
    Qwen,
    Gemini,
}

impl From<ProviderArg> for Provider {
    fn from(arg: ProviderArg) -> Self {
        match arg {
            ProviderArg::Claude => Provider::Claude,
            ProviderArg::Cursor => Provider::Cursor,
            ProviderArg::Codex => Provider::Codex,
            ProviderArg::Qwen => Provider::Qwen,
            ProviderArg::Gemini => Provider::Gemini,
        }
    }
}

fn build_registry(store: Arc<dyn session_store::Store>) -> AdapterRegistry {
    let mut registry = AdapterRegistry::new();
    registry.register(
        Provider::Claude,
        Arc::new(ClaudeAdapter::new(store.clone(), ClaudeConfig::default())),
    );
    registry.register(
        Provider::Cursor,
        Arc::new(CursorAdapter::new(store.clone(), CursorConfig::default())),
    );
    registry.register(
        Provider::Codex,
        Arc::new(CodexAdapter::new(store.clone(), CodexConfig::default())),
    );
    registry.register(Provider::Qwen, Arc::new(QwenAdapter::new(store.clone(), QwenConfig::default())));
    registry.register(Provider::Gemini, Arc::new(GeminiAdapter::new(store, GeminiConfig::default())));
    registry
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let store: Arc<dyn session_store::Store> = Arc::new(InMemoryStore::new());
    let registry = build_registry(store.clone());

    match cli.command {
        Commands::Doctor => run_doctor(&registry).await,
        Commands::Run {
            provider,
            project_path,
            instruction,
            project_id,
            initial,
            model,
        } => {
            run_turn(
                &registry,
                store,
                provider.into(),
                &project_id,
                &project_path,
                &instruction,
                initial,
                model,
            )
            .await
        }
    }
}

async fn run_doctor(registry: &AdapterRegistry) -> anyhow::Result<()> {
    for provider in [Provider::Claude, Provider::Cursor, Provider::Codex, Provider::Qwen, Provider::Gemini] {
        let Some(adapter) = registry.get(provider) else {
            println!("{provider}: not registered");
            continue;
        };
        let status = adapter.check_availability().await;
        if status.available && status.configured {
            println!("{provider}: available (models: {})", status.models.unwrap_or_default().join(", "));
        } else {
            println!("{provider}: unavailable — {}", status.error.unwrap_or_default());
        }
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
async fn run_turn(
    registry: &AdapterRegistry,
    store: Arc<dyn session_store::Store>,
    provider: Provider,
    project_id: &str,
    project_path: &str,
    instruction: &str,
    is_initial_prompt: bool,
    model: Option<String>,
) -> anyhow::Result<()> {
    let manager = Manager::new(registry.clone(), store, Arc::new(LoggingBroadcaster));
    let conversation_id = uuid::Uuid::new_v4().to_string();

    // Ctrl-C cancels the in-flight turn rather than killing the process
    // outright, so the adapter gets a chance to tear down its subprocess
    // cleanly (spec.md §5).
    let cancellation = orchestration_manager::CancellationToken::new();
    let ctrl_c_cancel = cancellation.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("received Ctrl-C, cancelling turn");
            ctrl_c_cancel.cancel();
        }
    });

    let outcome = manager
        .execute(
            project_id,
            project_path,
            "",
            &conversation_id,
            provider,
            ExecuteOptions {
                instruction: instruction.to_string(),
                is_initial_prompt,
                model,
                ..ExecuteOptions::default()
            },
            cancellation,
        )
        .await;

    println!("{}", serde_json::to_string_pretty(&outcome)?);
    Ok(())
}
