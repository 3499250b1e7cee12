//! The Provider Adapter contract (spec.md §4.7) every one of the five
//! provider crates implements, and that `orchestration-manager` drives
//! uniformly.

use crate::event::{Event, ProviderStatus};
use crate::image::ImageInput;
use async_trait::async_trait;
use std::pin::Pin;
use tokio_stream::Stream;
use tokio_util::sync::CancellationToken;

/// Per-turn invocation options passed to [`ProviderAdapter::stream`].
#[derive(Debug, Clone, Default)]
pub struct TurnOptions {
    pub project_id: String,
    pub project_path: String,
    pub instruction: String,
    pub is_initial_prompt: bool,
    pub model: Option<String>,
    /// Attached images (spec.md §4.6.5). Providers that cannot accept
    /// images (Qwen) ignore this with a logged warning.
    pub images: Vec<ImageInput>,
    /// The Manager's deadline/cancellation signal (spec.md §5). Adapters
    /// MUST select on this alongside their subprocess/request I/O and, on
    /// cancellation, terminate the subprocess (per-turn providers) or abort
    /// the in-flight request (ACP providers) before ending their stream.
    /// Defaults to a token that is never cancelled.
    pub cancellation: CancellationToken,
}

/// A boxed, pinned stream of normalized events. Lazy: no adapter work runs
/// until the stream is polled. Finite: exactly one terminal (`Result` or
/// `Error`) event is emitted before the stream ends.
pub type EventStream = Pin<Box<dyn Stream<Item = Event> + Send>>;

/// Common behavior every provider adapter exposes to the orchestration
/// manager. Adapters are a closed set (spec.md §9): the manager matches on
/// a `Provider` enum rather than loading adapters as runtime plugins.
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    /// Side-effect-free probe: is the provider's CLI installed and
    /// configured. Never spawns a turn.
    async fn check_availability(&self) -> ProviderStatus;

    /// Starts one turn and returns a lazy stream of normalized events.
    async fn stream(&self, options: TurnOptions) -> EventStream;

    /// The provider's statically known model aliases (spec.md §4.3).
    fn supported_models(&self) -> Vec<String>;

    /// Whether `model` is a recognized alias or native name for this
    /// provider.
    fn is_model_supported(&self, model: &str) -> bool {
        self.supported_models().iter().any(|m| m == model)
    }
}
