//! The result of a single `Manager::execute` call (spec.md §4.5).

use provider_model::event::Provider;
use serde::{Deserialize, Serialize};

/// Per-turn invocation parameters, distinct from the project/session
/// identifiers threaded through `Manager::execute` itself.
#[derive(Debug, Clone, Default)]
pub struct ExecuteOptions {
    pub instruction: String,
    pub images: Vec<provider_model::image::ImageInput>,
    pub model: Option<String>,
    pub is_initial_prompt: bool,
}

/// Outcome of one `Manager::execute` call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnOutcome {
    pub success: bool,
    pub provider: Provider,
    pub has_changes: bool,
    pub messages_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
