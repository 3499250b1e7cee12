//! Configuration for a Codex `proto` subprocess invocation.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Runtime configuration for a [`crate::CodexAdapter`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodexConfig {
    /// Content written into a fresh `AGENTS.md`. `None` writes nothing and
    /// leaves the project without a system-prompt marker.
    pub system_prompt: Option<String>,
    /// Enables `-c experimental_resume=<path>` when a rollout file is on
    /// record, overridable via `CODEX_RESUME` (spec.md §6.5). Disabled by
    /// default: a stale resumed session can leak prior system prompts or
    /// behavior into an otherwise fresh turn.
    pub enable_resume: bool,
    /// Maximum wall-clock time before the subprocess is killed.
    pub timeout: Duration,
}

impl Default for CodexConfig {
    fn default() -> Self {
        Self {
            system_prompt: None,
            enable_resume: false,
            timeout: Duration::from_secs(600),
        }
    }
}

impl CodexConfig {
    #[must_use]
    pub fn resolved_enable_resume(&self) -> bool {
        if self.enable_resume {
            return true;
        }
        matches!(
            std::env::var("CODEX_RESUME").as_deref(),
            Ok("1" | "true" | "yes" | "on")
        )
    }
}
