//! The normalized [`Event`] streamed by every adapter to the orchestration
//! manager, plus the small supporting types referenced by the adapter
//! contract (`SessionHandle`, `ProviderStatus`).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// One of the five supported coding-assistant providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Claude,
    Cursor,
    Codex,
    Qwen,
    Gemini,
}

impl Provider {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Claude => "claude",
            Self::Cursor => "cursor",
            Self::Codex => "codex",
            Self::Qwen => "qwen",
            Self::Gemini => "gemini",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Who produced an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    Assistant,
    User,
}

/// What an event represents. Distinct from `Role`: a `system`-role event can
/// carry `kind=system` (init) or `kind=result` (terminal sentinel).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    System,
    Chat,
    ToolUse,
    ToolResult,
    Thinking,
    Result,
    Error,
}

/// Recognized metadata keys, plus an open passthrough bag for anything else
/// (e.g. a provider's raw event envelope, surfaced as `original_event` by
/// the Cursor adapter for the Manager's success-determination rule).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Metadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_input: Option<Value>,
    #[serde(default)]
    pub hidden_from_ui: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// The raw provider-side event tag (e.g. `"agent_message_delta"`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cli_type: Option<String>,
    /// Present when a line failed to parse (Cursor, Qwen): the raw text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parse_error: Option<String>,
    /// Cursor's raw `result` event, consulted by the Manager's
    /// provider-specific success rule (spec.md §4.5).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_event: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub changes_made: Option<bool>,
    /// Error taxonomy tag (spec.md §7): `cli_not_found`, `cli_not_configured`,
    /// `protocol_error`, `session_expired`, `execution_failed`, `cancelled`,
    /// `provider_error`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Anything not covered above, preserved verbatim.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

impl Metadata {
    #[must_use]
    pub fn hidden() -> Self {
        Self {
            hidden_from_ui: true,
            ..Self::default()
        }
    }
}

/// The unit streamed from adapters to the manager (spec.md §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: String,
    pub project_id: String,
    pub session_id: String,
    pub provider: Provider,
    pub role: Role,
    #[serde(rename = "message_type")]
    pub kind: EventKind,
    pub content: String,
    pub metadata: Metadata,
    pub created_at: DateTime<Utc>,
}

impl Event {
    /// Constructs an event with a server-assigned id and timestamp.
    #[must_use]
    pub fn new(
        project_id: impl Into<String>,
        session_id: impl Into<String>,
        provider: Provider,
        role: Role,
        kind: EventKind,
        content: impl Into<String>,
        metadata: Metadata,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            project_id: project_id.into(),
            session_id: session_id.into(),
            provider,
            role,
            kind,
            content: content.into(),
            metadata,
            created_at: Utc::now(),
        }
    }

    #[must_use]
    pub fn is_hidden(&self) -> bool {
        self.metadata.hidden_from_ui
    }

    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self.kind, EventKind::Result | EventKind::Error)
    }
}

impl PartialEq for Event {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}
impl Eq for Event {}

/// Per `(project_id, provider)` session state (spec.md §3).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionHandle {
    pub session_id: String,
    /// E.g. a Codex rollout file path, or a JSON resume blob for ACP
    /// providers.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resume_hint: Option<String>,
}

/// Result of an adapter's availability probe.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderStatus {
    pub available: bool,
    pub configured: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub models: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_models: Option<Vec<String>>,
}

impl ProviderStatus {
    #[must_use]
    pub fn unavailable(error: impl Into<String>) -> Self {
        Self {
            available: false,
            configured: false,
            error: Some(error.into()),
            models: None,
            default_models: None,
        }
    }

    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.available && self.configured
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hidden_metadata_defaults_the_rest() {
        let m = Metadata::hidden();
        assert!(m.hidden_from_ui);
        assert!(m.tool_name.is_none());
    }

    #[test]
    fn event_equality_is_by_id() {
        let a = Event::new(
            "p",
            "s",
            Provider::Claude,
            Role::Assistant,
            EventKind::Chat,
            "hi",
            Metadata::default(),
        );
        let mut b = a.clone();
        b.content = "different".to_string();
        assert_eq!(a, b);

        let c = Event::new(
            "p",
            "s",
            Provider::Claude,
            Role::Assistant,
            EventKind::Chat,
            "hi",
            Metadata::default(),
        );
        assert_ne!(a, c);
    }

    #[test]
    fn terminal_kinds() {
        let e = Event::new(
            "p",
            "s",
            Provider::Codex,
            Role::System,
            EventKind::Result,
            "",
            Metadata::default(),
        );
        assert!(e.is_terminal());
        let e2 = Event::new(
            "p",
            "s",
            Provider::Codex,
            Role::Assistant,
            EventKind::Chat,
            "",
            Metadata::default(),
        );
        assert!(!e2.is_terminal());
    }
}
