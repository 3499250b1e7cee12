//! Qwen-specific tool-call parsing: ACP `tool_call` updates carry an
//! explicit `kind` or an opaque `call_XXXXXXXX` id rather than a clean name,
//! so this sits in front of the shared normalizer/renderer
//! (`provider_model::tools`).

use serde_json::Value;

/// Extracts the raw tool name from a `tool_call` update: prefers the
/// explicit `kind` field, falls back to the leading segment of
/// `toolCallId`, then `title`, then the literal `"tool"`.
#[must_use]
pub fn parse_tool_name(update: &Value) -> String {
    if let Some(kind) = update.get("kind").and_then(Value::as_str) {
        let kind = kind.trim();
        if !kind.is_empty() {
            return kind.to_string();
        }
    }

    if let Some(raw_id) = update.get("toolCallId").and_then(Value::as_str) {
        for sep in ['-', '_'] {
            if let Some((base, _)) = raw_id.split_once(sep) {
                let lowered = base.to_lowercase();
                if !base.is_empty() && !matches!(lowered.as_str(), "call" | "tool" | "toolcall") {
                    return base.to_string();
                }
            }
        }
    }

    update
        .get("title")
        .and_then(Value::as_str)
        .map_or_else(|| "tool".to_string(), str::to_string)
}

/// Extracts a `path` field from a `tool_call` update's `locations` or
/// `content` arrays, stripping a `file://` prefix if present.
#[must_use]
pub fn extract_tool_input(update: &Value) -> Value {
    let mut path = update
        .get("locations")
        .and_then(Value::as_array)
        .and_then(|locs| locs.first())
        .and_then(location_path);

    if path.is_none() {
        path = update
            .get("content")
            .and_then(Value::as_array)
            .and_then(|items| items.iter().find_map(content_path));
    }

    let path = path.map(|p| p.strip_prefix("file://").map_or(p.clone(), str::to_string));
    path.map_or_else(|| serde_json::json!({}), |p| serde_json::json!({"path": p}))
}

fn location_path(loc: &Value) -> Option<String> {
    loc.get("path")
        .or_else(|| loc.get("file"))
        .or_else(|| loc.get("file_path"))
        .or_else(|| loc.get("filePath"))
        .or_else(|| loc.get("uri"))
        .and_then(Value::as_str)
        .map(str::to_string)
}

fn content_path(item: &Value) -> Option<String> {
    item.get("path")
        .or_else(|| item.get("file"))
        .or_else(|| item.get("file_path"))
        .or_else(|| item.pointer("/args/path"))
        .and_then(Value::as_str)
        .map(str::to_string)
}

/// Suppresses noisy, opaque tool identifiers (`call`, `tool`, `toolcall`, or
/// anything starting with `call_`/`call-`) that would otherwise render as
/// `**call_390e...** \`executing...\``.
#[must_use]
pub fn is_opaque_tool_name(raw_name: &str) -> bool {
    let lower = raw_name.to_lowercase();
    matches!(lower.as_str(), "call" | "tool" | "toolcall")
        || lower.starts_with("call_")
        || lower.starts_with("call-")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn prefers_explicit_kind() {
        let update = json!({"kind": "edit", "toolCallId": "call_123"});
        assert_eq!(parse_tool_name(&update), "edit");
    }

    #[test]
    fn falls_back_to_tool_call_id_prefix() {
        let update = json!({"toolCallId": "read-abc123"});
        assert_eq!(parse_tool_name(&update), "read");
    }

    #[test]
    fn opaque_call_prefix_is_suppressed() {
        assert!(is_opaque_tool_name("call_390e8f"));
        assert!(!is_opaque_tool_name("edit"));
    }

    #[test]
    fn extracts_path_from_locations() {
        let update = json!({"locations": [{"path": "file:///a/b.rs"}]});
        assert_eq!(extract_tool_input(&update), json!({"path": "/a/b.rs"}));
    }
}
