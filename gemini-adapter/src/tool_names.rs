//! Gemini-specific tool-call parsing and render-timing policy.

use provider_model::tools::{normalize_tool_name, CanonicalTool};
use serde_json::Value;

/// Extracts the raw tool name: the leading `-`-delimited segment of
/// `toolCallId`, else `title`, else `kind`, else `"tool"`.
#[must_use]
pub fn parse_tool_name(update: &Value) -> String {
    if let Some(raw_id) = update.get("toolCallId").and_then(Value::as_str) {
        if let Some((base, _)) = raw_id.split_once('-') {
            if !base.is_empty() {
                return base.to_string();
            }
        }
    }
    update
        .get("title")
        .or_else(|| update.get("kind"))
        .and_then(Value::as_str)
        .map_or_else(|| "tool".to_string(), str::to_string)
}

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

/// Gemini emits both a `tool_call` (start) and one or more `tool_call_update`
/// events for the same call; rendering both would duplicate the line. The
/// original renders non-`Write` tools on `tool_call` and the `Write` tool
/// only on its `tool_call_update` (Gemini's file-write tool call frequently
/// arrives with an empty path on `tool_call` and only fills it in on the
/// update).
#[must_use]
pub fn should_render(raw_tool_name: &str, update_kind: &str) -> bool {
    let is_write = matches!(normalize_tool_name(raw_tool_name), CanonicalTool::Write);
    if is_write {
        update_kind == "tool_call_update"
    } else {
        update_kind == "tool_call"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn write_only_renders_on_update() {
        assert!(!should_render("write_file", "tool_call"));
        assert!(should_render("write_file", "tool_call_update"));
    }

    #[test]
    fn non_write_only_renders_on_start() {
        assert!(should_render("read_file", "tool_call"));
        assert!(!should_render("read_file", "tool_call_update"));
    }

    #[test]
    fn parses_tool_call_id_prefix() {
        let update = json!({"toolCallId": "edit-abc123"});
        assert_eq!(parse_tool_name(&update), "edit");
    }
}
