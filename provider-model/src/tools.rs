//! Tool-name normalizer and summary renderer (spec.md §4.2).
//!
//! Collapses every provider's bespoke tool identifiers and argument shapes
//! into the closed canonical vocabulary and a short display string, so that
//! persisted history and client renderers never see provider idiosyncrasies.

use serde_json::Value;
use std::fmt;

/// The closed canonical tool-name set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CanonicalTool {
    Read,
    Write,
    Edit,
    MultiEdit,
    Delete,
    Bash,
    Glob,
    Grep,
    Ls,
    WebSearch,
    WebFetch,
    TodoWrite,
    SaveMemory,
    Task,
    ExitPlanMode,
    NotebookEdit,
    McpTool,
    SemSearch,
    /// A raw tool identifier with no known mapping. Carries the original
    /// string unchanged, matching the source's fallback-to-input behavior.
    Other(String),
}

impl fmt::Display for CanonicalTool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Read => "Read",
            Self::Write => "Write",
            Self::Edit => "Edit",
            Self::MultiEdit => "MultiEdit",
            Self::Delete => "Delete",
            Self::Bash => "Bash",
            Self::Glob => "Glob",
            Self::Grep => "Grep",
            Self::Ls => "LS",
            Self::WebSearch => "WebSearch",
            Self::WebFetch => "WebFetch",
            Self::TodoWrite => "TodoWrite",
            Self::SaveMemory => "SaveMemory",
            Self::Task => "Task",
            Self::ExitPlanMode => "ExitPlanMode",
            Self::NotebookEdit => "NotebookEdit",
            Self::McpTool => "MCPTool",
            Self::SemSearch => "SemSearch",
            Self::Other(raw) => raw.as_str(),
        };
        f.write_str(s)
    }
}

/// Normalizes a raw provider tool identifier to the canonical vocabulary.
///
/// Lookup order mirrors the source: try the raw name verbatim first (covers
/// snake_case identifiers like `read_file`), then a lowercased,
/// space-stripped form (covers Qwen/Gemini's `"Read Folder"`-style names),
/// else fall back to the trimmed original name unchanged.
#[must_use]
pub fn normalize_tool_name(raw_name: &str) -> CanonicalTool {
    let key = raw_name.trim();
    let key_lower = key.replace(' ', "").to_lowercase();

    if let Some(c) = map_known(key) {
        return c;
    }
    if let Some(c) = map_known(&key_lower) {
        return c;
    }
    CanonicalTool::Other(key.to_string())
}

fn map_known(name: &str) -> Option<CanonicalTool> {
    use CanonicalTool::{
        Bash, Delete, Edit, Glob, Grep, Ls, McpTool, MultiEdit, Read, SaveMemory, SemSearch,
        WebFetch, WebSearch, Write,
    };
    Some(match name {
        "read_file" | "read" | "readfile" | "readmanyfiles" => Read,
        "write_file" | "write" | "writefile" => Write,
        "edit_file" | "replace" | "edit" => Edit,
        "delete" => Delete,
        "readfolder" | "list_directory" | "list_dir" | "ls" => Ls,
        "findfiles" | "find_files" | "glob" => Glob,
        "savememory" | "save memory" | "save_memory" => SaveMemory,
        "searchtext" | "search_file_content" | "codebase_search" | "grep" | "search" => Grep,
        "shell" | "run_terminal_command" | "exec_command" => Bash,
        "semsearch" => SemSearch,
        "google_web_search" | "web_search" | "googlesearch" => WebSearch,
        "web_fetch" | "fetch" => WebFetch,
        "apply_patch" => Edit,
        "mcp_tool_call" => McpTool,
        _ => return None,
    })
}

/// Looks up the first present string-valued key among `keys` in `input`.
fn get_str<'a>(input: &'a Value, keys: &[&str]) -> Option<&'a str> {
    keys.iter().find_map(|k| input.get(*k).and_then(Value::as_str))
}

const MAX_PATH_DISPLAY: usize = 40;
const MAX_COMMAND_DISPLAY: usize = 40;

/// Collapses a path longer than 40 chars to `…/<last-two-components>`.
#[must_use]
pub fn truncate_path(path: &str) -> String {
    if path.len() <= MAX_PATH_DISPLAY {
        return path.to_string();
    }
    let parts: Vec<&str> = path.split('/').collect();
    let tail = if parts.len() >= 2 {
        parts[parts.len() - 2..].join("/")
    } else {
        path.to_string()
    };
    format!("…/{tail}")
}

/// Truncates a command string to 40 chars, appending `...` when clipped.
#[must_use]
pub fn truncate_command(command: &str) -> String {
    if command.len() <= MAX_COMMAND_DISPLAY {
        command.to_string()
    } else {
        format!("{}...", &command[..MAX_COMMAND_DISPLAY])
    }
}

fn file_arg<'a>(input: &'a Value) -> Option<&'a str> {
    get_str(input, &["file_path", "path", "file"])
}

/// Renders a `**Name** \`display\`` summary line for a normalized tool call.
///
/// `raw_name` is consulted before normalization to special-case Codex's
/// `apply_patch`, whose per-file sub-rendering (`add`→Write, `delete`→Delete,
/// `update.move_path`→Rename, else→Edit) does not fit the generic shape.
#[must_use]
pub fn render_tool_summary(raw_name: &str, input: &Value) -> String {
    if raw_name == "apply_patch" {
        return render_apply_patch(input);
    }

    let canonical = normalize_tool_name(raw_name);
    match &canonical {
        CanonicalTool::Read | CanonicalTool::Write | CanonicalTool::Edit => {
            file_arg(input).map_or_else(
                || format!("**{canonical}** `file`"),
                |p| format!("**{canonical}** `{}`", truncate_path(p)),
            )
        }
        CanonicalTool::MultiEdit => file_arg(input).map_or_else(
            || "**MultiEdit** `file`".to_string(),
            |p| format!("**MultiEdit** `{}`", truncate_path(p)),
        ),
        CanonicalTool::Bash => {
            let command = get_str(input, &["command", "cmd", "script"]);
            command.map_or_else(
                || "**Bash** `command`".to_string(),
                |c| format!("**Bash** `{}`", truncate_command(c)),
            )
        }
        CanonicalTool::Ls => {
            let path = get_str(input, &["path", "directory", "dir"]);
            path.map_or_else(
                || "**LS** `directory`".to_string(),
                |p| format!("**LS** `{}`", truncate_path(p)),
            )
        }
        CanonicalTool::Grep => {
            let pattern = get_str(input, &["pattern", "query", "search"]);
            let path = get_str(input, &["path", "file", "directory"]);
            match (pattern, path) {
                (Some(p), Some(d)) => format!("**Search** `{p}` in `{}`", truncate_path(d)),
                (Some(p), None) => format!("**Search** `{p}`"),
                (None, _) => "**Search** `pattern`".to_string(),
            }
        }
        CanonicalTool::Glob => {
            let pattern = get_str(input, &["pattern", "globPattern", "name"]);
            pattern.map_or_else(
                || "**Glob** `pattern`".to_string(),
                |p| format!("**Glob** `{p}`"),
            )
        }
        CanonicalTool::WebFetch => {
            let url = get_str(input, &["url"]);
            url.map_or_else(
                || "**WebFetch** `url`".to_string(),
                |u| format!("**WebFetch** `{u}`"),
            )
        }
        CanonicalTool::WebSearch => {
            let query = get_str(input, &["query"]);
            query.map_or_else(
                || "**WebSearch** `query`".to_string(),
                |q| format!("**WebSearch** `{}`", clip(q, MAX_COMMAND_DISPLAY)),
            )
        }
        CanonicalTool::TodoWrite => "`Planning for next moves...`".to_string(),
        CanonicalTool::SaveMemory => {
            let fact = get_str(input, &["fact"]);
            fact.map_or_else(
                || "**SaveMemory** `storing information`".to_string(),
                |f| format!("**SaveMemory** `{}`", clip(f, MAX_COMMAND_DISPLAY)),
            )
        }
        CanonicalTool::Task => {
            let description = get_str(input, &["description"]);
            let subagent = get_str(input, &["subagent_type"]);
            match (description, subagent) {
                (Some(d), Some(s)) => format!("**Task** `{s}`\n> {}", clip(d, 50)),
                (Some(d), None) => format!("**Task** `{}`", clip(d, MAX_COMMAND_DISPLAY)),
                (None, _) => "**Task** `subtask`".to_string(),
            }
        }
        CanonicalTool::ExitPlanMode => "**ExitPlanMode** `planning complete`".to_string(),
        CanonicalTool::NotebookEdit => {
            let notebook = get_str(input, &["notebook_path"]);
            notebook.map_or_else(
                || "**NotebookEdit** `notebook`".to_string(),
                |p| format!("**NotebookEdit** `{}`", truncate_path(p)),
            )
        }
        CanonicalTool::McpTool => {
            let server = get_str(input, &["server"]);
            let tool = get_str(input, &["tool"]);
            match (server, tool) {
                (Some(s), Some(t)) => format!("**MCP** `{s}.{t}`"),
                _ => "**MCP** `tool call`".to_string(),
            }
        }
        CanonicalTool::Delete => file_arg(input).map_or_else(
            || "**Delete** `file`".to_string(),
            |p| format!("**Delete** `{}`", truncate_path(p)),
        ),
        CanonicalTool::SemSearch => {
            let query = get_str(input, &["query", "pattern"]);
            query.map_or_else(
                || "**SemSearch** `query`".to_string(),
                |q| format!("**SemSearch** `{q}`"),
            )
        }
        CanonicalTool::Other(raw) => format!("**{raw}** `executing...`"),
    }
}

fn clip(s: &str, max: usize) -> String {
    if s.len() > max {
        format!("{}...", &s[..max])
    } else {
        s.to_string()
    }
}

fn change_filename(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Renders the one-line-per-file summary for Codex's `apply_patch`
/// (spec.md §4.2, §4.6.3). `changes` is a map keyed by file path with a
/// single-key object: `add`, `delete`, or `update` (optionally carrying
/// `move_path` for a rename).
fn render_apply_patch(input: &Value) -> String {
    let Some(changes) = input.get("changes").and_then(Value::as_object) else {
        return "**ApplyPatch** `files`".to_string();
    };
    if changes.is_empty() {
        return "**ApplyPatch** `files`".to_string();
    }

    let lines: Vec<String> = changes
        .iter()
        .take(3)
        .map(|(path, change)| render_one_change(path, change))
        .collect();

    if changes.len() == 1 {
        return lines.into_iter().next().unwrap_or_default();
    }

    let mut out = lines
        .into_iter()
        .map(|l| format!("• {l}"))
        .collect::<Vec<_>>()
        .join("\n");
    if changes.len() > 3 {
        out.push_str(&format!("\n• ... +{} more files", changes.len() - 3));
    }
    out
}

fn render_one_change(path: &str, change: &Value) -> String {
    let filename = change_filename(path);
    let Some(obj) = change.as_object() else {
        return format!("**Edit** `{filename}`");
    };
    if obj.contains_key("add") {
        format!("**Write** `{filename}`")
    } else if obj.contains_key("delete") {
        format!("**Delete** `{filename}`")
    } else if let Some(update) = obj.get("update") {
        let move_path = update.get("move_path").and_then(Value::as_str);
        move_path.map_or_else(
            || format!("**Edit** `{filename}`"),
            |mv| format!("**Rename** `{filename}` → `{}`", change_filename(mv)),
        )
    } else {
        format!("**Edit** `{filename}`")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn normalizes_known_aliases() {
        assert_eq!(normalize_tool_name("read_file"), CanonicalTool::Read);
        assert_eq!(normalize_tool_name("ReadFolder"), CanonicalTool::Ls);
        assert_eq!(normalize_tool_name("shell"), CanonicalTool::Bash);
        assert_eq!(normalize_tool_name("exec_command"), CanonicalTool::Bash);
        assert_eq!(normalize_tool_name("apply_patch"), CanonicalTool::Edit);
        assert_eq!(normalize_tool_name("mcp_tool_call"), CanonicalTool::McpTool);
    }

    #[test]
    fn unknown_name_passes_through() {
        assert_eq!(
            normalize_tool_name("frobnicate"),
            CanonicalTool::Other("frobnicate".to_string())
        );
    }

    #[test]
    fn normalization_is_idempotent() {
        for raw in ["read_file", "ReadFolder", "frobnicate", "Bash"] {
            let once = normalize_tool_name(raw).to_string();
            let twice = normalize_tool_name(&once).to_string();
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn s5_tool_normalization_scenario() {
        // spec.md §8 S5
        let input = json!({"path": "/abs/project/src/x.ts"});
        let summary = render_tool_summary("read_file", &input);
        assert_eq!(summary, "**Read** `…/src/x.ts`");
    }

    #[test]
    fn long_path_collapses_to_last_two_components() {
        let input = json!({"path": "/this/is/a/very/long/absolute/path/src/x.ts"});
        let summary = render_tool_summary("read_file", &input);
        assert_eq!(summary, "**Read** `…/src/x.ts`");
    }

    #[test]
    fn apply_patch_single_file_write() {
        let input = json!({"changes": {"src/a.ts": {"add": "contents"}}});
        assert_eq!(render_apply_patch(&input), "**Write** `a.ts`");
    }

    #[test]
    fn apply_patch_rename() {
        let input = json!({
            "changes": {"src/old.ts": {"update": {"move_path": "src/new.ts"}}}
        });
        assert_eq!(render_apply_patch(&input), "**Rename** `old.ts` → `new.ts`");
    }

    #[test]
    fn apply_patch_truncates_after_three_files() {
        let input = json!({"changes": {
            "a.ts": {"add": "x"},
            "b.ts": {"add": "x"},
            "c.ts": {"add": "x"},
            "d.ts": {"add": "x"},
            "e.ts": {"add": "x"},
        }});
        let out = render_apply_patch(&input);
        assert!(out.ends_with("... +2 more files"));
        assert_eq!(out.lines().count(), 4);
    }

    #[test]
    fn command_truncates_to_forty_chars() {
        let long_cmd = "x".repeat(60);
        let input = json!({"command": long_cmd});
        let summary = render_tool_summary("shell", &input);
        assert!(summary.contains("..."));
        assert!(summary.len() < long_cmd.len());
    }
}
