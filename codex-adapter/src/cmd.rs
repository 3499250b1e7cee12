//! Command-line argument builder for `codex proto` invocations.
//!
//! `--cd` must precede the `proto` subcommand (spec.md §4.6.3, §6.3).

use std::ffi::OsString;
use std::path::Path;

/// Preamble instructing Codex to act without confirmation prompts, appended
/// to the session's `instructions` config value.
const AUTO_APPROVAL_INSTRUCTIONS: &str = "Act autonomously without asking for user confirmations. \
Use apply_patch to create and modify files directly in the current working directory (not in \
subdirectories unless specifically requested). Use exec_command to run, build, and test as \
needed. Assume full permissions. Keep taking concrete actions until the task is complete. \
Prefer concise status updates over questions. Create files in the root directory of the \
project, not in subdirectories unless the user specifically asks for a subdirectory structure.";

/// Builds the argument list for `codex --cd <workdir_abs> proto -c ...`.
#[must_use]
pub fn build_args(workdir_abs: &Path, resume_path: Option<&Path>) -> Vec<OsString> {
    let mut args = vec![
        OsString::from("--cd"),
        OsString::from(workdir_abs),
        OsString::from("proto"),
    ];

    let overrides: &[(&str, String)] = &[
        ("include_apply_patch_tool", "true".to_string()),
        ("include_plan_tool", "true".to_string()),
        ("tools.web_search_request", "true".to_string()),
        ("use_experimental_streamable_shell_tool", "true".to_string()),
        ("sandbox_mode", "\"danger-full-access\"".to_string()),
        (
            "instructions",
            serde_json::to_string(AUTO_APPROVAL_INSTRUCTIONS).unwrap_or_default(),
        ),
    ];
    for (key, value) in overrides {
        args.push(OsString::from("-c"));
        args.push(OsString::from(format!("{key}={value}")));
    }

    if let Some(path) = resume_path {
        args.push(OsString::from("-c"));
        args.push(OsString::from(format!(
            "experimental_resume={}",
            path.display()
        )));
    }

    args
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn cd_precedes_proto_subcommand() {
        let args = build_args(&PathBuf::from("/work/dir"), None);
        let strs: Vec<&str> = args.iter().filter_map(|s| s.to_str()).collect();
        assert_eq!(strs[0], "--cd");
        assert_eq!(strs[1], "/work/dir");
        assert_eq!(strs[2], "proto");
    }

    #[test]
    fn sandbox_mode_is_always_danger_full_access() {
        let args = build_args(&PathBuf::from("/work"), None);
        let strs: Vec<&str> = args.iter().filter_map(|s| s.to_str()).collect();
        assert!(strs
            .windows(2)
            .any(|w| w[0] == "-c" && w[1] == "sandbox_mode=\"danger-full-access\""));
    }

    #[test]
    fn resume_path_appends_experimental_resume_override() {
        let args = build_args(&PathBuf::from("/work"), Some(&PathBuf::from("/rollouts/a.jsonl")));
        let strs: Vec<&str> = args.iter().filter_map(|s| s.to_str()).collect();
        assert!(strs
            .iter()
            .any(|s| *s == "experimental_resume=/rollouts/a.jsonl"));
    }

    #[test]
    fn no_resume_path_omits_experimental_resume() {
        let args = build_args(&PathBuf::from("/work"), None);
        let strs: Vec<&str> = args.iter().filter_map(|s| s.to_str()).collect();
        assert!(!strs.iter().any(|s| s.starts_with("experimental_resume")));
    }
}
