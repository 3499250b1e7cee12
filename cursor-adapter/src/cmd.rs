//! Command-line argument builder for Cursor Agent CLI invocations.

use std::ffi::OsString;

/// Options accepted by a single `cursor-agent` invocation.
#[derive(Debug, Clone, Default)]
pub struct RunConfig {
    /// Session id to resume, passed as `--resume`.
    pub resume: Option<String>,
    /// API key, passed as `--api-key`. Sourced from `CURSOR_API_KEY` when set.
    pub api_key: Option<String>,
    /// Model override, passed as `-m`. Falls back to `CURSOR_MODEL` when unset.
    pub model: Option<String>,
}

/// Builds the argument list for `cursor-agent --force -p <instruction>
/// --output-format stream-json [--resume <id>] [--api-key <v>] [-m <model>]`
/// (spec.md §4.6.2, §6.3).
#[must_use]
pub fn build_args(instruction: &str, config: &RunConfig) -> Vec<OsString> {
    let mut args = vec![
        OsString::from("--force"),
        OsString::from("-p"),
        OsString::from(instruction),
        OsString::from("--output-format"),
        OsString::from("stream-json"),
    ];

    if let Some(session_id) = &config.resume {
        args.push(OsString::from("--resume"));
        args.push(OsString::from(session_id));
    }

    if let Some(api_key) = &config.api_key {
        args.push(OsString::from("--api-key"));
        args.push(OsString::from(api_key));
    }

    if let Some(model) = &config.model {
        args.push(OsString::from("-m"));
        args.push(OsString::from(model));
    }

    args
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_invocation_has_force_and_stream_json() {
        let args = build_args("list files", &RunConfig::default());
        let args_str: Vec<&str> = args.iter().filter_map(|s| s.to_str()).collect();
        assert_eq!(
            args_str,
            vec!["--force", "-p", "list files", "--output-format", "stream-json"]
        );
    }

    #[test]
    fn resume_api_key_and_model_are_appended_in_order() {
        let config = RunConfig {
            resume: Some("S1".to_string()),
            api_key: Some("sk-test".to_string()),
            model: Some("gpt-5".to_string()),
        };
        let args = build_args("go", &config);
        let args_str: Vec<&str> = args.iter().filter_map(|s| s.to_str()).collect();
        assert_eq!(
            args_str,
            vec![
                "--force", "-p", "go", "--output-format", "stream-json", "--resume", "S1",
                "--api-key", "sk-test", "-m", "gpt-5"
            ]
        );
    }
}
