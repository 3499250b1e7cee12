//! Resolution of the Qwen CLI executable.

use crate::error::QwenError;

/// Environment variable that overrides the default `qwen` binary name.
pub const QWEN_CMD_ENV_VAR: &str = "QWEN_CMD";

/// Resolves the Qwen CLI executable name.
///
/// Resolution order: `QWEN_CMD` env var, then `qwen`, then `qwen-code`,
/// each checked against `$PATH`.
///
/// # Errors
/// Returns [`QwenError::ExecutableNotFound`] if none resolve.
pub fn resolve_qwen_binary() -> Result<String, QwenError> {
    let mut candidates = Vec::new();
    if let Ok(env_cmd) = std::env::var(QWEN_CMD_ENV_VAR) {
        if !env_cmd.is_empty() {
            candidates.push(env_cmd);
        }
    }
    candidates.push("qwen".to_string());
    candidates.push("qwen-code".to_string());

    candidates
        .into_iter()
        .find(|c| which::which(c).is_ok())
        .ok_or(QwenError::ExecutableNotFound)
}
