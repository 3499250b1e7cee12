//! Resolution of the Gemini CLI executable.

use crate::error::GeminiError;

/// Resolves the `gemini` executable via `$PATH`. Unlike Qwen, the original
/// adapter hard-codes the command name with no environment override.
///
/// # Errors
/// Returns [`GeminiError::ExecutableNotFound`] if `gemini` is not on `$PATH`.
pub fn resolve_gemini_binary() -> Result<String, GeminiError> {
    which::which("gemini")
        .map(|_| "gemini".to_string())
        .map_err(|_| GeminiError::ExecutableNotFound)
}
