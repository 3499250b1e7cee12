//! Creation of the `QWEN.md` marker file consulted by the Qwen CLI on
//! startup, mirroring the Cursor/Codex adapters' `AGENTS.md` handling.

use std::path::{Path, PathBuf};

/// Resolves the working directory for a turn: `<project_path>/repo` if that
/// subdirectory exists, else `project_path` itself.
#[must_use]
pub fn resolve_repo_cwd(project_path: &Path) -> PathBuf {
    let repo = project_path.join("repo");
    if repo.is_dir() {
        repo
    } else {
        project_path.to_path_buf()
    }
}

/// Writes `QWEN.md` at the repo root if it does not already exist.
/// `system_prompt` is the caller-supplied system-prompt content (loaded the
/// same way the Claude adapter loads its system prompt); when `None`, only
/// the bare `# QWEN` header is written.
///
/// Failures are logged and swallowed: a missing marker file degrades the
/// session rather than failing the turn.
pub async fn ensure_qwen_md(repo_cwd: &Path, system_prompt: Option<&str>) {
    let md_path = repo_cwd.join("QWEN.md");
    if md_path.exists() {
        tracing::debug!(path = %md_path.display(), "QWEN.md already exists");
        return;
    }

    let mut content = String::from("# QWEN\n\n");
    if let Some(prompt) = system_prompt {
        content.push_str(prompt);
    }

    match tokio::fs::write(&md_path, content).await {
        Ok(()) => tracing::info!(path = %md_path.display(), "created QWEN.md"),
        Err(e) => tracing::warn!(path = %md_path.display(), error = %e, "failed to write QWEN.md"),
    }
}
