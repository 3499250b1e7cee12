//! Creation of the `GEMINI.md` marker file consulted by the Gemini CLI on
//! startup.

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

/// Writes `GEMINI.md` at the repo root if it does not already exist.
pub async fn ensure_gemini_md(repo_cwd: &Path, system_prompt: Option<&str>) {
    let md_path = repo_cwd.join("GEMINI.md");
    if md_path.exists() {
        tracing::debug!(path = %md_path.display(), "GEMINI.md already exists");
        return;
    }

    let mut content = String::from("# GEMINI\n\n");
    if let Some(prompt) = system_prompt {
        content.push_str(prompt);
    }

    match tokio::fs::write(&md_path, content).await {
        Ok(()) => tracing::info!(path = %md_path.display(), "created GEMINI.md"),
        Err(e) => {
            tracing::warn!(path = %md_path.display(), error = %e, "failed to write GEMINI.md");
        }
    }
}
