//! Creation of the `AGENTS.md` marker file consulted by the Codex CLI, and
//! the `DISABLE_AGENTS_MD` kill switch (spec.md §4.6.3, §6.5).

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

fn agents_md_disabled() -> bool {
    matches!(
        std::env::var("DISABLE_AGENTS_MD").as_deref(),
        Ok("1" | "true" | "yes" | "on")
    )
}

/// Writes `AGENTS.md` at the repo root if it does not already exist, unless
/// disabled via `DISABLE_AGENTS_MD`.
pub async fn ensure_agents_md(repo_cwd: &Path, system_prompt: Option<&str>) {
    if agents_md_disabled() {
        tracing::debug!("AGENTS.md auto-creation disabled by env");
        return;
    }

    let md_path = repo_cwd.join("AGENTS.md");
    if md_path.exists() {
        tracing::debug!(path = %md_path.display(), "AGENTS.md already exists");
        return;
    }

    let Some(prompt) = system_prompt else {
        tracing::debug!("no system prompt configured; skipping AGENTS.md creation");
        return;
    };

    match tokio::fs::write(&md_path, prompt).await {
        Ok(()) => tracing::info!(path = %md_path.display(), "created AGENTS.md"),
        Err(e) => {
            tracing::warn!(path = %md_path.display(), error = %e, "failed to write AGENTS.md");
        }
    }
}
