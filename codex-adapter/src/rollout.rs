//! Discovery of Codex's on-disk rollout files, used for `experimental_resume`
//! (spec.md §6.4, §9).

use std::path::PathBuf;
use std::time::SystemTime;

/// Finds the most recently modified `rollout-*.jsonl` file under
/// `~/.codex/sessions`, searched recursively (Codex nests sessions by
/// date). Returns `None` if the sessions directory or no rollout files
/// exist.
#[must_use]
pub fn find_latest_rollout() -> Option<PathBuf> {
    let root = dirs::home_dir()?.join(".codex").join("sessions");
    if !root.is_dir() {
        return None;
    }

    let mut latest: Option<(SystemTime, PathBuf)> = None;
    walk(&root, &mut latest);
    latest.map(|(_, path)| path)
}

fn walk(dir: &std::path::Path, latest: &mut Option<(SystemTime, PathBuf)>) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            walk(&path, latest);
            continue;
        }
        let is_rollout = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.starts_with("rollout-") && n.ends_with(".jsonl"));
        if !is_rollout {
            continue;
        }
        let Ok(metadata) = entry.metadata() else {
            continue;
        };
        let Ok(modified) = metadata.modified() else {
            continue;
        };
        let is_newer = latest.as_ref().map_or(true, |(t, _)| modified > *t);
        if is_newer {
            *latest = Some((modified, path));
        }
    }
}
