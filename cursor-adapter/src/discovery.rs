//! Locates the Cursor Agent CLI binary on the host system.

use crate::error::CursorError;
use std::path::PathBuf;
use which::which;

/// Environment variable that overrides the default Cursor Agent binary path.
pub const CURSOR_BIN_ENV_VAR: &str = "CURSOR_ADAPTER_BIN";

/// Locates the Cursor Agent CLI executable.
///
/// Resolution order:
/// 1. `explicit_path` if provided and the file exists.
/// 2. The path in the `CURSOR_ADAPTER_BIN` environment variable.
/// 3. `cursor-agent` resolved via `$PATH`.
/// 4. Common install location fallbacks (platform-specific).
/// 5. Helpful error with install instructions.
///
/// # Errors
///
/// Returns `CursorError::ExecutableNotFound` when no valid executable can be
/// located.
pub fn discover_cursor(explicit_path: Option<PathBuf>) -> Result<PathBuf, CursorError> {
    if let Some(path) = explicit_path {
        if path.exists() {
            return Ok(path);
        }
        return Err(CursorError::ExecutableNotFound(format!(
            "Explicit path does not exist: {}",
            path.display()
        )));
    }

    if let Ok(path_str) = std::env::var(CURSOR_BIN_ENV_VAR) {
        let path = PathBuf::from(path_str);
        if path.exists() {
            return Ok(path);
        }
    }

    if let Ok(path) = which("cursor-agent") {
        return Ok(path);
    }

    for location in fallback_locations() {
        if location.exists() {
            return Ok(location);
        }
    }

    Err(CursorError::ExecutableNotFound(
        "cursor-agent not found. Install: curl https://cursor.com/install -fsS | bash\n\
         Then log in: cursor-agent login\n\
         Searched: PATH, common install locations."
            .to_string(),
    ))
}

#[cfg(unix)]
fn fallback_locations() -> Vec<PathBuf> {
    let mut locations = Vec::new();
    if let Some(home) = dirs::home_dir() {
        locations.push(home.join(".local/bin/cursor-agent"));
        locations.push(home.join(".cursor/bin/cursor-agent"));
    }
    locations.push(PathBuf::from("/usr/local/bin/cursor-agent"));
    locations
}

#[cfg(windows)]
fn fallback_locations() -> Vec<PathBuf> {
    let mut locations = Vec::new();
    if let Some(home) = dirs::home_dir() {
        locations.push(home.join("AppData/Local/cursor-agent/cursor-agent.exe"));
    }
    locations
}
