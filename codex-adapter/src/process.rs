//! Subprocess lifecycle for a `codex proto` session: line-delimited JSON in
//! both directions over stdio (spec.md §4.6.3, §6.3).

use crate::error::CodexError;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::time::timeout;

const GRACE_PERIOD: Duration = Duration::from_secs(5);

/// A running `codex proto` subprocess with line-oriented stdio.
pub struct CodexProcess {
    child: Child,
    stdin: ChildStdin,
    lines: Lines<BufReader<ChildStdout>>,
    pid: u32,
}

impl CodexProcess {
    /// Spawns `codex --cd <workdir_abs> proto ...` with piped stdio.
    ///
    /// # Errors
    /// Returns a [`CodexError`] if the binary cannot be spawned or its
    /// stdio handles are unavailable.
    pub fn spawn(
        binary: &Path,
        workdir_abs: &Path,
        resume_path: Option<&Path>,
    ) -> Result<Self, CodexError> {
        let args = crate::cmd::build_args(workdir_abs, resume_path);
        let mut child = Command::new(binary)
            .args(&args)
            .current_dir(workdir_abs)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| CodexError::SpawnFailed {
                stage: "spawn".to_string(),
                source: e,
            })?;

        let stdin = child.stdin.take().ok_or(CodexError::NoStdin)?;
        let stdout = child.stdout.take().ok_or(CodexError::NoStdout)?;
        let pid = child.id().ok_or(CodexError::NoPid)?;
        let lines = BufReader::new(stdout).lines();

        Ok(Self {
            child,
            stdin,
            lines,
            pid,
        })
    }

    /// Writes one JSON value as a line to the subprocess's stdin.
    pub async fn write_line(&mut self, value: &serde_json::Value) -> Result<(), CodexError> {
        let mut line = serde_json::to_vec(value).unwrap_or_default();
        line.push(b'\n');
        self.stdin.write_all(&line).await.map_err(CodexError::Write)?;
        self.stdin.flush().await.map_err(CodexError::Write)
    }

    /// Reads the next non-empty line, parsed as JSON. Returns `Ok(None)` at
    /// EOF; a malformed line is skipped rather than surfaced as an error,
    /// matching the original's per-line `json.JSONDecodeError` handling.
    pub async fn next_event(&mut self) -> Result<Option<serde_json::Value>, CodexError> {
        loop {
            let Some(line) = self
                .lines
                .next_line()
                .await
                .map_err(|e| CodexError::SpawnFailed {
                    stage: "read".to_string(),
                    source: e,
                })?
            else {
                return Ok(None);
            };
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str(&line) {
                Ok(value) => return Ok(Some(value)),
                Err(e) => {
                    tracing::debug!(error = %e, "skipping malformed Codex proto line");
                    continue;
                }
            }
        }
    }

    #[must_use]
    pub fn pid(&self) -> u32 {
        self.pid
    }

    /// Sends `{op: shutdown}`, closes stdin, and waits for exit, escalating
    /// to `SIGTERM`/`SIGKILL` if the process does not exit promptly.
    pub async fn shutdown(mut self) {
        let shutdown = serde_json::json!({"id": "shutdown", "op": {"type": "shutdown"}});
        if let Err(e) = self.write_line(&shutdown).await {
            tracing::debug!(error = %e, "failed to send shutdown op");
        }
        drop(self.stdin);

        if timeout(GRACE_PERIOD, self.child.wait()).await.is_err() {
            let _ = graceful_kill(&mut self.child, self.pid).await;
        }
    }
}

#[cfg(unix)]
async fn graceful_kill(child: &mut Child, pid: u32) -> Result<(), CodexError> {
    use nix::sys::signal::{self, Signal};
    use nix::unistd::Pid;

    let raw_pid = i32::try_from(pid).map_err(|_| CodexError::SignalFailed {
        signal: "SIGTERM".to_string(),
        pid,
        reason: "PID value exceeds i32::MAX".to_string(),
    })?;
    let _ = signal::kill(Pid::from_raw(raw_pid), Signal::SIGTERM);

    if timeout(GRACE_PERIOD, child.wait()).await.is_err() {
        let _ = child.kill().await;
        let _ = child.wait().await;
    }
    Ok(())
}

#[cfg(windows)]
async fn graceful_kill(child: &mut Child, _pid: u32) -> Result<(), CodexError> {
    let _ = child.kill().await;
    let _ = child.wait().await;
    Ok(())
}
