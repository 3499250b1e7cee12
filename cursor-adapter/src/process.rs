//! Subprocess lifecycle for a `cursor-agent` turn: the instruction is
//! passed as a CLI argument and the process streams NDJSON on stdout
//! until it emits a terminal `result` event (spec.md §4.6.2, §6.3).

use crate::cmd::{build_args, RunConfig};
use crate::error::CursorError;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader, Lines};
use tokio::process::{Child, ChildStdout, Command};
use tokio::time::timeout;

const GRACE_PERIOD: Duration = Duration::from_secs(5);

/// A running `cursor-agent` subprocess with line-oriented stdout.
pub struct CursorProcess {
    child: Child,
    lines: Lines<BufReader<ChildStdout>>,
    pid: u32,
}

impl CursorProcess {
    /// Spawns `cursor-agent --force -p <instruction> --output-format
    /// stream-json ...` with piped stdout.
    ///
    /// # Errors
    /// Returns a [`CursorError`] if the binary cannot be spawned or its
    /// stdout handle is unavailable.
    pub fn spawn(
        binary: &Path,
        cwd: &Path,
        instruction: &str,
        config: &RunConfig,
    ) -> Result<Self, CursorError> {
        let args = build_args(instruction, config);
        let mut child = Command::new(binary)
            .args(&args)
            .current_dir(cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(CursorError::SpawnFailed)?;

        let stdout = child.stdout.take().ok_or(CursorError::NoStdout)?;
        let pid = child.id().ok_or(CursorError::NoStdout)?;
        let lines = BufReader::new(stdout).lines();

        Ok(Self { child, lines, pid })
    }

    /// Reads the next non-empty raw line. Returns `Ok(None)` at EOF.
    ///
    /// Unlike the Codex wire protocol, malformed lines are handed back to
    /// the caller as `Ok(Some(line))` rather than skipped: spec.md requires
    /// each one to surface as a raw `kind=chat` event with `parse_error`
    /// metadata, never to be silently dropped.
    pub async fn next_line(&mut self) -> Result<Option<String>, CursorError> {
        loop {
            let Some(line) = self.lines.next_line().await.map_err(CursorError::SpawnFailed)?
            else {
                return Ok(None);
            };
            if line.trim().is_empty() {
                continue;
            }
            return Ok(Some(line));
        }
    }

    #[must_use]
    pub fn pid(&self) -> u32 {
        self.pid
    }

    /// Terminates the process after a terminal `result` event, escalating
    /// to `SIGKILL` if it does not exit promptly.
    pub async fn terminate(mut self) {
        graceful_terminate(&mut self.child, self.pid).await;
    }
}

#[cfg(unix)]
async fn graceful_terminate(child: &mut Child, pid: u32) {
    use nix::sys::signal::{self, Signal};
    use nix::unistd::Pid;

    if let Ok(raw_pid) = i32::try_from(pid) {
        let _ = signal::kill(Pid::from_raw(raw_pid), Signal::SIGTERM);
    }

    if timeout(GRACE_PERIOD, child.wait()).await.is_err() {
        let _ = child.kill().await;
        let _ = child.wait().await;
    }
}

#[cfg(windows)]
async fn graceful_terminate(child: &mut Child, _pid: u32) {
    let _ = child.kill().await;
    let _ = child.wait().await;
}
