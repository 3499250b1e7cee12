//! The minimal JSON-RPC-over-NDJSON client shared by the Qwen and Gemini
//! adapters (spec.md §4.6.4), grounded on the Python original's `_ACPClient`
//! (`original_source/.../qwen_cli.py`, re-imported unchanged by
//! `gemini_cli.py`).
//!
//! A single client instance is process-global per provider: it owns one
//! long-lived subprocess, serializes writes, and pumps a single-threaded
//! reader loop that never blocks on a handler (design notes, spec.md §9).

use crate::error::AcpError;
use futures::future::BoxFuture;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::process::Stdio;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin};
use tokio::sync::{mpsc, oneshot, Mutex, RwLock};

/// Handler for a server→client *request*: must produce a JSON-RPC result or
/// error object.
pub type RequestHandler =
    Arc<dyn Fn(Value) -> BoxFuture<'static, Result<Value, Value>> + Send + Sync>;

/// Handler for a server→client *notification*: fire-and-forget. Registered
/// handlers push onto a bounded queue rather than doing work inline, so the
/// reader loop is never blocked by a slow consumer.
pub type NotificationSink = mpsc::Sender<Value>;

const NOTIFICATION_QUEUE_CAPACITY: usize = 256;

struct Inner {
    child: Mutex<Child>,
    stdin: Mutex<ChildStdin>,
    next_id: AtomicU64,
    pending: Mutex<HashMap<u64, oneshot::Sender<Result<Value, AcpError>>>>,
    request_handlers: RwLock<HashMap<String, RequestHandler>>,
    notification_sinks: RwLock<HashMap<String, NotificationSink>>,
    reader_task: Mutex<Option<tokio::task::JoinHandle<()>>>,
}

/// A connected ACP subprocess. Cheap to clone; clones share the same
/// underlying process and dispatch tables.
#[derive(Clone)]
pub struct AcpClient {
    inner: Arc<Inner>,
}

impl AcpClient {
    /// Spawns `program` with `args` and `envs`, and starts the reader loop.
    ///
    /// # Errors
    /// Returns [`AcpError::SpawnFailed`] if the process cannot be spawned or
    /// its stdio pipes are unavailable.
    pub async fn spawn(
        program: &str,
        args: &[&str],
        envs: &[(&str, &str)],
    ) -> Result<Self, AcpError> {
        let mut cmd = tokio::process::Command::new(program);
        cmd.args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        for (k, v) in envs {
            cmd.env(k, v);
        }

        let mut child = cmd.spawn().map_err(|e| AcpError::SpawnFailed {
            stage: "spawn".to_string(),
            source: e,
        })?;

        let stdin = child.stdin.take().ok_or_else(|| AcpError::SpawnFailed {
            stage: "stdin".to_string(),
            source: std::io::Error::other("child stdin unavailable"),
        })?;
        let stdout = child.stdout.take().ok_or_else(|| AcpError::SpawnFailed {
            stage: "stdout".to_string(),
            source: std::io::Error::other("child stdout unavailable"),
        })?;
        let stderr = child.stderr.take();

        let inner = Arc::new(Inner {
            child: Mutex::new(child),
            stdin: Mutex::new(stdin),
            next_id: AtomicU64::new(1),
            pending: Mutex::new(HashMap::new()),
            request_handlers: RwLock::new(HashMap::new()),
            notification_sinks: RwLock::new(HashMap::new()),
            reader_task: Mutex::new(None),
        });

        let reader_inner = inner.clone();
        let reader = tokio::spawn(async move {
            read_loop(reader_inner, stdout).await;
        });
        *inner.reader_task.lock().await = Some(reader);

        if let Some(stderr) = stderr {
            tokio::spawn(drain_stderr(stderr));
        }

        Ok(Self { inner })
    }

    /// Registers the handler invoked for server→client requests named
    /// `method`. Replaces any previously registered handler.
    pub async fn on_request<F>(&self, method: impl Into<String>, handler: F)
    where
        F: Fn(Value) -> BoxFuture<'static, Result<Value, Value>> + Send + Sync + 'static,
    {
        self.inner
            .request_handlers
            .write()
            .await
            .insert(method.into(), Arc::new(handler));
    }

    /// Registers a bounded queue that receives every notification named
    /// `method`. Returns the receiving half.
    pub async fn on_notification(&self, method: impl Into<String>) -> mpsc::Receiver<Value> {
        let (tx, rx) = mpsc::channel(NOTIFICATION_QUEUE_CAPACITY);
        self.inner.notification_sinks.write().await.insert(method.into(), tx);
        rx
    }

    /// Sends a JSON-RPC request and awaits its response.
    ///
    /// # Errors
    /// Returns [`AcpError::JsonRpc`] if the peer replies with an error
    /// object, or [`AcpError::ConnectionClosed`] if the process exits
    /// before replying.
    pub async fn request(&self, method: &str, params: Value) -> Result<Value, AcpError> {
        let id = self.inner.next_id.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = oneshot::channel();
        self.inner.pending.lock().await.insert(id, tx);

        let envelope = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });
        self.write_line(&envelope).await?;

        rx.await.map_err(|_| AcpError::ConnectionClosed)?
    }

    async fn write_line(&self, value: &Value) -> Result<(), AcpError> {
        let mut line = serde_json::to_string(value)
            .map_err(|e| AcpError::MalformedMessage(e.to_string()))?;
        line.push('\n');
        let mut stdin = self.inner.stdin.lock().await;
        stdin.write_all(line.as_bytes()).await.map_err(AcpError::Write)?;
        stdin.flush().await.map_err(AcpError::Write)
    }

    async fn send_response(&self, id: Value, result: Result<Value, Value>) {
        let envelope = match result {
            Ok(value) => json!({"jsonrpc": "2.0", "id": id, "result": value}),
            Err(error) => json!({"jsonrpc": "2.0", "id": id, "error": error}),
        };
        if let Err(e) = self.write_line(&envelope).await {
            tracing::warn!(error = %e, "failed to write ACP response");
        }
    }

    /// Terminates the subprocess and aborts the reader loop.
    pub async fn shutdown(&self) {
        if let Some(task) = self.inner.reader_task.lock().await.take() {
            task.abort();
        }
        let _ = self.inner.child.lock().await.kill().await;
    }
}

async fn read_loop(inner: Arc<Inner>, stdout: tokio::process::ChildStdout) {
    let mut lines = BufReader::new(stdout).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => dispatch_line(&inner, &line).await,
            Ok(None) | Err(_) => break,
        }
    }

    // Process ended: fail every still-pending request rather than hanging
    // callers forever.
    let mut pending = inner.pending.lock().await;
    for (_, tx) in pending.drain() {
        let _ = tx.send(Err(AcpError::ConnectionClosed));
    }
}

async fn dispatch_line(inner: &Arc<Inner>, line: &str) {
    let Ok(value) = serde_json::from_str::<Value>(line) else {
        tracing::warn!(line, "malformed ACP line, ignoring");
        return;
    };

    let id = value.get("id").cloned();
    let method = value.get("method").and_then(Value::as_str).map(str::to_string);

    match (id, method) {
        (Some(id), Some(method)) => {
            // Server→client request: must be answered.
            let params = value.get("params").cloned().unwrap_or(Value::Null);
            let handler = inner.request_handlers.read().await.get(&method).cloned();
            let client = AcpClient { inner: inner.clone() };
            tokio::spawn(async move {
                let result = match handler {
                    Some(h) => h(params).await,
                    None => Err(json!({"code": -32601, "message": "method not found"})),
                };
                client.send_response(id, result).await;
            });
        }
        (Some(id), None) => {
            // Response to one of our requests.
            let Some(id) = id.as_u64() else { return };
            if let Some(tx) = inner.pending.lock().await.remove(&id) {
                let resolved = if let Some(error) = value.get("error") {
                    Err(AcpError::JsonRpc {
                        code: error.get("code").and_then(Value::as_i64).unwrap_or(0),
                        message: error
                            .get("message")
                            .and_then(Value::as_str)
                            .unwrap_or("unknown error")
                            .to_string(),
                        data: error.get("data").cloned(),
                    })
                } else {
                    Ok(value.get("result").cloned().unwrap_or(Value::Null))
                };
                let _ = tx.send(resolved);
            }
        }
        (None, Some(method)) => {
            // Notification.
            let params = value.get("params").cloned().unwrap_or(Value::Null);
            let sinks = inner.notification_sinks.read().await;
            if let Some(tx) = sinks.get(&method) {
                if tx.try_send(params).is_err() {
                    tracing::warn!(method, "ACP notification queue full, dropping message");
                }
            }
        }
        (None, None) => {
            tracing::warn!(line, "ACP line is neither a request, response, nor notification");
        }
    }
}

async fn drain_stderr(stderr: tokio::process::ChildStderr) {
    let mut lines = BufReader::new(stderr).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        tracing::debug!(target: "acp_client::stderr", "{line}");
    }
}
