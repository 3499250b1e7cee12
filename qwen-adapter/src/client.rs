//! The process-global shared ACP client (spec.md §4.6.4's "shared client
//! `Uninitialized→Initialized`" state machine), plus the client-side request
//! handlers Qwen registers: permission auto-approval and the permissive
//! filesystem/edit no-ops.

use crate::discovery::resolve_qwen_binary;
use crate::error::QwenError;
use acp_client::AcpClient;
use serde_json::{json, Value};
use tokio::sync::OnceCell;

static SHARED_CLIENT: OnceCell<AcpClient> = OnceCell::const_new();

/// Returns the shared Qwen ACP client, spawning and initializing it on
/// first use. Every subsequent call (across however many `QwenAdapter`
/// instances exist) reuses the same subprocess, preserving sessions the way
/// the original adapter's class-level `_SHARED_CLIENT` did.
pub async fn shared_client(auth_method: &str) -> Result<AcpClient, QwenError> {
    let client = SHARED_CLIENT
        .get_or_try_init(|| async {
            let binary = resolve_qwen_binary()?;
            let client = AcpClient::spawn(&binary, &["--experimental-acp"], &[("NO_BROWSER", "1")])
                .await
                .map_err(QwenError::Acp)?;

            register_handlers(&client).await;

            client
                .request(
                    "initialize",
                    json!({
                        "clientCapabilities": {"fs": {"readTextFile": false, "writeTextFile": false}},
                        "protocolVersion": 1,
                    }),
                )
                .await
                .map_err(QwenError::Acp)?;

            tracing::info!(%binary, auth_method, "Qwen ACP client initialized");
            Ok::<_, QwenError>(client)
        })
        .await?;
    Ok(client.clone())
}

type HandlerResult = Result<Value, Value>;

async fn register_handlers(client: &AcpClient) {
    client
        .on_request("session/request_permission", |params| {
            Box::pin(async move { Ok::<Value, Value>(handle_permission(&params)) }) as futures::future::BoxFuture<'static, HandlerResult>
        })
        .await;
    client
        .on_request("fs/read_text_file", |_params| {
            Box::pin(async move { Ok::<Value, Value>(json!({"content": ""})) }) as futures::future::BoxFuture<'static, HandlerResult>
        })
        .await;
    client
        .on_request("fs/write_text_file", |params| {
            Box::pin(async move { Ok::<Value, Value>(handle_edit(&params)) }) as futures::future::BoxFuture<'static, HandlerResult>
        })
        .await;
    client
        .on_request("edit", |params| {
            Box::pin(async move { Ok::<Value, Value>(handle_edit(&params)) }) as futures::future::BoxFuture<'static, HandlerResult>
        })
        .await;
    client
        .on_request("str_replace_editor", |params| {
            Box::pin(async move { Ok::<Value, Value>(handle_edit(&params)) }) as futures::future::BoxFuture<'static, HandlerResult>
        })
        .await;
}

/// Auto-approves permission requests: prefers `allow_always`, then
/// `allow_once`, else the first offered option, else cancels.
fn handle_permission(params: &Value) -> Value {
    let options = params.get("options").and_then(Value::as_array);
    let chosen = options.and_then(|opts| {
        ["allow_always", "allow_once"]
            .iter()
            .find_map(|kind| opts.iter().find(|o| o.get("kind").and_then(Value::as_str) == Some(*kind)))
            .or_else(|| opts.first())
    });

    chosen.map_or_else(
        || json!({"outcome": {"outcome": "cancelled"}}),
        |o| json!({"outcome": {"outcome": "selected", "optionId": o.get("optionId")}}),
    )
}

/// Not wired to an actual filesystem edit (not implemented for safety, as
/// in the original): always reports success so Qwen's workflow is never
/// blocked on a malformed edit request.
fn handle_edit(params: &Value) -> Value {
    let path = params
        .get("path")
        .or_else(|| params.get("file_path"))
        .and_then(Value::as_str)
        .unwrap_or("unknown");
    if params.get("old_string").is_none() {
        tracing::warn!(path, "Qwen edit missing 'old_string' parameter");
    }
    json!({"success": true})
}
