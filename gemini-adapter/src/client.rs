//! The process-global shared ACP client. Gemini registers fewer
//! client-side request handlers than Qwen: permission auto-approval and
//! conservative filesystem no-ops only, no `edit`/`str_replace_editor`
//! handlers (spec.md §4.6.4, the Qwen/Gemini asymmetry).

use crate::discovery::resolve_gemini_binary;
use crate::error::GeminiError;
use acp_client::AcpClient;
use futures::future::BoxFuture;
use serde_json::{json, Value};
use tokio::sync::OnceCell;

static SHARED_CLIENT: OnceCell<AcpClient> = OnceCell::const_new();

type HandlerResult = Result<Value, Value>;

/// Returns the shared Gemini ACP client, spawning and initializing it on
/// first use.
pub async fn shared_client() -> Result<AcpClient, GeminiError> {
    let client = SHARED_CLIENT
        .get_or_try_init(|| async {
            let binary = resolve_gemini_binary()?;
            let client = AcpClient::spawn(&binary, &["--experimental-acp"], &[("NO_BROWSER", "1")])
                .await
                .map_err(GeminiError::Acp)?;

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
                .map_err(GeminiError::Acp)?;

            tracing::info!(%binary, "Gemini ACP client initialized");
            Ok::<_, GeminiError>(client)
        })
        .await?;
    Ok(client.clone())
}

async fn register_handlers(client: &AcpClient) {
    client
        .on_request("session/request_permission", |params| {
            Box::pin(async move { Ok::<Value, Value>(handle_permission(&params)) }) as BoxFuture<'static, HandlerResult>
        })
        .await;
    client
        .on_request("fs/read_text_file", |_params| {
            Box::pin(async move { Ok::<Value, Value>(json!({"content": ""})) }) as BoxFuture<'static, HandlerResult>
        })
        .await;
    client
        .on_request("fs/write_text_file", |_params| {
            Box::pin(async move { Ok::<Value, Value>(json!({})) }) as BoxFuture<'static, HandlerResult>
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
