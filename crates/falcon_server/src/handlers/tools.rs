//! Tool discovery and execution endpoints.
//!
//! Execution relays the tool's envelope verbatim: validation failures and
//! remote API errors come back as `success: false` envelopes with HTTP 200,
//! matching what an in-process MCP client would see.

use axum::Json;
use axum::extract::{Path, State};
use falcon_core::Envelope;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::error::ServerResult;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ExecuteToolRequest {
    #[serde(default = "empty_arguments")]
    pub arguments: Value,
}

fn empty_arguments() -> Value {
    json!({})
}

pub async fn list_tools(State(state): State<AppState>) -> ServerResult<Json<Value>> {
    let tools = state.server.get_tools().await?;
    Ok(Json(json!({
        "count": tools.len(),
        "tools": tools,
    })))
}

pub async fn execute_tool(
    State(state): State<AppState>,
    Path(tool_name): Path<String>,
    Json(request): Json<ExecuteToolRequest>,
) -> ServerResult<Json<Envelope>> {
    tracing::info!(tool_name = %tool_name, "Tool invocation received");
    let envelope = state
        .server
        .execute_tool(&tool_name, request.arguments)
        .await?;
    Ok(Json(envelope))
}
