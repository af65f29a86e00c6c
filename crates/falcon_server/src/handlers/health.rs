//! Service info and health endpoints.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use serde_json::{Value, json};

use crate::state::AppState;

pub async fn service_info(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "service": "falcon-mcp-server",
        "version": env!("CARGO_PKG_VERSION"),
        "environment": state.server.settings().environment.as_str(),
        "endpoints": {
            "tools": "/mcp/v1/tools",
            "execute": "/mcp/v1/tools/{tool_name}",
            "events": "/sse",
            "health": "/health",
            "ready": "/ready",
        },
    }))
}

/// Liveness: the process is up. Does not touch the remote API.
pub async fn liveness() -> Json<Value> {
    Json(json!({ "status": "healthy" }))
}

/// Readiness: the provider session is open and the remote API reachable.
pub async fn readiness(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    if state.server.health_check().await {
        (StatusCode::OK, Json(json!({ "status": "ready" })))
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "status": "not_ready" })),
        )
    }
}
