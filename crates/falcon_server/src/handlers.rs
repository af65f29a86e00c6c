//! HTTP request handlers.

use axum::{
    Router,
    routing::{get, post},
};

pub mod health;
pub mod sse;
pub mod tools;

use crate::state::AppState;

/// Build all routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(health::service_info))
        .route("/health", get(health::liveness))
        .route("/ready", get(health::readiness))
        .route("/mcp/v1/tools", get(tools::list_tools))
        .route("/mcp/v1/tools/:tool_name", post(tools::execute_tool))
        .route("/sse", get(sse::event_stream))
}
