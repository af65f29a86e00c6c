//! Server error types.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use falcon_core::FalconError;
use serde_json::json;

pub type ServerResult<T> = Result<T, ServerError>;

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Core error: {0}")]
    Core(#[from] FalconError),

    #[error("Invalid address: {0}")]
    AddrParse(#[from] std::net::AddrParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ServerError::Core(FalconError::NotInitialized) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "Server not initialized".to_string(),
            ),
            ServerError::Core(error) => {
                tracing::error!(%error, "Request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, error.to_string())
            }
            _ => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            ),
        };

        let body = Json(json!({
            "success": false,
            "error": message,
            "status_code": status.as_u16(),
        }));
        (status, body).into_response()
    }
}
