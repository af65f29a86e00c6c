//! Uniform result envelope for tool invocations.
//!
//! Every tool call produces exactly one [`Envelope`], whether it succeeded,
//! failed validation, or hit a remote API error. Transports relay the
//! envelope verbatim; callers branch on `success`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// An error message from the remote API can be a single string or a list
/// of strings; both are passed through verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ErrorMessage {
    One(String),
    Many(Vec<String>),
}

impl From<String> for ErrorMessage {
    fn from(value: String) -> Self {
        ErrorMessage::One(value)
    }
}

impl From<&str> for ErrorMessage {
    fn from(value: &str) -> Self {
        ErrorMessage::One(value.to_string())
    }
}

impl From<Vec<String>> for ErrorMessage {
    fn from(value: Vec<String>) -> Self {
        ErrorMessage::Many(value)
    }
}

/// The uniform success/error wrapper returned by every tool invocation.
///
/// Invariant: exactly one of `data` (success) or `error` (failure) is
/// present, never both, never neither.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl Envelope {
    /// A success envelope carrying `data`.
    pub fn success(data: Value) -> Self {
        Self {
            success: true,
            data: Some(data),
            metadata: None,
            error: None,
            tool: None,
            status_code: None,
            details: None,
        }
    }

    /// A success envelope with additional metadata (pagination, counts).
    pub fn success_with_metadata(data: Value, metadata: Value) -> Self {
        Self {
            metadata: Some(metadata),
            ..Self::success(data)
        }
    }

    /// A bare error envelope.
    pub fn error(error: impl Into<ErrorMessage>) -> Self {
        Self {
            success: false,
            data: None,
            metadata: None,
            error: Some(error.into()),
            tool: None,
            status_code: None,
            details: None,
        }
    }

    /// An error envelope attributed to a specific tool.
    pub fn error_for_tool(error: impl Into<ErrorMessage>, tool: impl Into<String>) -> Self {
        Self {
            tool: Some(tool.into()),
            ..Self::error(error)
        }
    }

    /// A caller-input validation failure. Never reaches the remote API.
    pub fn validation_error(
        field: impl Into<String>,
        message: impl Into<String>,
        tool: impl Into<String>,
    ) -> Self {
        Self {
            details: Some(serde_json::json!({
                "field": field.into(),
                "message": message.into(),
            })),
            ..Self::error_for_tool("Validation error", tool)
        }
    }

    /// A non-success response from the remote API, passed through with its
    /// original status code and message.
    pub fn api_error(
        api_name: &str,
        status_code: u16,
        message: impl Into<String>,
        tool: impl Into<String>,
    ) -> Self {
        Self {
            status_code: Some(status_code),
            details: Some(serde_json::json!({
                "api": api_name,
                "message": message.into(),
            })),
            ..Self::error_for_tool(format!("{api_name} API error"), tool)
        }
    }

    pub fn with_status_code(mut self, status_code: u16) -> Self {
        self.status_code = Some(status_code);
        self
    }
}
