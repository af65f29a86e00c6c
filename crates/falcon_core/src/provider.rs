//! Session provider abstraction.
//!
//! A provider owns exactly one authenticated session against the Falcon
//! cloud: it acquires the OAuth2 token, tracks expiry, re-authenticates on
//! demand, and hands out resource-scoped call handles. Tool modules only
//! ever talk to the remote API through these traits, which keeps the
//! dispatch layer testable against an in-memory double.

pub mod falcon;
pub mod mock;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

use crate::error::Result;

/// Seconds subtracted from the server-reported TTL so a token is refreshed
/// before it actually lapses.
pub const TOKEN_EXPIRY_BUFFER_SECS: i64 = 300;

/// Raw `(status_code, body)` pair from one remote call. The wire format is
/// opaque to the core; tool modules branch on the status code and reshape
/// the body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse {
    pub status_code: u16,
    #[serde(default)]
    pub body: ApiBody,
}

/// The body shape shared by every Falcon endpoint we call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApiBody {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resources: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<Value>,
}

impl ApiResponse {
    /// `body.resources` as a list, empty when absent or not an array.
    pub fn resources(&self) -> Vec<Value> {
        match &self.body.resources {
            Some(Value::Array(items)) => items.clone(),
            _ => Vec::new(),
        }
    }

    /// `body.meta.pagination.total`, falling back to the resource count.
    pub fn pagination_total(&self) -> u64 {
        self.body
            .meta
            .as_ref()
            .and_then(|meta| meta.pointer("/pagination/total"))
            .and_then(Value::as_u64)
            .unwrap_or_else(|| self.resources().len() as u64)
    }

    /// Remote error text, verbatim. Mirrors the raw `errors` value so the
    /// caller sees exactly what the API reported.
    pub fn error_message(&self) -> String {
        match &self.body.errors {
            Some(errors) => errors.to_string(),
            None => "Unknown error".to_string(),
        }
    }
}

/// Common pagination/filter parameters for query endpoints. Absent optional
/// filters are omitted from the outgoing request, never sent as nulls.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryParams {
    pub filter: Option<String>,
    pub limit: u64,
    pub offset: u64,
    pub sort: Option<String>,
}

impl Default for QueryParams {
    fn default() -> Self {
        Self {
            filter: None,
            limit: 100,
            offset: 0,
            sort: None,
        }
    }
}

/// Host (device) operations.
#[async_trait]
pub trait HostsApi: Send + Sync {
    async fn query_devices_by_filter(&self, params: QueryParams) -> Result<ApiResponse>;
    async fn get_device_details(&self, ids: Vec<String>) -> Result<ApiResponse>;
    /// `action_name` is "contain" or "lift_containment".
    async fn perform_action(&self, action_name: &str, ids: Vec<String>) -> Result<ApiResponse>;
}

/// Detection operations.
#[async_trait]
pub trait DetectsApi: Send + Sync {
    async fn query_detects(&self, params: QueryParams) -> Result<ApiResponse>;
    async fn get_detect_summaries(&self, ids: Vec<String>) -> Result<ApiResponse>;
    async fn update_detects_by_ids(
        &self,
        ids: Vec<String>,
        status: &str,
        comment: Option<String>,
    ) -> Result<ApiResponse>;
}

/// Incident operations.
#[async_trait]
pub trait IncidentsApi: Send + Sync {
    async fn query_incidents(&self, params: QueryParams) -> Result<ApiResponse>;
    async fn get_incidents(&self, ids: Vec<String>) -> Result<ApiResponse>;
}

/// The session lifecycle contract.
///
/// Implementations must serialize `initialize`/`shutdown`/
/// `refresh_token_if_needed` against each other: a torn half-initialized
/// session is the primary correctness hazard here. The resource accessors
/// fail with [`crate::FalconError::NotInitialized`] until a session exists.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Authenticate and build the resource handles. Calling this on an
    /// already-ready provider is a warned no-op; no second auth exchange
    /// is issued.
    async fn initialize(&self) -> Result<()>;

    /// Best-effort token revoke, then clear all session state. Idempotent.
    async fn shutdown(&self) -> Result<()>;

    /// When the token has reached its (buffered) expiry, run a full
    /// shutdown + initialize cycle. Every dispatch path calls this before
    /// its remote call.
    async fn refresh_token_if_needed(&self) -> Result<()>;

    /// `true` only when a session exists and one cheap read-only call
    /// returns 200. Never errors.
    async fn health_check(&self) -> bool;

    fn hosts(&self) -> Result<Arc<dyn HostsApi>>;
    fn detects(&self) -> Result<Arc<dyn DetectsApi>>;
    fn incidents(&self) -> Result<Arc<dyn IncidentsApi>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn response(body: Value) -> ApiResponse {
        ApiResponse {
            status_code: 200,
            body: serde_json::from_value(body).unwrap(),
        }
    }

    #[test]
    fn resources_default_to_empty() {
        let resp = response(json!({}));
        assert!(resp.resources().is_empty());
        assert_eq!(resp.pagination_total(), 0);
    }

    #[test]
    fn pagination_total_prefers_meta() {
        let resp = response(json!({
            "resources": ["d1", "d2"],
            "meta": {"pagination": {"total": 40}},
        }));
        assert_eq!(resp.pagination_total(), 40);
    }

    #[test]
    fn pagination_total_falls_back_to_resource_count() {
        let resp = response(json!({"resources": ["d1", "d2", "d3"]}));
        assert_eq!(resp.pagination_total(), 3);
    }

    #[test]
    fn error_message_passes_through_raw_errors() {
        let resp = response(json!({
            "errors": [{"code": 403, "message": "access denied"}],
        }));
        assert!(resp.error_message().contains("access denied"));

        let resp = response(json!({}));
        assert_eq!(resp.error_message(), "Unknown error");
    }
}
