//! Host (device) management tools, including network containment.

use std::sync::Arc;

use serde_json::{Value, json};

use crate::envelope::Envelope;
use crate::error::Result;
use crate::provider::{Provider, QueryParams};
use crate::tools::{API_NAME, opt_string_arg, string_list_arg, u64_arg};

use super::registry::ToolDescriptor;

/// Descriptors for all host management tools.
pub fn tools() -> Vec<ToolDescriptor> {
    vec![
        ToolDescriptor::new(
            "query_devices_by_filter",
            "Search for hosts using FQL (Falcon Query Language) filters. \
             Supports pagination and sorting. Returns device IDs that can be \
             used with get_device_details.",
            json!({
                "type": "object",
                "properties": {
                    "filter": {
                        "type": "string",
                        "description": "FQL filter expression (e.g., \"platform_name:'Windows'+hostname:'*server*'\"). Leave empty to query all devices.",
                    },
                    "limit": {
                        "type": "integer",
                        "description": "Maximum number of results (1-5000)",
                        "default": 100,
                        "minimum": 1,
                        "maximum": 5000,
                    },
                    "offset": {
                        "type": "integer",
                        "description": "Pagination offset",
                        "default": 0,
                        "minimum": 0,
                    },
                    "sort": {
                        "type": "string",
                        "description": "Sort field and direction (e.g., 'hostname.asc', 'last_seen.desc')",
                    },
                },
            }),
        ),
        ToolDescriptor::new(
            "get_device_details",
            "Get detailed information about specific hosts. \
             Provide device IDs from query_devices_by_filter to retrieve \
             comprehensive host information including OS, IP, status, and more.",
            json!({
                "type": "object",
                "properties": {
                    "device_ids": {
                        "type": "array",
                        "description": "List of device IDs to retrieve",
                        "items": {"type": "string"},
                        "minItems": 1,
                        "maxItems": 5000,
                    },
                },
                "required": ["device_ids"],
            }),
        ),
        ToolDescriptor::new(
            "contain_host",
            "CRITICAL ACTION: Isolate a host from the network (network containment). \
             This prevents the host from communicating on the network except with \
             CrowdStrike cloud. Use this for incident response to prevent lateral \
             movement. This action is logged and audited. Use lift_containment to restore.",
            json!({
                "type": "object",
                "properties": {
                    "device_id": {
                        "type": "string",
                        "description": "Device ID to contain (isolate)",
                    },
                },
                "required": ["device_id"],
            }),
        ),
        ToolDescriptor::new(
            "lift_containment",
            "Remove network isolation from a host. \
             Restores normal network communication after a host has been contained. \
             Use this after incident response is complete.",
            json!({
                "type": "object",
                "properties": {
                    "device_id": {
                        "type": "string",
                        "description": "Device ID to lift containment from",
                    },
                },
                "required": ["device_id"],
            }),
        ),
    ]
}

/// Dispatch a host management tool. Token refresh happens first,
/// unconditionally; per-tool failures come back as error envelopes.
pub async fn execute(
    provider: Arc<dyn Provider>,
    tool_name: String,
    arguments: Value,
) -> Result<Envelope> {
    if let Err(error) = provider.refresh_token_if_needed().await {
        tracing::error!(%error, "Failed to refresh Falcon session");
        return Ok(Envelope::error_for_tool(
            format!("Failed to refresh Falcon session: {error}"),
            &tool_name,
        ));
    }

    let outcome = match tool_name.as_str() {
        "query_devices_by_filter" => query_devices_by_filter(provider.as_ref(), &arguments).await,
        "get_device_details" => get_device_details(provider.as_ref(), &arguments).await,
        "contain_host" => contain_host(provider.as_ref(), &arguments).await,
        "lift_containment" => lift_containment(provider.as_ref(), &arguments).await,
        _ => {
            return Ok(Envelope::error_for_tool(
                format!("Unknown tool: {tool_name}"),
                &tool_name,
            ));
        }
    };

    Ok(outcome.unwrap_or_else(|error| {
        tracing::error!(tool_name = %tool_name, %error, "Host tool failed");
        Envelope::error_for_tool(format!("Failed to execute {tool_name}: {error}"), &tool_name)
    }))
}

async fn query_devices_by_filter(provider: &dyn Provider, arguments: &Value) -> Result<Envelope> {
    let params = QueryParams {
        filter: opt_string_arg(arguments, "filter"),
        limit: u64_arg(arguments, "limit", 100),
        offset: u64_arg(arguments, "offset", 0),
        sort: opt_string_arg(arguments, "sort"),
    };

    tracing::info!(
        filter = ?params.filter,
        limit = params.limit,
        offset = params.offset,
        sort = ?params.sort,
        "Querying devices"
    );

    let response = provider
        .hosts()?
        .query_devices_by_filter(params.clone())
        .await?;

    if response.status_code != 200 {
        return Ok(Envelope::api_error(
            API_NAME,
            response.status_code,
            response.error_message(),
            "query_devices_by_filter",
        ));
    }

    let device_ids = response.resources();
    let total = response.pagination_total();
    tracing::info!(device_count = device_ids.len(), total, "Query completed");

    Ok(Envelope::success_with_metadata(
        json!({ "device_ids": device_ids }),
        json!({
            "total": total,
            "limit": params.limit,
            "offset": params.offset,
        }),
    ))
}

async fn get_device_details(provider: &dyn Provider, arguments: &Value) -> Result<Envelope> {
    let device_ids = string_list_arg(arguments, "device_ids");

    if device_ids.is_empty() {
        return Ok(Envelope::validation_error(
            "device_ids",
            "At least one device ID is required",
            "get_device_details",
        ));
    }

    tracing::info!(device_count = device_ids.len(), "Getting device details");

    let response = provider.hosts()?.get_device_details(device_ids).await?;

    if response.status_code != 200 {
        return Ok(Envelope::api_error(
            API_NAME,
            response.status_code,
            response.error_message(),
            "get_device_details",
        ));
    }

    let devices = response.resources();
    tracing::info!(device_count = devices.len(), "Device details retrieved");

    Ok(Envelope::success_with_metadata(
        json!({ "devices": devices }),
        json!({ "count": devices.len() }),
    ))
}

async fn contain_host(provider: &dyn Provider, arguments: &Value) -> Result<Envelope> {
    let Some(device_id) = opt_string_arg(arguments, "device_id") else {
        return Ok(Envelope::validation_error(
            "device_id",
            "Device ID is required",
            "contain_host",
        ));
    };

    // Audit line, emitted regardless of outcome.
    tracing::warn!(
        device_id = %device_id,
        action = "contain_host",
        severity = "critical",
        "CRITICAL ACTION: Initiating host containment"
    );

    let response = provider
        .hosts()?
        .perform_action("contain", vec![device_id.clone()])
        .await?;

    if !matches!(response.status_code, 200 | 202) {
        tracing::error!(
            device_id = %device_id,
            status_code = response.status_code,
            "Host containment failed"
        );
        return Ok(Envelope::api_error(
            API_NAME,
            response.status_code,
            response.error_message(),
            "contain_host",
        ));
    }

    tracing::warn!(
        device_id = %device_id,
        action = "contain_host",
        status = "success",
        severity = "critical",
        "CRITICAL ACTION: Host containment successful"
    );

    Ok(Envelope::success(json!({
        "device_id": device_id,
        "action": "contained",
        "status": "success",
    })))
}

async fn lift_containment(provider: &dyn Provider, arguments: &Value) -> Result<Envelope> {
    let Some(device_id) = opt_string_arg(arguments, "device_id") else {
        return Ok(Envelope::validation_error(
            "device_id",
            "Device ID is required",
            "lift_containment",
        ));
    };

    tracing::info!(device_id = %device_id, "Lifting host containment");

    let response = provider
        .hosts()?
        .perform_action("lift_containment", vec![device_id.clone()])
        .await?;

    if !matches!(response.status_code, 200 | 202) {
        return Ok(Envelope::api_error(
            API_NAME,
            response.status_code,
            response.error_message(),
            "lift_containment",
        ));
    }

    tracing::info!(device_id = %device_id, "Host containment lifted successfully");

    Ok(Envelope::success(json!({
        "device_id": device_id,
        "action": "containment_lifted",
        "status": "success",
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::mock::MockProvider;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    async fn dispatch(tool: &str, arguments: Value) -> Envelope {
        let provider = MockProvider::new();
        provider.initialize().await.unwrap();

        let shared: Arc<dyn Provider> = Arc::new(provider);
        execute(shared, tool.to_string(), arguments).await.unwrap()
    }

    #[tokio::test]
    async fn query_devices_shapes_metadata() {
        let envelope = dispatch("query_devices_by_filter", json!({"limit": 10})).await;

        assert!(envelope.success);
        assert_eq!(
            envelope.data.unwrap()["device_ids"],
            json!(["mock-device-001", "mock-device-002", "mock-device-003"])
        );
        assert_eq!(
            envelope.metadata.unwrap(),
            json!({"total": 3, "limit": 10, "offset": 0})
        );
    }

    #[tokio::test]
    async fn missing_device_ids_is_a_validation_error() {
        let envelope = dispatch("get_device_details", json!({})).await;

        assert!(!envelope.success);
        assert_eq!(envelope.error, Some("Validation error".into()));
        assert_eq!(envelope.details.unwrap()["field"], "device_ids");
    }

    #[tokio::test]
    async fn contain_host_requires_device_id() {
        let envelope = dispatch("contain_host", json!({})).await;

        assert!(!envelope.success);
        assert_eq!(envelope.details.unwrap()["field"], "device_id");
    }

    #[tokio::test]
    async fn contain_host_reports_contained_action() {
        let envelope = dispatch("contain_host", json!({"device_id": "mock-device-001"})).await;

        assert!(envelope.success);
        let data = envelope.data.unwrap();
        assert_eq!(data["action"], "contained");
        assert_eq!(data["device_id"], "mock-device-001");
        assert_eq!(data["status"], "success");
    }

    #[tokio::test]
    async fn lift_containment_reports_lifted_action() {
        let envelope = dispatch("lift_containment", json!({"device_id": "mock-device-002"})).await;

        assert!(envelope.success);
        assert_eq!(envelope.data.unwrap()["action"], "containment_lifted");
    }

    #[tokio::test]
    async fn unknown_tool_name_is_reported() {
        let envelope = dispatch("defrag_host", json!({})).await;
        assert!(!envelope.success);
        assert_eq!(envelope.error, Some("Unknown tool: defrag_host".into()));
    }
}
