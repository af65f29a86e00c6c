//! Detection triage tools.

use std::sync::Arc;

use serde_json::{Value, json};

use crate::envelope::Envelope;
use crate::error::Result;
use crate::provider::{Provider, QueryParams};
use crate::tools::{API_NAME, opt_string_arg, string_list_arg, u64_arg};

use super::registry::ToolDescriptor;

/// Workflow states a detection can be moved to.
const VALID_STATUSES: [&str; 7] = [
    "new",
    "in_progress",
    "true_positive",
    "false_positive",
    "closed",
    "ignored",
    "reopened",
];

/// Descriptors for all detection triage tools.
pub fn tools() -> Vec<ToolDescriptor> {
    vec![
        ToolDescriptor::new(
            "query_detections",
            "Search for detections using FQL (Falcon Query Language) filters. \
             Filter by severity, status, hostname, time range, and more. \
             Returns detection IDs for use with get_detection_details.",
            json!({
                "type": "object",
                "properties": {
                    "filter": {
                        "type": "string",
                        "description": "FQL filter expression (e.g., \"status:'new'+max_severity:>=70\"). Leave empty to query all detections.",
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
                        "description": "Sort field and direction (e.g., 'last_behavior.desc', 'max_severity.desc')",
                    },
                },
            }),
        ),
        ToolDescriptor::new(
            "get_detection_details",
            "Get detailed summaries for specific detections. \
             Provide detection IDs from query_detections to retrieve behaviors, \
             severity, tactics, techniques, and affected host information.",
            json!({
                "type": "object",
                "properties": {
                    "detection_ids": {
                        "type": "array",
                        "description": "List of detection IDs to retrieve",
                        "items": {"type": "string"},
                        "minItems": 1,
                        "maxItems": 1000,
                    },
                },
                "required": ["detection_ids"],
            }),
        ),
        ToolDescriptor::new(
            "update_detection_status",
            "Update the workflow status of one or more detections. \
             Valid statuses: new, in_progress, true_positive, false_positive, \
             closed, ignored, reopened. An optional comment is recorded with \
             the update.",
            json!({
                "type": "object",
                "properties": {
                    "detection_ids": {
                        "type": "array",
                        "description": "List of detection IDs to update",
                        "items": {"type": "string"},
                        "minItems": 1,
                        "maxItems": 1000,
                    },
                    "status": {
                        "type": "string",
                        "description": "New workflow status",
                        "enum": VALID_STATUSES,
                    },
                    "comment": {
                        "type": "string",
                        "description": "Optional comment to record with the status change",
                    },
                },
                "required": ["detection_ids", "status"],
            }),
        ),
    ]
}

/// Dispatch a detection triage tool.
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
        "query_detections" => query_detections(provider.as_ref(), &arguments).await,
        "get_detection_details" => get_detection_details(provider.as_ref(), &arguments).await,
        "update_detection_status" => update_detection_status(provider.as_ref(), &arguments).await,
        _ => {
            return Ok(Envelope::error_for_tool(
                format!("Unknown tool: {tool_name}"),
                &tool_name,
            ));
        }
    };

    Ok(outcome.unwrap_or_else(|error| {
        tracing::error!(tool_name = %tool_name, %error, "Detection tool failed");
        Envelope::error_for_tool(format!("Failed to execute {tool_name}: {error}"), &tool_name)
    }))
}

async fn query_detections(provider: &dyn Provider, arguments: &Value) -> Result<Envelope> {
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
        "Querying detections"
    );

    let response = provider.detects()?.query_detects(params.clone()).await?;

    if response.status_code != 200 {
        return Ok(Envelope::api_error(
            API_NAME,
            response.status_code,
            response.error_message(),
            "query_detections",
        ));
    }

    let detection_ids = response.resources();
    let total = response.pagination_total();
    tracing::info!(detection_count = detection_ids.len(), total, "Query completed");

    Ok(Envelope::success_with_metadata(
        json!({ "detection_ids": detection_ids }),
        json!({
            "total": total,
            "limit": params.limit,
            "offset": params.offset,
        }),
    ))
}

async fn get_detection_details(provider: &dyn Provider, arguments: &Value) -> Result<Envelope> {
    let detection_ids = string_list_arg(arguments, "detection_ids");

    if detection_ids.is_empty() {
        return Ok(Envelope::validation_error(
            "detection_ids",
            "At least one detection ID is required",
            "get_detection_details",
        ));
    }

    tracing::info!(detection_count = detection_ids.len(), "Getting detection details");

    let response = provider
        .detects()?
        .get_detect_summaries(detection_ids)
        .await?;

    if response.status_code != 200 {
        return Ok(Envelope::api_error(
            API_NAME,
            response.status_code,
            response.error_message(),
            "get_detection_details",
        ));
    }

    let detections = response.resources();
    tracing::info!(detection_count = detections.len(), "Detection details retrieved");

    Ok(Envelope::success_with_metadata(
        json!({ "detections": detections }),
        json!({ "count": detections.len() }),
    ))
}

async fn update_detection_status(provider: &dyn Provider, arguments: &Value) -> Result<Envelope> {
    let detection_ids = string_list_arg(arguments, "detection_ids");

    if detection_ids.is_empty() {
        return Ok(Envelope::validation_error(
            "detection_ids",
            "At least one detection ID is required",
            "update_detection_status",
        ));
    }

    let Some(status) = opt_string_arg(arguments, "status") else {
        return Ok(Envelope::validation_error(
            "status",
            "Status is required",
            "update_detection_status",
        ));
    };

    if !VALID_STATUSES.contains(&status.as_str()) {
        return Ok(Envelope::validation_error(
            "status",
            format!(
                "Invalid status '{status}'. Valid statuses: {}",
                VALID_STATUSES.join(", ")
            ),
            "update_detection_status",
        ));
    }

    let comment = opt_string_arg(arguments, "comment");

    tracing::info!(
        detection_count = detection_ids.len(),
        status = %status,
        "Updating detection status"
    );

    let response = provider
        .detects()?
        .update_detects_by_ids(detection_ids.clone(), &status, comment)
        .await?;

    if !matches!(response.status_code, 200 | 202) {
        return Ok(Envelope::api_error(
            API_NAME,
            response.status_code,
            response.error_message(),
            "update_detection_status",
        ));
    }

    tracing::info!(
        detection_count = detection_ids.len(),
        status = %status,
        "Detection status updated"
    );

    Ok(Envelope::success(json!({
        "updated_count": detection_ids.len(),
        "detection_ids": detection_ids,
        "status": status,
    })))
}
