//! Incident investigation tools.

use std::sync::Arc;

use serde_json::{Value, json};

use crate::envelope::Envelope;
use crate::error::Result;
use crate::provider::{Provider, QueryParams};
use crate::tools::{API_NAME, opt_string_arg, string_list_arg, u64_arg};

use super::registry::ToolDescriptor;

/// Descriptors for all incident investigation tools.
pub fn tools() -> Vec<ToolDescriptor> {
    vec![
        ToolDescriptor::new(
            "query_incidents",
            "Search for incidents using FQL (Falcon Query Language) filters. \
             Filter by state, score, tags, time range, and more. \
             Returns incident IDs for use with get_incident_details.",
            json!({
                "type": "object",
                "properties": {
                    "filter": {
                        "type": "string",
                        "description": "FQL filter expression (e.g., \"state:'open'+fine_score:>=50\"). Leave empty to query all incidents.",
                    },
                    "limit": {
                        "type": "integer",
                        "description": "Maximum number of results (1-500)",
                        "default": 100,
                        "minimum": 1,
                        "maximum": 500,
                    },
                    "offset": {
                        "type": "integer",
                        "description": "Pagination offset",
                        "default": 0,
                        "minimum": 0,
                    },
                    "sort": {
                        "type": "string",
                        "description": "Sort field and direction (e.g., 'start.desc', 'fine_score.desc')",
                    },
                },
            }),
        ),
        ToolDescriptor::new(
            "get_incident_details",
            "Get detailed information about specific incidents. \
             Provide incident IDs from query_incidents to retrieve state, score, \
             tactics, involved hosts, and associated detections.",
            json!({
                "type": "object",
                "properties": {
                    "incident_ids": {
                        "type": "array",
                        "description": "List of incident IDs to retrieve",
                        "items": {"type": "string"},
                        "minItems": 1,
                        "maxItems": 500,
                    },
                },
                "required": ["incident_ids"],
            }),
        ),
    ]
}

/// Dispatch an incident investigation tool.
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
        "query_incidents" => query_incidents(provider.as_ref(), &arguments).await,
        "get_incident_details" => get_incident_details(provider.as_ref(), &arguments).await,
        _ => {
            return Ok(Envelope::error_for_tool(
                format!("Unknown tool: {tool_name}"),
                &tool_name,
            ));
        }
    };

    Ok(outcome.unwrap_or_else(|error| {
        tracing::error!(tool_name = %tool_name, %error, "Incident tool failed");
        Envelope::error_for_tool(format!("Failed to execute {tool_name}: {error}"), &tool_name)
    }))
}

async fn query_incidents(provider: &dyn Provider, arguments: &Value) -> Result<Envelope> {
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
        "Querying incidents"
    );

    let response = provider.incidents()?.query_incidents(params.clone()).await?;

    if response.status_code != 200 {
        return Ok(Envelope::api_error(
            API_NAME,
            response.status_code,
            response.error_message(),
            "query_incidents",
        ));
    }

    let incident_ids = response.resources();
    let total = response.pagination_total();
    tracing::info!(incident_count = incident_ids.len(), total, "Query completed");

    Ok(Envelope::success_with_metadata(
        json!({ "incident_ids": incident_ids }),
        json!({
            "total": total,
            "limit": params.limit,
            "offset": params.offset,
        }),
    ))
}

async fn get_incident_details(provider: &dyn Provider, arguments: &Value) -> Result<Envelope> {
    let incident_ids = string_list_arg(arguments, "incident_ids");

    if incident_ids.is_empty() {
        return Ok(Envelope::validation_error(
            "incident_ids",
            "At least one incident ID is required",
            "get_incident_details",
        ));
    }

    tracing::info!(incident_count = incident_ids.len(), "Getting incident details");

    let response = provider.incidents()?.get_incidents(incident_ids).await?;

    if response.status_code != 200 {
        return Ok(Envelope::api_error(
            API_NAME,
            response.status_code,
            response.error_message(),
            "get_incident_details",
        ));
    }

    let incidents = response.resources();
    tracing::info!(incident_count = incidents.len(), "Incident details retrieved");

    Ok(Envelope::success_with_metadata(
        json!({ "incidents": incidents }),
        json!({ "count": incidents.len() }),
    ))
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
    async fn query_incidents_returns_ids_and_pagination() {
        let envelope = dispatch("query_incidents", json!({"limit": 50})).await;

        assert!(envelope.success);
        assert_eq!(
            envelope.data.unwrap()["incident_ids"],
            json!(["inc:mock-incident-001"])
        );
        assert_eq!(
            envelope.metadata.unwrap(),
            json!({"total": 1, "limit": 50, "offset": 0})
        );
    }

    #[tokio::test]
    async fn detail_lookup_requires_ids() {
        let envelope = dispatch("get_incident_details", json!({})).await;

        assert!(!envelope.success);
        assert_eq!(envelope.error, Some("Validation error".into()));
        assert_eq!(envelope.details.unwrap()["field"], "incident_ids");
    }

    #[tokio::test]
    async fn detail_lookup_returns_incident_bodies() {
        let envelope = dispatch(
            "get_incident_details",
            json!({"incident_ids": ["inc:mock-incident-001"]}),
        )
        .await;

        assert!(envelope.success);
        let data = envelope.data.unwrap();
        assert_eq!(data["incidents"][0]["incident_id"], "inc:mock-incident-001");
        assert_eq!(envelope.metadata.unwrap()["count"], 1);
    }
}
