//! End-to-end tool dispatch through [`McpServer`] with the mock provider.

use std::sync::Arc;

use falcon_core::config::{Environment, Secret, Settings};
use falcon_core::provider::Provider;
use falcon_core::provider::mock::MockProvider;
use falcon_core::server::McpServer;
use pretty_assertions::assert_eq;
use serde_json::json;

fn demo_settings() -> Settings {
    Settings {
        client_id: Secret::new("demo"),
        client_secret: Secret::new("demo"),
        base_url: "https://api.crowdstrike.com".to_string(),
        server_host: "127.0.0.1".to_string(),
        server_port: 8001,
        log_level: "info".to_string(),
        environment: Environment::Demo,
    }
}

async fn demo_server() -> (McpServer, Arc<MockProvider>) {
    let mock = Arc::new(MockProvider::new());
    let provider: Arc<dyn Provider> = mock.clone();
    let server = McpServer::with_provider(demo_settings(), provider);
    server.initialize().await.unwrap();
    (server, mock)
}

#[tokio::test]
async fn device_query_envelope_carries_ids_and_pagination() {
    let (server, _) = demo_server().await;

    let envelope = server
        .execute_tool(
            "query_devices_by_filter",
            json!({"filter": "platform_name:'Windows'", "limit": 2}),
        )
        .await
        .unwrap();

    assert!(envelope.success);
    assert_eq!(
        envelope.data.unwrap()["device_ids"],
        json!(["mock-device-001", "mock-device-002"])
    );
    assert_eq!(
        envelope.metadata.unwrap(),
        json!({"total": 3, "limit": 2, "offset": 0})
    );
}

#[tokio::test]
async fn validation_failure_never_reaches_the_remote_api() {
    let (server, mock) = demo_server().await;

    let envelope = server
        .execute_tool("get_device_details", json!({}))
        .await
        .unwrap();

    assert!(!envelope.success);
    assert_eq!(envelope.error, Some("Validation error".into()));
    assert_eq!(envelope.tool, Some("get_device_details".to_string()));
    assert_eq!(mock.call_count(), 0);
}

#[tokio::test]
async fn unknown_tool_is_a_not_found_envelope() {
    let (server, mock) = demo_server().await;

    let envelope = server
        .execute_tool("reboot_universe", json!({}))
        .await
        .unwrap();

    assert!(!envelope.success);
    assert_eq!(envelope.status_code, Some(404));
    assert_eq!(envelope.error, Some("Tool 'reboot_universe' not found".into()));
    assert_eq!(envelope.tool, Some("reboot_universe".to_string()));
    assert_eq!(mock.call_count(), 0);
}

#[tokio::test]
async fn detection_triage_flow() {
    let (server, _) = demo_server().await;

    let queried = server
        .execute_tool("query_detections", json!({}))
        .await
        .unwrap();
    let detection_ids = queried.data.unwrap()["detection_ids"].clone();

    let details = server
        .execute_tool("get_detection_details", json!({"detection_ids": detection_ids.clone()}))
        .await
        .unwrap();
    assert!(details.success);
    assert_eq!(details.metadata.unwrap()["count"], 2);

    let updated = server
        .execute_tool(
            "update_detection_status",
            json!({"detection_ids": detection_ids, "status": "in_progress"}),
        )
        .await
        .unwrap();
    assert!(updated.success);
    assert_eq!(updated.data.unwrap()["updated_count"], 2);
}

#[tokio::test]
async fn incident_flow() {
    let (server, _) = demo_server().await;

    let queried = server.execute_tool("query_incidents", json!({})).await.unwrap();
    assert!(queried.success);

    let details = server
        .execute_tool(
            "get_incident_details",
            json!({"incident_ids": ["inc:mock-incident-001"]}),
        )
        .await
        .unwrap();
    assert!(details.success);
    let incidents = details.data.unwrap()["incidents"].clone();
    assert_eq!(incidents[0]["state"], "open");
}

#[tokio::test]
async fn tool_listing_is_stable_and_complete() {
    let (server, _) = demo_server().await;

    let tools = server.get_tools().await.unwrap();
    let mut names: Vec<String> = tools
        .iter()
        .filter_map(|tool| tool["name"].as_str().map(str::to_string))
        .collect();
    names.sort();

    assert_eq!(
        names,
        vec![
            "contain_host",
            "get_detection_details",
            "get_device_details",
            "get_incident_details",
            "lift_containment",
            "query_detections",
            "query_devices_by_filter",
            "query_incidents",
            "update_detection_status",
        ]
    );
    // Every descriptor carries a usable schema and description.
    for tool in &tools {
        assert!(tool["description"].as_str().is_some_and(|d| !d.is_empty()));
        assert_eq!(tool["inputSchema"]["type"], "object");
    }
}
