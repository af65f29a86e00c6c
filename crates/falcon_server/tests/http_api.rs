//! HTTP surface tests against a demo-mode server.

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use falcon_core::config::{Environment, Secret, Settings};
use falcon_core::server::McpServer;
use falcon_server::build_router;
use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use tower::ServiceExt;

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

async fn demo_app() -> Router {
    let server = falcon_core::create_server(demo_settings()).await.unwrap();
    build_router(Arc::new(server))
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn get(path: &str) -> Request<Body> {
    Request::builder()
        .uri(path)
        .body(Body::empty())
        .unwrap()
}

fn post_json(path: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(path)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn liveness_and_readiness() {
    let app = demo_app().await;

    let response = app.clone().oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["status"], "healthy");

    let response = app.oneshot(get("/ready")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["status"], "ready");
}

#[tokio::test]
async fn readiness_fails_after_shutdown() {
    let server = Arc::new(McpServer::new(demo_settings()));
    server.initialize().await.unwrap();
    server.shutdown().await.unwrap();
    let app = build_router(server);

    let response = app.oneshot(get("/ready")).await.unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn tool_listing_reports_all_tools() {
    let app = demo_app().await;

    let response = app.oneshot(get("/mcp/v1/tools")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["count"], 9);
    assert!(
        body["tools"]
            .as_array()
            .unwrap()
            .iter()
            .all(|tool| tool["inputSchema"].is_object())
    );
}

#[tokio::test]
async fn listing_on_uninitialized_server_is_503() {
    let app = build_router(Arc::new(McpServer::new(demo_settings())));

    let response = app.oneshot(get("/mcp/v1/tools")).await.unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

    let body = body_json(response).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "Server not initialized");
}

#[tokio::test]
async fn tool_execution_relays_the_envelope() {
    let app = demo_app().await;

    let response = app
        .oneshot(post_json(
            "/mcp/v1/tools/query_devices_by_filter",
            json!({"arguments": {"limit": 2}}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(
        body["data"]["device_ids"],
        json!(["mock-device-001", "mock-device-002"])
    );
    assert_eq!(body["metadata"]["total"], 3);
}

#[tokio::test]
async fn missing_arguments_default_to_empty() {
    let app = demo_app().await;

    let response = app
        .oneshot(post_json("/mcp/v1/tools/query_incidents", json!({})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["success"], true);
}

#[tokio::test]
async fn unknown_tool_relays_a_not_found_envelope() {
    let app = demo_app().await;

    let response = app
        .oneshot(post_json(
            "/mcp/v1/tools/reboot_universe",
            json!({"arguments": {}}),
        ))
        .await
        .unwrap();
    // Transport status stays 200; the envelope carries the 404.
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["status_code"], 404);
    assert_eq!(body["error"], "Tool 'reboot_universe' not found");
}

#[tokio::test]
async fn event_stream_is_served_at_the_root_sse_path() {
    let app = demo_app().await;

    let response = app.oneshot(get("/sse")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "text/event-stream"
    );
}

#[tokio::test]
async fn validation_errors_come_back_as_envelopes() {
    let app = demo_app().await;

    let response = app
        .oneshot(post_json(
            "/mcp/v1/tools/contain_host",
            json!({"arguments": {}}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "Validation error");
    assert_eq!(body["details"]["field"], "device_id");
}
