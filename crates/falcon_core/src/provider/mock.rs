//! Mock provider for demo mode and tests.
//!
//! Serves canned data in the real API's response shape, with no network
//! and no credentials. Unlike the real provider there is no token to
//! refresh, but the lifecycle contract (not-initialized accessors,
//! idempotent shutdown) is honored so the dispatch layer behaves
//! identically against either implementation.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::error::{FalconError, Result};
use crate::provider::{
    ApiResponse, DetectsApi, HostsApi, IncidentsApi, Provider, QueryParams,
};

fn sample_devices() -> Vec<Value> {
    vec![
        json!({
            "device_id": "mock-device-001",
            "hostname": "WIN-SERVER-DEMO-01",
            "platform_name": "Windows",
            "os_version": "Windows Server 2019",
            "local_ip": "192.168.1.100",
            "external_ip": "203.0.113.100",
            "status": "normal",
            "last_seen": "2024-01-19T10:30:00Z",
            "first_seen": "2024-01-01T08:00:00Z",
            "agent_version": "7.10.0",
        }),
        json!({
            "device_id": "mock-device-002",
            "hostname": "LINUX-WEB-DEMO-01",
            "platform_name": "Linux",
            "os_version": "Ubuntu 22.04",
            "local_ip": "192.168.1.101",
            "external_ip": "203.0.113.101",
            "status": "normal",
            "last_seen": "2024-01-19T10:25:00Z",
            "first_seen": "2024-01-01T09:00:00Z",
            "agent_version": "7.10.0",
        }),
        json!({
            "device_id": "mock-device-003",
            "hostname": "MAC-LAPTOP-DEMO-01",
            "platform_name": "Mac",
            "os_version": "macOS 14.0",
            "local_ip": "192.168.1.102",
            "status": "normal",
            "last_seen": "2024-01-19T10:20:00Z",
            "first_seen": "2024-01-05T14:00:00Z",
            "agent_version": "7.09.0",
        }),
    ]
}

fn sample_detections() -> Vec<Value> {
    vec![
        json!({
            "detection_id": "ldt:mock-detection-001",
            "status": "new",
            "severity": "high",
            "tactic": "Initial Access",
            "technique": "Phishing",
            "device": {
                "device_id": "mock-device-001",
                "hostname": "WIN-SERVER-DEMO-01",
            },
            "created_timestamp": "2024-01-19T09:00:00Z",
            "first_behavior": "2024-01-19T08:55:00Z",
            "last_behavior": "2024-01-19T09:00:00Z",
        }),
        json!({
            "detection_id": "ldt:mock-detection-002",
            "status": "in_progress",
            "severity": "medium",
            "tactic": "Execution",
            "technique": "PowerShell",
            "device": {
                "device_id": "mock-device-002",
                "hostname": "LINUX-WEB-DEMO-01",
            },
            "created_timestamp": "2024-01-19T10:00:00Z",
            "first_behavior": "2024-01-19T09:55:00Z",
            "last_behavior": "2024-01-19T10:00:00Z",
        }),
    ]
}

fn sample_incidents() -> Vec<Value> {
    vec![json!({
        "incident_id": "inc:mock-incident-001",
        "status": "New",
        "state": "open",
        "name": "Suspicious Activity on WIN-SERVER-DEMO-01",
        "description": "Multiple detections indicating potential compromise",
        "hosts": ["mock-device-001"],
        "detections": ["ldt:mock-detection-001"],
        "start": "2024-01-19T08:55:00Z",
        "end": "2024-01-19T09:00:00Z",
        "tactics": ["Initial Access", "Execution"],
        "techniques": ["Phishing", "PowerShell"],
    })]
}

fn id_of(resource: &Value, key: &str) -> String {
    resource[key].as_str().unwrap_or_default().to_string()
}

fn paginated_query(ids: Vec<String>, params: &QueryParams) -> ApiResponse {
    let total = ids.len() as u64;
    let offset = params.offset as usize;
    let page: Vec<String> = ids
        .into_iter()
        .skip(offset)
        .take(params.limit as usize)
        .collect();
    ApiResponse {
        status_code: 200,
        body: serde_json::from_value(json!({
            "resources": page,
            "meta": {"pagination": {"total": total}},
        }))
        .unwrap_or_default(),
    }
}

fn details_for(resources: Vec<Value>, key: &str, requested: &[String]) -> ApiResponse {
    let matched: Vec<Value> = resources
        .into_iter()
        .filter(|resource| requested.contains(&id_of(resource, key)))
        .collect();
    ApiResponse {
        status_code: 200,
        body: serde_json::from_value(json!({ "resources": matched })).unwrap_or_default(),
    }
}

/// In-memory stand-in for the Falcon cloud. One shared state struct
/// implements all three resource traits; the provider hands out typed
/// handles to it.
pub struct MockProvider {
    state: Arc<MockState>,
}

struct MockState {
    initialized: AtomicBool,
    call_count: AtomicUsize,
}

impl MockState {
    fn record_call(&self, operation: &str) {
        let count = self.call_count.fetch_add(1, Ordering::SeqCst) + 1;
        tracing::info!(operation, call_count = count, "Mock API call (simulated)");
    }
}

impl MockProvider {
    pub fn new() -> Self {
        tracing::info!("Mock CrowdStrike provider created (no real credentials needed)");
        Self {
            state: Arc::new(MockState {
                initialized: AtomicBool::new(false),
                call_count: AtomicUsize::new(0),
            }),
        }
    }

    /// Total simulated remote calls issued, for test assertions.
    pub fn call_count(&self) -> usize {
        self.state.call_count.load(Ordering::SeqCst)
    }

    fn require_initialized(&self) -> Result<()> {
        if self.state.initialized.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(FalconError::NotInitialized)
        }
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Provider for MockProvider {
    async fn initialize(&self) -> Result<()> {
        if self.state.initialized.swap(true, Ordering::SeqCst) {
            tracing::warn!("Provider already initialized");
        } else {
            tracing::info!("Mock provider initialized - using simulated data");
        }
        Ok(())
    }

    async fn shutdown(&self) -> Result<()> {
        tracing::info!("Shutting down mock provider");
        self.state.initialized.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn refresh_token_if_needed(&self) -> Result<()> {
        tracing::debug!("Mock token refresh (no-op)");
        Ok(())
    }

    async fn health_check(&self) -> bool {
        self.state.initialized.load(Ordering::SeqCst)
    }

    fn hosts(&self) -> Result<Arc<dyn HostsApi>> {
        self.require_initialized()?;
        Ok(self.state.clone() as Arc<dyn HostsApi>)
    }

    fn detects(&self) -> Result<Arc<dyn DetectsApi>> {
        self.require_initialized()?;
        Ok(self.state.clone() as Arc<dyn DetectsApi>)
    }

    fn incidents(&self) -> Result<Arc<dyn IncidentsApi>> {
        self.require_initialized()?;
        Ok(self.state.clone() as Arc<dyn IncidentsApi>)
    }
}

#[async_trait]
impl HostsApi for MockState {
    async fn query_devices_by_filter(&self, params: QueryParams) -> Result<ApiResponse> {
        self.record_call("query_devices_by_filter");
        let ids = sample_devices()
            .iter()
            .map(|d| id_of(d, "device_id"))
            .collect();
        Ok(paginated_query(ids, &params))
    }

    async fn get_device_details(&self, ids: Vec<String>) -> Result<ApiResponse> {
        self.record_call("get_device_details");
        Ok(details_for(sample_devices(), "device_id", &ids))
    }

    async fn perform_action(&self, action_name: &str, ids: Vec<String>) -> Result<ApiResponse> {
        self.record_call("perform_action");
        tracing::warn!(
            action_name,
            device_ids = ?ids,
            "Mock device action called (simulated - no real action taken)"
        );
        let resources: Vec<Value> = ids.iter().map(|id| json!({ "id": id })).collect();
        Ok(ApiResponse {
            status_code: 202,
            body: serde_json::from_value(json!({ "resources": resources })).unwrap_or_default(),
        })
    }
}

#[async_trait]
impl DetectsApi for MockState {
    async fn query_detects(&self, params: QueryParams) -> Result<ApiResponse> {
        self.record_call("query_detects");
        let ids = sample_detections()
            .iter()
            .map(|d| id_of(d, "detection_id"))
            .collect();
        Ok(paginated_query(ids, &params))
    }

    async fn get_detect_summaries(&self, ids: Vec<String>) -> Result<ApiResponse> {
        self.record_call("get_detect_summaries");
        Ok(details_for(sample_detections(), "detection_id", &ids))
    }

    async fn update_detects_by_ids(
        &self,
        ids: Vec<String>,
        _status: &str,
        _comment: Option<String>,
    ) -> Result<ApiResponse> {
        self.record_call("update_detects_by_ids");
        Ok(ApiResponse {
            status_code: 200,
            body: serde_json::from_value(json!({ "resources": ids })).unwrap_or_default(),
        })
    }
}

#[async_trait]
impl IncidentsApi for MockState {
    async fn query_incidents(&self, params: QueryParams) -> Result<ApiResponse> {
        self.record_call("query_incidents");
        let ids = sample_incidents()
            .iter()
            .map(|i| id_of(i, "incident_id"))
            .collect();
        Ok(paginated_query(ids, &params))
    }

    async fn get_incidents(&self, ids: Vec<String>) -> Result<ApiResponse> {
        self.record_call("get_incidents");
        Ok(details_for(sample_incidents(), "incident_id", &ids))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn accessors_fail_before_initialize() {
        let provider = MockProvider::new();
        assert!(matches!(provider.hosts(), Err(FalconError::NotInitialized)));

        provider.initialize().await.unwrap();
        assert!(provider.hosts().is_ok());
    }

    #[tokio::test]
    async fn device_query_paginates() {
        let provider = MockProvider::new();
        provider.initialize().await.unwrap();

        let response = provider
            .hosts()
            .unwrap()
            .query_devices_by_filter(QueryParams {
                limit: 2,
                offset: 1,
                ..QueryParams::default()
            })
            .await
            .unwrap();

        assert_eq!(response.status_code, 200);
        assert_eq!(response.pagination_total(), 3);
        assert_eq!(
            response.resources(),
            vec![json!("mock-device-002"), json!("mock-device-003")]
        );
    }

    #[tokio::test]
    async fn device_details_filter_to_requested_ids() {
        let provider = MockProvider::new();
        provider.initialize().await.unwrap();

        let response = provider
            .hosts()
            .unwrap()
            .get_device_details(vec!["mock-device-002".to_string()])
            .await
            .unwrap();

        let resources = response.resources();
        assert_eq!(resources.len(), 1);
        assert_eq!(resources[0]["hostname"], "LINUX-WEB-DEMO-01");
    }

    #[tokio::test]
    async fn perform_action_returns_202() {
        let provider = MockProvider::new();
        provider.initialize().await.unwrap();

        let response = provider
            .hosts()
            .unwrap()
            .perform_action("contain", vec!["mock-device-001".to_string()])
            .await
            .unwrap();

        assert_eq!(response.status_code, 202);
        assert_eq!(provider.call_count(), 1);
    }
}
