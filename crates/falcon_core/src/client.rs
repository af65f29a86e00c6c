//! Embeddable SDK client.
//!
//! [`FalconClient`] drives the same tool modules as the MCP server, but
//! as direct method calls, for programs that want the Falcon platform
//! without running an HTTP transport. Every method returns the same
//! [`Envelope`] a tool invocation would.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde_json::json;

use crate::config::Settings;
use crate::envelope::Envelope;
use crate::error::{FalconError, Result};
use crate::provider::falcon::FalconProvider;
use crate::provider::{Provider, QueryParams};
use crate::tools::{detects, hosts, incidents};

pub struct FalconClient {
    provider: Arc<dyn Provider>,
    initialized: AtomicBool,
}

impl FalconClient {
    /// Build a client for the real Falcon API.
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Result<Self> {
        let settings = Settings::new(client_id, client_secret, base_url)?;
        Ok(Self::with_provider(Arc::new(FalconProvider::new(settings))))
    }

    /// Build a client around an explicit provider, for tests and demos.
    pub fn with_provider(provider: Arc<dyn Provider>) -> Self {
        Self {
            provider,
            initialized: AtomicBool::new(false),
        }
    }

    /// Authenticate and open the session. Idempotent.
    pub async fn initialize(&self) -> Result<()> {
        self.provider.initialize().await?;
        self.initialized.store(true, Ordering::SeqCst);
        Ok(())
    }

    /// Close the session. Idempotent.
    pub async fn close(&self) -> Result<()> {
        if !self.initialized.swap(false, Ordering::SeqCst) {
            return Ok(());
        }
        self.provider.shutdown().await
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::SeqCst)
    }

    fn ensure_initialized(&self) -> Result<()> {
        if self.initialized.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(FalconError::NotInitialized)
        }
    }

    fn query_arguments(params: QueryParams) -> serde_json::Value {
        let mut arguments = json!({
            "limit": params.limit,
            "offset": params.offset,
        });
        if let Some(filter) = params.filter {
            arguments["filter"] = json!(filter);
        }
        if let Some(sort) = params.sort {
            arguments["sort"] = json!(sort);
        }
        arguments
    }

    pub async fn query_devices_by_filter(&self, params: QueryParams) -> Result<Envelope> {
        self.ensure_initialized()?;
        hosts::execute(
            self.provider.clone(),
            "query_devices_by_filter".to_string(),
            Self::query_arguments(params),
        )
        .await
    }

    pub async fn get_device_details(&self, device_ids: Vec<String>) -> Result<Envelope> {
        self.ensure_initialized()?;
        hosts::execute(
            self.provider.clone(),
            "get_device_details".to_string(),
            json!({ "device_ids": device_ids }),
        )
        .await
    }

    /// Isolate a host from the network. Audited like the tool invocation.
    pub async fn contain_host(&self, device_id: impl Into<String>) -> Result<Envelope> {
        self.ensure_initialized()?;
        hosts::execute(
            self.provider.clone(),
            "contain_host".to_string(),
            json!({ "device_id": device_id.into() }),
        )
        .await
    }

    pub async fn lift_containment(&self, device_id: impl Into<String>) -> Result<Envelope> {
        self.ensure_initialized()?;
        hosts::execute(
            self.provider.clone(),
            "lift_containment".to_string(),
            json!({ "device_id": device_id.into() }),
        )
        .await
    }

    pub async fn query_detections(&self, params: QueryParams) -> Result<Envelope> {
        self.ensure_initialized()?;
        detects::execute(
            self.provider.clone(),
            "query_detections".to_string(),
            Self::query_arguments(params),
        )
        .await
    }

    pub async fn get_detection_details(&self, detection_ids: Vec<String>) -> Result<Envelope> {
        self.ensure_initialized()?;
        detects::execute(
            self.provider.clone(),
            "get_detection_details".to_string(),
            json!({ "detection_ids": detection_ids }),
        )
        .await
    }

    pub async fn update_detection_status(
        &self,
        detection_ids: Vec<String>,
        status: impl Into<String>,
        comment: Option<String>,
    ) -> Result<Envelope> {
        self.ensure_initialized()?;
        let mut arguments = json!({
            "detection_ids": detection_ids,
            "status": status.into(),
        });
        if let Some(comment) = comment {
            arguments["comment"] = json!(comment);
        }
        detects::execute(
            self.provider.clone(),
            "update_detection_status".to_string(),
            arguments,
        )
        .await
    }

    pub async fn query_incidents(&self, params: QueryParams) -> Result<Envelope> {
        self.ensure_initialized()?;
        incidents::execute(
            self.provider.clone(),
            "query_incidents".to_string(),
            Self::query_arguments(params),
        )
        .await
    }

    pub async fn get_incident_details(&self, incident_ids: Vec<String>) -> Result<Envelope> {
        self.ensure_initialized()?;
        incidents::execute(
            self.provider.clone(),
            "get_incident_details".to_string(),
            json!({ "incident_ids": incident_ids }),
        )
        .await
    }
}
