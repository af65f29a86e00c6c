//! MCP server orchestration.
//!
//! [`McpServer`] owns the session provider and the tool registry, and is
//! the single entry point transports go through: list tools, execute a
//! tool, report health. Construction picks the provider from the
//! configured environment; `demo` runs entirely against canned data.

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::RwLock;

use crate::config::{Environment, Settings};
use crate::envelope::Envelope;
use crate::error::{FalconError, Result};
use crate::provider::Provider;
use crate::provider::falcon::FalconProvider;
use crate::provider::mock::MockProvider;
use crate::tools::registry::ToolRegistry;
use crate::tools::{detects, hosts, incidents};

pub struct McpServer {
    settings: Settings,
    provider: Arc<dyn Provider>,
    registry: RwLock<Option<ToolRegistry>>,
}

impl McpServer {
    /// Build a server with the provider implied by `settings.environment`.
    pub fn new(settings: Settings) -> Self {
        let provider: Arc<dyn Provider> = match settings.environment {
            Environment::Demo => {
                tracing::info!("Demo environment, using mock provider");
                Arc::new(MockProvider::new())
            }
            _ => Arc::new(FalconProvider::new(settings.clone())),
        };
        Self::with_provider(settings, provider)
    }

    /// Build a server around an explicit provider. Used by the SDK and
    /// by tests that need an instrumented provider.
    pub fn with_provider(settings: Settings, provider: Arc<dyn Provider>) -> Self {
        Self {
            settings,
            provider,
            registry: RwLock::new(None),
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn provider(&self) -> Arc<dyn Provider> {
        self.provider.clone()
    }

    /// Authenticate the provider and register every tool module.
    /// Idempotent: a second call is a no-op.
    pub async fn initialize(&self) -> Result<()> {
        let mut registry_slot = self.registry.write().await;
        if registry_slot.is_some() {
            tracing::warn!("Server already initialized, skipping");
            return Ok(());
        }

        self.provider.initialize().await?;

        let mut registry = ToolRegistry::new(self.provider.clone());
        registry.register_module(hosts::tools(), hosts::execute)?;
        registry.register_module(detects::tools(), detects::execute)?;
        registry.register_module(incidents::tools(), incidents::execute)?;

        tracing::info!(
            tool_count = registry.list_tool_names().len(),
            environment = %self.settings.environment,
            "MCP server initialized"
        );
        *registry_slot = Some(registry);
        Ok(())
    }

    /// Tear down the registry and close the provider session. Idempotent.
    pub async fn shutdown(&self) -> Result<()> {
        let mut registry_slot = self.registry.write().await;
        if registry_slot.take().is_none() {
            tracing::debug!("Server not initialized, nothing to shut down");
            return Ok(());
        }
        drop(registry_slot);

        self.provider.shutdown().await?;
        tracing::info!("MCP server shut down");
        Ok(())
    }

    /// All registered tool descriptors in MCP wire format.
    pub async fn get_tools(&self) -> Result<Vec<Value>> {
        let registry_slot = self.registry.read().await;
        let registry = registry_slot.as_ref().ok_or(FalconError::NotInitialized)?;
        Ok(registry.get_all_tools())
    }

    /// Execute a registered tool. Always yields an envelope once the
    /// server is initialized.
    pub async fn execute_tool(&self, name: &str, arguments: Value) -> Result<Envelope> {
        let registry_slot = self.registry.read().await;
        let registry = registry_slot.as_ref().ok_or(FalconError::NotInitialized)?;
        Ok(registry.execute_tool(name, arguments).await)
    }

    /// True when the provider can reach the remote API. Never errors.
    pub async fn health_check(&self) -> bool {
        self.provider.health_check().await
    }
}

/// Build and initialize a server in one step: the returned server has an
/// open provider session and all tool modules registered.
pub async fn create_server(settings: Settings) -> Result<McpServer> {
    let server = McpServer::new(settings);
    server.initialize().await?;
    Ok(server)
}

/// [`create_server`] with settings loaded from process environment
/// configuration.
pub async fn create_server_from_env() -> Result<McpServer> {
    create_server(Settings::from_env()?).await
}
