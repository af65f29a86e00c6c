//! Central registry mapping tool names to executable dispatch closures.
//!
//! Descriptors carry no logic; registration binds each descriptor to its
//! module's dispatch function in one atomic step. After startup the
//! registry is read-only and safe for concurrent lookups.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use serde_json::{Value, json};

use crate::envelope::Envelope;
use crate::error::{FalconError, Result};
use crate::provider::Provider;

/// Argument keys whose values are never logged.
const REDACTED_KEYS: &[&str] = &["password", "secret", "token"];

/// Declarative tool metadata: name, description, and a JSON Schema for
/// the input arguments. Immutable once registered.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

impl ToolDescriptor {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        input_schema: Value,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema,
        }
    }

    /// The MCP wire representation (`inputSchema` key).
    pub fn to_mcp_format(&self) -> Value {
        json!({
            "name": self.name,
            "description": self.description,
            "inputSchema": self.input_schema,
        })
    }
}

/// A module-level dispatch function bound at registration time. The
/// `Err` branch is the registry's second line of defense; modules
/// normally convert their own failures into error envelopes.
pub type DispatchHandler = Arc<
    dyn Fn(Arc<dyn Provider>, String, Value) -> BoxFuture<'static, Result<Envelope>> + Send + Sync,
>;

struct RegisteredTool {
    descriptor: ToolDescriptor,
    handler: DispatchHandler,
}

/// Name-keyed dispatch table bound to one provider instance.
pub struct ToolRegistry {
    provider: Arc<dyn Provider>,
    tools: HashMap<String, RegisteredTool>,
}

impl ToolRegistry {
    pub fn new(provider: Arc<dyn Provider>) -> Self {
        tracing::info!("Tool registry initialized");
        Self {
            provider,
            tools: HashMap::new(),
        }
    }

    /// Register a single descriptor with its handler. Duplicate names are
    /// a startup error; the first registration is unaffected.
    pub fn register_tool(
        &mut self,
        descriptor: ToolDescriptor,
        handler: DispatchHandler,
    ) -> Result<()> {
        if self.tools.contains_key(&descriptor.name) {
            return Err(FalconError::DuplicateTool {
                tool_name: descriptor.name,
            });
        }

        tracing::info!(tool_name = %descriptor.name, "Tool registered");
        self.tools.insert(
            descriptor.name.clone(),
            RegisteredTool {
                descriptor,
                handler,
            },
        );
        Ok(())
    }

    /// Register every descriptor from a module, binding each to the
    /// module's dispatch function.
    pub fn register_module<F, Fut>(
        &mut self,
        descriptors: Vec<ToolDescriptor>,
        dispatch: F,
    ) -> Result<()>
    where
        F: Fn(Arc<dyn Provider>, String, Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Envelope>> + Send + 'static,
    {
        let dispatch = Arc::new(dispatch);
        let handler: DispatchHandler = Arc::new(move |provider, name, arguments| {
            Box::pin(dispatch(provider, name, arguments))
        });

        let tool_count = descriptors.len();
        for descriptor in descriptors {
            self.register_tool(descriptor, handler.clone())?;
        }

        tracing::info!(tool_count, "Module registered");
        Ok(())
    }

    /// Execute a tool by name. Unknown names and handler failures are
    /// reported as error envelopes, never raised.
    pub async fn execute_tool(&self, name: &str, arguments: Value) -> Envelope {
        let Some(tool) = self.tools.get(name) else {
            tracing::warn!(tool_name = name, "Tool not found");
            return Envelope::error_for_tool(format!("Tool '{name}' not found"), name)
                .with_status_code(404);
        };

        tracing::info!(
            tool_name = name,
            arguments = %redact_arguments(&arguments),
            "Executing tool"
        );

        match (tool.handler)(self.provider.clone(), name.to_string(), arguments).await {
            Ok(envelope) => {
                tracing::info!(
                    tool_name = name,
                    success = envelope.success,
                    "Tool execution completed"
                );
                envelope
            }
            Err(error) => {
                tracing::error!(tool_name = name, %error, "Tool execution failed");
                Envelope::error_for_tool(format!("Tool execution failed: {error}"), name)
                    .with_status_code(500)
            }
        }
    }

    /// All registered tools in MCP wire format.
    pub fn get_all_tools(&self) -> Vec<Value> {
        self.tools
            .values()
            .map(|tool| tool.descriptor.to_mcp_format())
            .collect()
    }

    pub fn get_tool(&self, name: &str) -> Option<&ToolDescriptor> {
        self.tools.get(name).map(|tool| &tool.descriptor)
    }

    pub fn list_tool_names(&self) -> Vec<String> {
        self.tools.keys().cloned().collect()
    }
}

/// Copy of the arguments with sensitive values masked, for request logs.
fn redact_arguments(arguments: &Value) -> Value {
    match arguments {
        Value::Object(map) => {
            let mut redacted = map.clone();
            for key in REDACTED_KEYS {
                if let Some(value) = redacted.get_mut(*key) {
                    *value = Value::String("[REDACTED]".to_string());
                }
            }
            Value::Object(redacted)
        }
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::mock::MockProvider;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn descriptor(name: &str) -> ToolDescriptor {
        ToolDescriptor::new(name, "a test tool", json!({"type": "object"}))
    }

    async fn echo_dispatch(
        _provider: Arc<dyn Provider>,
        tool_name: String,
        arguments: Value,
    ) -> Result<Envelope> {
        Ok(Envelope::success(json!({
            "tool": tool_name,
            "arguments": arguments,
        })))
    }

    fn registry() -> ToolRegistry {
        ToolRegistry::new(Arc::new(MockProvider::new()))
    }

    #[tokio::test]
    async fn registered_tool_dispatches() {
        let mut registry = registry();
        registry
            .register_module(vec![descriptor("echo")], echo_dispatch)
            .unwrap();

        let envelope = registry.execute_tool("echo", json!({"x": 1})).await;
        assert!(envelope.success);
        assert_eq!(envelope.data.unwrap()["arguments"], json!({"x": 1}));
    }

    #[tokio::test]
    async fn duplicate_registration_fails_and_keeps_first() {
        let mut registry = registry();
        registry
            .register_module(vec![descriptor("echo")], echo_dispatch)
            .unwrap();

        let result = registry.register_module(vec![descriptor("echo")], echo_dispatch);
        assert!(matches!(
            result,
            Err(FalconError::DuplicateTool { tool_name }) if tool_name == "echo"
        ));

        // First registration still dispatches.
        let envelope = registry.execute_tool("echo", json!({})).await;
        assert!(envelope.success);
    }

    #[tokio::test]
    async fn unknown_tool_is_a_404_envelope() {
        let registry = registry();
        let envelope = registry.execute_tool("does_not_exist", json!({})).await;

        assert!(!envelope.success);
        assert_eq!(envelope.status_code, Some(404));
        assert_eq!(
            envelope.error,
            Some("Tool 'does_not_exist' not found".into())
        );
    }

    #[tokio::test]
    async fn handler_errors_become_500_envelopes() {
        async fn failing_dispatch(
            _provider: Arc<dyn Provider>,
            _tool_name: String,
            _arguments: Value,
        ) -> Result<Envelope> {
            Err(FalconError::NotInitialized)
        }

        let mut registry = registry();
        registry
            .register_module(vec![descriptor("broken")], failing_dispatch)
            .unwrap();

        let envelope = registry.execute_tool("broken", json!({})).await;
        assert!(!envelope.success);
        assert_eq!(envelope.status_code, Some(500));
        assert_eq!(
            envelope.error,
            Some("Tool execution failed: Provider not initialized".into())
        );
    }

    #[test]
    fn redaction_masks_denylisted_keys() {
        let arguments = json!({"filter": "x", "token": "abc", "secret": "def"});
        let redacted = redact_arguments(&arguments);
        assert_eq!(redacted["filter"], "x");
        assert_eq!(redacted["token"], "[REDACTED]");
        assert_eq!(redacted["secret"], "[REDACTED]");
    }

    #[test]
    fn mcp_format_uses_camel_case_schema_key() {
        let value = descriptor("echo").to_mcp_format();
        assert_eq!(value["name"], "echo");
        assert!(value.get("inputSchema").is_some());
    }
}
