//! Application state.

use std::sync::Arc;

use falcon_core::server::McpServer;

#[derive(Clone)]
pub struct AppState {
    pub server: Arc<McpServer>,
}

impl AppState {
    pub fn new(server: Arc<McpServer>) -> Self {
        Self { server }
    }
}
