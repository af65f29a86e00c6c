//! HTTP/SSE transport for the Falcon MCP server.
//!
//! Exposes tool discovery, tool execution, and a heartbeat event stream
//! over axum, in front of [`falcon_core::server::McpServer`].

pub mod error;
pub mod handlers;
pub mod state;

pub use error::{ServerError, ServerResult};
pub use state::AppState;

use std::net::SocketAddr;
use std::sync::Arc;

use falcon_core::config::{Environment, Settings};
use falcon_core::server::McpServer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Initialize the MCP server and serve it until ctrl-c, then shut the
/// provider session down cleanly.
pub async fn start_server(settings: Settings) -> ServerResult<()> {
    let server = Arc::new(falcon_core::create_server(settings.clone()).await?);

    let app = build_router(server.clone());

    let addr: SocketAddr =
        format!("{}:{}", settings.server_host, settings.server_port).parse()?;
    tracing::info!(
        %addr,
        environment = %settings.environment,
        "Falcon MCP server listening"
    );

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Shutting down");
    server.shutdown().await?;
    Ok(())
}

/// Build the full application router around an initialized server.
pub fn build_router(server: Arc<McpServer>) -> axum::Router {
    let permissive_cors = matches!(
        server.settings().environment,
        Environment::Development | Environment::Demo
    );

    let mut app = handlers::routes();
    if permissive_cors {
        app = app.layer(CorsLayer::permissive());
    }
    app.layer(TraceLayer::new_for_http())
        .with_state(AppState::new(server))
}

async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::error!(%error, "Failed to listen for shutdown signal");
    }
}
