//! Falcon MCP Server
//!
//! HTTP/SSE transport exposing CrowdStrike Falcon tools over MCP.

use falcon_core::Settings;
use falcon_server::start_server;
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> miette::Result<()> {
    // Load .env file if it exists
    let _ = dotenvy::dotenv();
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .with_cause_chain()
                .color(true)
                .context_lines(5)
                .build(),
        )
    }))?;
    miette::set_panic_hook();

    let settings = Settings::from_env()?;

    // RUST_LOG wins; otherwise scope the configured level to our crates.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = &settings.log_level;
        EnvFilter::new(format!("falcon_core={level},falcon_server={level}"))
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_file(true)
        .with_line_number(true)
        .with_timer(tracing_subscriber::fmt::time::LocalTime::rfc_3339())
        .init();

    start_server(settings).await.into_diagnostic()?;

    Ok(())
}
