//! Server-sent events stream.
//!
//! Emits a `connected` event on subscribe, then a heartbeat every 30
//! seconds so intermediaries keep the connection open.

use std::convert::Infallible;
use std::time::Duration;

use axum::extract::State;
use axum::response::sse::{Event, Sse};
use futures::stream::{self, Stream, StreamExt};
use serde_json::json;
use tokio::time::{Instant, interval_at};
use tokio_stream::wrappers::IntervalStream;

use crate::state::AppState;

const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

pub async fn event_stream(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    tracing::info!("SSE client connected");

    let environment = state.server.settings().environment.as_str().to_string();
    let connected = stream::once(async move {
        Ok(Event::default().event("connected").data(
            json!({
                "service": "falcon-mcp-server",
                "environment": environment,
            })
            .to_string(),
        ))
    });

    // Skip the interval's immediate first tick.
    let timer = interval_at(Instant::now() + HEARTBEAT_INTERVAL, HEARTBEAT_INTERVAL);
    let heartbeats = IntervalStream::new(timer)
        .map(|_| Ok(Event::default().event("heartbeat").data(json!({"alive": true}).to_string())));

    Sse::new(connected.chain(heartbeats))
}
