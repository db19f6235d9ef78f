//! Server-Sent Events endpoint (heartbeat only)

use axum::extract::State;
use axum::response::sse::{Event, Sse};
use cca_common::db::settings;
use cca_common::sse::create_heartbeat_sse_stream;
use futures::stream::Stream;
use std::convert::Infallible;
use std::time::Duration;

use crate::AppState;

/// GET /events
pub async fn event_stream(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let interval = settings::sse_heartbeat_interval(&state.db)
        .await
        .unwrap_or(Duration::from_secs(15));
    create_heartbeat_sse_stream("cca-ct", interval)
}
