//! Server-Sent Events endpoint

use axum::extract::{Query, State};
use axum::response::sse::{Event, Sse};
use cca_common::db::settings;
use cca_common::sse::create_event_sse_stream;
use futures::stream::Stream;
use serde::Deserialize;
use std::convert::Infallible;
use std::time::Duration;

use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct EventsQuery {
    /// Only forward events about this user
    pub user_id: Option<String>,
}

/// GET /events[?user_id=...]
///
/// Streams result and job events as they happen.
pub async fn event_stream(
    State(state): State<AppState>,
    Query(query): Query<EventsQuery>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let interval = settings::sse_heartbeat_interval(&state.db)
        .await
        .unwrap_or(Duration::from_secs(15));
    create_event_sse_stream("cca-re", &state.events, query.user_id, interval)
}
