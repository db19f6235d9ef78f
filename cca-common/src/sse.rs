//! Server-Sent Events (SSE) utilities

use crate::events::{CcaEvent, EventBus};
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::Stream;
use std::convert::Infallible;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

/// Heartbeat-only stream for services without domain events
pub fn create_heartbeat_sse_stream(
    service_name: &'static str,
    interval: Duration,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    info!("New SSE client connected to {} events", service_name);

    let stream = async_stream::stream! {
        yield Ok(Event::default().event("ConnectionStatus").data("connected"));

        loop {
            tokio::time::sleep(interval).await;
            debug!("SSE: Sending heartbeat");
            yield Ok(Event::default().comment("heartbeat"));
        }
    };

    Sse::new(stream).keep_alive(KeepAlive::new().interval(interval).text("heartbeat"))
}

/// Render a domain event as an SSE frame named after its type
pub fn to_sse_event(event: &CcaEvent) -> Event {
    let data = serde_json::to_string(event).unwrap_or_else(|_| "{}".to_string());
    Event::default().event(event.event_type()).data(data)
}

/// Forward bus events to one client, optionally only those for `user_id`
///
/// A lagging client skips missed events and keeps streaming; the stream ends
/// when the bus is dropped.
pub fn create_event_sse_stream(
    service_name: &'static str,
    bus: &EventBus,
    user_id: Option<String>,
    interval: Duration,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    info!(
        user_id = user_id.as_deref().unwrap_or("*"),
        "New SSE client connected to {} events", service_name
    );
    let mut rx = bus.subscribe();

    let stream = async_stream::stream! {
        yield Ok(Event::default().event("ConnectionStatus").data("connected"));

        loop {
            match rx.recv().await {
                Ok(event) => {
                    if let Some(filter) = &user_id {
                        if event.user_id() != filter {
                            continue;
                        }
                    }
                    yield Ok(to_sse_event(&event));
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "SSE client lagged, events dropped");
                }
                Err(RecvError::Closed) => {
                    debug!("SSE: event bus closed");
                    break;
                }
            }
        }
    };

    Sse::new(stream).keep_alive(KeepAlive::new().interval(interval).text("heartbeat"))
}
