use std::convert::Infallible;

use axum::response::sse::Event;
use futures::{future, Stream, StreamExt};

use battle_core::events::DebateEvent;

/// One SSE frame per debate event: the event type as the SSE event name and
/// the full record as JSON data.
pub fn to_sse_event(event: &DebateEvent) -> Option<Event> {
    match Event::default().event(event.kind.as_str()).json_data(event) {
        Ok(frame) => Some(frame),
        Err(e) => {
            tracing::warn!(event_type = %event.kind, error = %e, "failed to serialize debate event");
            None
        }
    }
}

/// Adapt a debate event stream for `axum::response::Sse`.
pub fn sse_stream<S>(events: S) -> impl Stream<Item = Result<Event, Infallible>>
where
    S: Stream<Item = DebateEvent>,
{
    events.filter_map(|event| future::ready(to_sse_event(&event).map(Ok)))
}
