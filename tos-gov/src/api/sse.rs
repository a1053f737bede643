//! GET /events - domain event stream

use axum::{extract::State, response::sse::{Event, Sse}};
use futures::stream::Stream;
use std::convert::Infallible;

use crate::AppState;

pub async fn event_stream(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    tos_common::sse::create_event_sse_stream("tos-gov", &state.event_bus)
}
