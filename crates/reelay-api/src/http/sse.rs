//! Lifecycle event feed over server-sent events.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use async_stream::stream;
use axum::{
    extract::{Query, State},
    http::HeaderMap,
    response::sse::{self, Sse},
};
use futures_util::{StreamExt, future};
use reelay_events::{EventBus, EventEnvelope, EventId};
use serde::Deserialize;
use tracing::{error, warn};
use uuid::Uuid;

use crate::http::constants::{HEADER_LAST_EVENT_ID, SSE_KEEP_ALIVE_SECS};
use crate::state::ApiState;

#[derive(Debug, Default, Deserialize)]
pub(crate) struct EventsQuery {
    #[serde(default)]
    pub(crate) job: Option<String>,
}

pub(crate) async fn stream_events(
    State(state): State<Arc<ApiState>>,
    headers: HeaderMap,
    Query(query): Query<EventsQuery>,
) -> Sse<impl futures_core::Stream<Item = Result<sse::Event, Infallible>> + Send> {
    let last_id = headers
        .get(HEADER_LAST_EVENT_ID)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<EventId>().ok());

    let job_filter = query.job.as_deref().and_then(|raw| match Uuid::parse_str(raw) {
        Ok(id) => Some(id),
        Err(err) => {
            warn!(error = %err, job = raw, "ignoring malformed job filter");
            None
        }
    });

    let stream = event_sse_stream(state.events.clone(), last_id, job_filter);
    Sse::new(stream).keep_alive(
        sse::KeepAlive::new()
            .interval(Duration::from_secs(SSE_KEEP_ALIVE_SECS))
            .text("keep-alive"),
    )
}

pub(crate) fn event_replay_stream(
    bus: EventBus,
    since: Option<EventId>,
) -> impl futures_core::Stream<Item = EventEnvelope> + Send {
    stream! {
        let mut stream = bus.subscribe(since);
        while let Some(envelope) = stream.next().await {
            yield envelope;
        }
    }
}

pub(crate) fn event_sse_stream(
    bus: EventBus,
    since: Option<EventId>,
    job_filter: Option<Uuid>,
) -> impl futures_core::Stream<Item = Result<sse::Event, Infallible>> + Send {
    event_replay_stream(bus, since)
        .filter(move |envelope| {
            future::ready(job_filter.is_none_or(|job_id| envelope.event.job_id() == job_id))
        })
        .filter_map(|envelope| async move {
            match serde_json::to_string(&envelope) {
                Ok(payload) => Some(Ok(sse::Event::default()
                    .id(envelope.id.to_string())
                    .event(envelope.event.kind())
                    .data(payload))),
                Err(err) => {
                    error!(error = %err, "failed to serialise SSE event payload");
                    None
                }
            }
        })
}
