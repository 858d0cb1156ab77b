//! Per-job progress push stream.
//!
//! Each tick reads one registry snapshot and pushes it as a `progress` event;
//! the first terminal snapshot is followed by a single `done` event and the
//! stream ends. A slow consumer only ever sees the latest snapshot because
//! missed ticks are skipped rather than queued. Dropping the response (client
//! disconnect) drops the stream and its interval; the job keeps running.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use async_stream::stream;
use axum::{
    extract::{Path as AxumPath, State},
    response::sse::{self, Sse},
};
use reelay_core::{JobError, JobId, JobRegistry, JobStatus};
use serde_json::json;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, error};

use crate::http::constants::{EVENT_DONE, EVENT_PROGRESS, SSE_KEEP_ALIVE_SECS};
use crate::http::errors::ApiError;
use crate::http::jobs::parse_job_id;
use crate::state::ApiState;

pub(crate) async fn stream_progress(
    State(state): State<Arc<ApiState>>,
    AxumPath(raw_id): AxumPath<String>,
) -> Result<Sse<impl futures_core::Stream<Item = Result<sse::Event, Infallible>> + Send>, ApiError>
{
    let job_id = parse_job_id(&raw_id)?;
    if state.registry.get(job_id).is_none() {
        return Err(JobError::NotFound { job_id }.into());
    }

    let stream = progress_stream(state.registry.clone(), job_id, state.progress_interval);
    Ok(Sse::new(stream).keep_alive(
        sse::KeepAlive::new()
            .interval(Duration::from_secs(SSE_KEEP_ALIVE_SECS))
            .text("keep-alive"),
    ))
}

pub(crate) fn progress_stream(
    registry: JobRegistry,
    job_id: JobId,
    period: Duration,
) -> impl futures_core::Stream<Item = Result<sse::Event, Infallible>> + Send {
    stream! {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            // Records are only evicted once a finished artifact has been served.
            let Some(record) = registry.get(job_id) else {
                debug!(%job_id, "job evicted while streaming progress");
                yield Ok(done_event(JobStatus::Finished));
                break;
            };

            match serde_json::to_string(&record) {
                Ok(payload) => {
                    yield Ok(sse::Event::default().event(EVENT_PROGRESS).data(payload));
                }
                Err(err) => error!(%job_id, error = %err, "failed to serialise job snapshot"),
            }

            let status = record.status();
            if status.is_terminal() {
                yield Ok(done_event(status));
                break;
            }
        }
    }
}

fn done_event(status: JobStatus) -> sse::Event {
    sse::Event::default()
        .event(EVENT_DONE)
        .data(json!({ "status": status }).to_string())
}
