//! Health and metrics endpoints.

use std::sync::Arc;

use axum::{Json, body::Body, extract::State, http::StatusCode, response::Response};
use reelay_core::JobCounts;
use reelay_telemetry::{MetricsSnapshot, build_sha};
use serde::Serialize;
use tracing::error;

use crate::http::errors::ApiError;
use crate::state::ApiState;

#[derive(Serialize)]
pub(crate) struct HealthResponse {
    pub(crate) status: &'static str,
    pub(crate) build: &'static str,
    pub(crate) jobs: JobCounts,
    pub(crate) metrics: MetricsSnapshot,
}

pub(crate) async fn health(State(state): State<Arc<ApiState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        build: build_sha(),
        jobs: state.registry.counts(),
        metrics: state.telemetry.snapshot(),
    })
}

pub(crate) async fn metrics(State(state): State<Arc<ApiState>>) -> Result<Response, ApiError> {
    match state.telemetry.render() {
        Ok(body) => Response::builder()
            .status(StatusCode::OK)
            .header(
                axum::http::header::CONTENT_TYPE,
                "text/plain; version=0.0.4",
            )
            .body(Body::from(body))
            .map_err(|err| {
                error!(error = %err, "failed to build metrics response");
                ApiError::internal("failed to build metrics response")
            }),
        Err(err) => {
            error!(error = %err, "failed to render metrics");
            Err(ApiError::internal("failed to render metrics"))
        }
    }
}
