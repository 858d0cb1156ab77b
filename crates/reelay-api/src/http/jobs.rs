//! Metadata lookup, job submission and artifact download handlers.

use std::path::Path;
use std::sync::Arc;

use axum::{
    Json,
    body::Body,
    extract::{Path as AxumPath, State, rejection::JsonRejection},
    http::{
        HeaderValue, StatusCode,
        header::{CONTENT_DISPOSITION, CONTENT_LENGTH, CONTENT_TYPE},
    },
    response::Response,
};
use reelay_core::{DownloadRequest, JobId, MetadataSummary, require_url};
use serde::{Deserialize, Serialize};
use tracing::{error, info};
use uuid::Uuid;

use crate::http::errors::ApiError;
use crate::state::ApiState;

#[derive(Debug, Default, Deserialize)]
pub(crate) struct InfoRequest {
    #[serde(default)]
    pub(crate) url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct DownloadBody {
    #[serde(default)]
    pub(crate) url: Option<String>,
    #[serde(default)]
    pub(crate) format: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct DownloadAccepted {
    pub(crate) job_id: JobId,
}

pub(crate) async fn fetch_info(
    State(state): State<Arc<ApiState>>,
    payload: Result<Json<InfoRequest>, JsonRejection>,
) -> Result<Json<MetadataSummary>, ApiError> {
    let Json(body) = payload.map_err(|rejection| ApiError::bad_request(rejection.body_text()))?;
    let url = require_url(body.url.as_deref())?;
    let summary = state.jobs.metadata().fetch_info(url).await?;
    Ok(Json(summary))
}

pub(crate) async fn start_download(
    State(state): State<Arc<ApiState>>,
    payload: Result<Json<DownloadBody>, JsonRejection>,
) -> Result<Json<DownloadAccepted>, ApiError> {
    let Json(body) = payload.map_err(|rejection| ApiError::bad_request(rejection.body_text()))?;
    let request = DownloadRequest::new(body.url.as_deref(), body.format.as_deref())?;
    let job_id = state.jobs.workflow().start_job(request).await?;
    Ok(Json(DownloadAccepted { job_id }))
}

pub(crate) async fn download_file(
    State(state): State<Arc<ApiState>>,
    AxumPath(raw_id): AxumPath<String>,
) -> Result<Response, ApiError> {
    let job_id = parse_job_id(&raw_id)?;
    let artifact = state.artifacts.open(job_id).await?;
    info!(%job_id, file = %artifact.file_name, bytes = artifact.len, "serving artifact");

    let disposition = HeaderValue::from_str(&format!(
        "attachment; filename=\"{}\"",
        artifact.file_name
    ))
    .map_err(|err| {
        error!(error = %err, "artifact name is not a valid header value");
        ApiError::internal("failed to build download response")
    })?;

    Response::builder()
        .status(StatusCode::OK)
        .header(CONTENT_TYPE, content_type_for(&artifact.file_name))
        .header(CONTENT_LENGTH, artifact.len)
        .header(CONTENT_DISPOSITION, disposition)
        .body(Body::from_stream(artifact.stream))
        .map_err(|err| {
            error!(error = %err, "failed to build download response");
            ApiError::internal("failed to build download response")
        })
}

/// Identifiers that do not parse can never name a job, so they are reported as unknown.
pub(crate) fn parse_job_id(raw: &str) -> Result<JobId, ApiError> {
    Uuid::parse_str(raw).map_err(|_| ApiError::not_found("job not found"))
}

fn content_type_for(file_name: &str) -> &'static str {
    let ext = Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("mp4") => "video/mp4",
        Some("webm") => "video/webm",
        Some("mkv") => "video/x-matroska",
        Some("mp3") => "audio/mpeg",
        Some("m4a") => "audio/mp4",
        Some("opus" | "ogg") => "audio/ogg",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_type_follows_extension() {
        assert_eq!(content_type_for("file_x.mp4"), "video/mp4");
        assert_eq!(content_type_for("file_x.MP3"), "audio/mpeg");
        assert_eq!(content_type_for("file_x.m4a"), "audio/mp4");
        assert_eq!(content_type_for("file_x"), "application/octet-stream");
    }

    #[test]
    fn malformed_job_id_is_not_found() {
        let err = parse_job_id("not-a-uuid").expect_err("rejected");
        assert_eq!(err.status, StatusCode::NOT_FOUND);
        assert!(parse_job_id(&Uuid::new_v4().to_string()).is_ok());
    }
}
