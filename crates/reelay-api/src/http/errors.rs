//! JSON error bodies and the job error mapping.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use reelay_core::JobError;
use reelay_telemetry::{current_request_id, current_route};
use serde::Serialize;
use tracing::{error, warn};

use crate::http::constants::{
    PROBLEM_BAD_REQUEST, PROBLEM_INTERNAL, PROBLEM_NOT_FOUND, PROBLEM_NOT_READY, PROBLEM_UPSTREAM,
};

/// Structured API error rendered as `{error, details?, kind, status}`.
#[derive(Debug)]
pub(crate) struct ApiError {
    pub(crate) status: StatusCode,
    pub(crate) kind: &'static str,
    title: &'static str,
    details: Option<String>,
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<&'a str>,
    kind: &'a str,
    status: u16,
}

impl ApiError {
    const fn new(status: StatusCode, kind: &'static str, title: &'static str) -> Self {
        Self {
            status,
            kind,
            title,
            details: None,
        }
    }

    pub(crate) fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub(crate) fn internal(details: impl Into<String>) -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            PROBLEM_INTERNAL,
            "internal server error",
        )
        .with_details(details)
    }

    pub(crate) fn bad_request(details: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, PROBLEM_BAD_REQUEST, "bad request")
            .with_details(details)
    }

    pub(crate) fn not_found(details: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, PROBLEM_NOT_FOUND, "not found").with_details(details)
    }

    const fn not_ready() -> Self {
        Self::new(StatusCode::BAD_REQUEST, PROBLEM_NOT_READY, "file not ready")
    }

    const fn upstream() -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            PROBLEM_UPSTREAM,
            "extraction tool failed",
        )
    }
}

impl From<JobError> for ApiError {
    fn from(err: JobError) -> Self {
        let mapped = match &err {
            JobError::MissingInput { field } => {
                Self::bad_request(format!("missing required field `{field}`"))
            }
            JobError::UpstreamTool { stderr, .. } => Self::upstream().with_details(stderr.trim()),
            JobError::MalformedOutput { source, .. } => {
                Self::internal(format!("extraction tool output could not be parsed: {source}"))
            }
            JobError::NotFound { .. } => Self::not_found("job not found"),
            JobError::NotReady { status, .. } => {
                Self::not_ready().with_details(format!("job is {}", status.as_str()))
            }
            JobError::Spawn { .. } | JobError::Io { .. } => Self::internal(err.to_string()),
        };
        if mapped.status.is_server_error() {
            error!(
                error = ?err,
                route = current_route().as_deref().unwrap_or_default(),
                request_id = current_request_id().as_deref().unwrap_or_default(),
                "request failed"
            );
        } else {
            warn!(error = %err, "request rejected");
        }
        mapped
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.title,
            details: self.details.as_deref(),
            kind: self.kind,
            status: self.status.as_u16(),
        };
        (self.status, Json(body)).into_response()
    }
}
