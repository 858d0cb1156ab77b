//! HTTP surface modules (router, handlers, streaming endpoints).

/// Shared constants and header names.
pub mod constants;
/// Error bodies and job error mapping.
pub mod errors;
/// Health and metrics endpoints.
pub mod health;
/// Metadata, submission and artifact handlers.
pub mod jobs;
/// Per-job progress push stream.
pub mod progress;
/// Router construction and server host.
pub mod router;
/// Lifecycle event feed.
pub mod sse;
/// Request metrics middleware.
pub mod telemetry;
