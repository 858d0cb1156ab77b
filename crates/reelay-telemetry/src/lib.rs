#![forbid(unsafe_code)]
#![deny(
    warnings,
    dead_code,
    unused,
    unused_imports,
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]
#![allow(clippy::module_name_repetitions)]

//! Telemetry primitives shared across the Reelay workspace.
//!
//! This crate centralises logging, metrics, and request-scoped tracing helpers so the
//! supervisor and HTTP surfaces share a consistent observability story.
//! Layout: `init.rs` (subscriber), `context.rs` (spans, request context, request-id
//! middleware), `metrics.rs` (Prometheus), `error.rs`.

pub mod context;
pub mod error;
pub mod init;
pub mod metrics;

pub use context::{
    GlobalContextGuard, RequestIdLayers, current_request_id, current_route, request_id_layers,
    with_request_context,
};
pub use error::{Result, TelemetryError};
pub use init::{DEFAULT_LOG_LEVEL, LogFormat, LoggingConfig, build_sha, init_logging};
pub use metrics::{Metrics, MetricsSnapshot};
