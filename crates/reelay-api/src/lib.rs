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

//! HTTP surface for Reelay.
//!
//! Layout: `http/router.rs` (server host), `http/jobs.rs` (metadata, job
//! submission, artifact download), `http/progress.rs` (per-job progress push
//! stream), `http/sse.rs` (lifecycle event feed), `http/health.rs`,
//! `http/telemetry.rs` (request metrics), `http/errors.rs` (error bodies).

pub mod error;
pub mod http;
mod state;

use std::sync::Arc;

use reelay_core::{JobWorkflow, MetadataSource};

pub use error::ApiServerError;
pub use http::router::ApiServer;

/// Trait objects the API uses to reach the extraction adapter.
#[derive(Clone)]
pub struct JobHandles {
    workflow: Arc<dyn JobWorkflow>,
    metadata: Arc<dyn MetadataSource>,
}

impl JobHandles {
    /// Bundle the workflow and metadata implementations.
    #[must_use]
    pub fn new(workflow: Arc<dyn JobWorkflow>, metadata: Arc<dyn MetadataSource>) -> Self {
        Self { workflow, metadata }
    }

    /// Job submission workflow.
    #[must_use]
    pub fn workflow(&self) -> &Arc<dyn JobWorkflow> {
        &self.workflow
    }

    /// Metadata source.
    #[must_use]
    pub fn metadata(&self) -> &Arc<dyn MetadataSource> {
        &self.metadata
    }
}
