//! Traits implemented by extraction adapters and consumed by the API layer.

use async_trait::async_trait;

use crate::error::JobResult;
use crate::metadata::MetadataSummary;
use crate::model::{DownloadRequest, JobId};

/// Starts extraction jobs.
#[async_trait]
pub trait JobWorkflow: Send + Sync {
    /// Register a running job and launch it in the background.
    ///
    /// The record is visible in the registry before the identifier is returned.
    async fn start_job(&self, request: DownloadRequest) -> JobResult<JobId>;
}

/// Fetches metadata for a media URL.
#[async_trait]
pub trait MetadataSource: Send + Sync {
    /// Run the tool in metadata mode and normalise its output.
    async fn fetch_info(&self, url: &str) -> JobResult<MetadataSummary>;
}
