//! Metadata fetch through the tool's JSON dump mode.

use std::time::Duration;

use async_trait::async_trait;
use reelay_core::{JobError, JobResult, MetadataSource, MetadataSummary, parse_metadata};
use tracing::{debug, warn};

use crate::command::ToolCommand;

/// Runs `--dump-json` and normalises the result.
#[derive(Debug, Clone)]
pub struct MetadataFetcher {
    tool: ToolCommand,
    timeout: Option<Duration>,
}

impl MetadataFetcher {
    /// Construct a fetcher; `timeout` bounds each tool invocation.
    #[must_use]
    pub const fn new(tool: ToolCommand, timeout: Option<Duration>) -> Self {
        Self { tool, timeout }
    }
}

#[async_trait]
impl MetadataSource for MetadataFetcher {
    async fn fetch_info(&self, url: &str) -> JobResult<MetadataSummary> {
        let output = self
            .tool
            .output(
                ["--dump-json", "--no-playlist", "--no-warnings", "--", url],
                self.timeout,
            )
            .await?;

        if !output.success {
            warn!(url, code = ?output.exit_code, stderr = %output.stderr.trim_end(), "metadata fetch failed");
            return Err(JobError::UpstreamTool {
                operation: "metadata.fetch",
                exit_code: output.exit_code,
                stderr: output.stderr,
            });
        }

        let summary = parse_metadata(&output.stdout)?;
        debug!(url, formats = summary.formats.len(), "metadata fetched");
        Ok(summary)
    }
}
