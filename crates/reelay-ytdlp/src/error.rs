//! Process-level failures raised while driving the extraction tool.

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use reelay_core::JobError;
use thiserror::Error;

/// Result alias for tool invocations.
pub type ToolResult<T> = Result<T, ToolError>;

/// Errors raised while spawning or collecting the tool.
#[derive(Debug, Error)]
pub enum ToolError {
    /// The executable could not be started.
    #[error("failed to spawn extraction tool")]
    Spawn {
        /// Program that failed to start.
        program: String,
        /// Underlying IO error.
        source: io::Error,
    },
    /// Reading output or waiting for exit failed.
    #[error("extraction tool io failure")]
    Io {
        /// Operation that failed.
        operation: &'static str,
        /// Program being driven.
        program: String,
        /// Underlying IO error.
        source: io::Error,
    },
    /// The tool exceeded its time limit and was killed.
    #[error("extraction tool timed out")]
    Timeout {
        /// Limit that was exceeded.
        limit: Duration,
    },
}

impl From<ToolError> for JobError {
    fn from(err: ToolError) -> Self {
        match err {
            ToolError::Spawn { program, source } => Self::Spawn { program, source },
            ToolError::Io {
                operation,
                program,
                source,
            } => Self::Io {
                operation,
                path: PathBuf::from(program),
                source,
            },
            ToolError::Timeout { limit } => Self::UpstreamTool {
                operation: "tool.timeout",
                exit_code: None,
                stderr: format!("extraction timed out after {}s", limit.as_secs()),
            },
        }
    }
}
