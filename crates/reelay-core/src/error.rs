//! Error taxonomy shared by the job orchestration crates.

use std::error::Error;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::model::{JobId, JobStatus};

/// Primary error type for job operations.
#[derive(Debug, Error)]
pub enum JobError {
    /// The client omitted a required field.
    #[error("missing required input")]
    MissingInput {
        /// Name of the missing field.
        field: &'static str,
    },
    /// The extraction tool exited unsuccessfully.
    #[error("extraction tool failed")]
    UpstreamTool {
        /// Operation being performed.
        operation: &'static str,
        /// Exit code when the process exited normally.
        exit_code: Option<i32>,
        /// Diagnostic text captured from standard error.
        stderr: String,
    },
    /// The extraction tool produced output that could not be parsed.
    #[error("extraction tool produced malformed output")]
    MalformedOutput {
        /// Operation being performed.
        operation: &'static str,
        /// Underlying parse failure.
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
    /// The job or its artifact does not exist.
    #[error("job not found")]
    NotFound {
        /// Missing job identifier.
        job_id: JobId,
    },
    /// The artifact was requested before the job finished.
    #[error("artifact not ready")]
    NotReady {
        /// Job identifier.
        job_id: JobId,
        /// Status observed at request time.
        status: JobStatus,
    },
    /// The extraction tool could not be launched.
    #[error("failed to launch extraction tool")]
    Spawn {
        /// Program that failed to start.
        program: String,
        /// Underlying IO failure.
        #[source]
        source: io::Error,
    },
    /// A filesystem operation failed.
    #[error("filesystem operation failed")]
    Io {
        /// Operation being performed.
        operation: &'static str,
        /// Path involved in the failure.
        path: PathBuf,
        /// Underlying IO failure.
        #[source]
        source: io::Error,
    },
}

/// Convenience alias for job operation results.
pub type JobResult<T> = Result<T, JobError>;
