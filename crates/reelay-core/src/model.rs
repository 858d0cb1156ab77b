//! Job record model and its state machine.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{JobError, JobResult};

/// Opaque job identifier; also embedded in the artifact filename.
pub type JobId = Uuid;

/// Upper bound on the standard error text retained per job.
pub const STDERR_TAIL_LIMIT: usize = 16 * 1024;

/// Lifecycle status of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// The extraction tool is running or waiting to run.
    Running,
    /// The artifact exists on disk.
    Finished,
    /// The job failed; see the retained diagnostics.
    Error,
}

impl JobStatus {
    /// Whether the status is terminal.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Finished | Self::Error)
    }

    /// Stable lowercase label used in logs and metrics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Finished => "finished",
            Self::Error => "error",
        }
    }
}

/// Partial state produced by parsing a single line of tool output.
///
/// Only fields that were actually matched are set; merging an update never
/// clears previously observed values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProgressUpdate {
    /// Destination filename announced by the tool.
    pub destination: Option<String>,
    /// Completion percentage.
    pub percent: Option<f64>,
    /// Transfer rate, e.g. `1.2MiB/s`.
    pub speed: Option<String>,
    /// Remaining time estimate, e.g. `00:07`.
    pub eta: Option<String>,
}

impl ProgressUpdate {
    /// Returns true when no field was matched.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.destination.is_none()
            && self.percent.is_none()
            && self.speed.is_none()
            && self.eta.is_none()
    }
}

/// Mutable state describing one submitted download.
///
/// Fields are private so the status can only move `running -> finished` or
/// `running -> error`; every mutator is a no-op once the record is terminal.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobRecord {
    id: JobId,
    status: JobStatus,
    percent: f64,
    speed: Option<String>,
    eta: Option<String>,
    output_file: Option<PathBuf>,
    stderr: String,
    #[serde(skip)]
    serving: bool,
}

impl JobRecord {
    /// Fresh running record with no progress observed.
    #[must_use]
    pub const fn new(id: JobId) -> Self {
        Self {
            id,
            status: JobStatus::Running,
            percent: 0.0,
            speed: None,
            eta: None,
            output_file: None,
            stderr: String::new(),
            serving: false,
        }
    }

    /// Job identifier.
    #[must_use]
    pub const fn id(&self) -> JobId {
        self.id
    }

    /// Current status.
    #[must_use]
    pub const fn status(&self) -> JobStatus {
        self.status
    }

    /// Last known completion percentage in `[0, 100]`.
    #[must_use]
    pub const fn percent(&self) -> f64 {
        self.percent
    }

    /// Last observed transfer rate.
    #[must_use]
    pub fn speed(&self) -> Option<&str> {
        self.speed.as_deref()
    }

    /// Last observed remaining time estimate.
    #[must_use]
    pub fn eta(&self) -> Option<&str> {
        self.eta.as_deref()
    }

    /// Output path, when known.
    #[must_use]
    pub fn output_file(&self) -> Option<&Path> {
        self.output_file.as_deref()
    }

    /// Retained tail of the tool's standard error.
    #[must_use]
    pub fn stderr(&self) -> &str {
        &self.stderr
    }

    /// Merge a parsed update, applying only the fields that were matched.
    pub fn apply(&mut self, update: ProgressUpdate) {
        if self.status.is_terminal() {
            return;
        }
        if let Some(destination) = update.destination {
            self.output_file = Some(PathBuf::from(destination));
        }
        if let Some(percent) = update.percent {
            self.percent = percent.clamp(0.0, 100.0);
        }
        if update.speed.is_some() {
            self.speed = update.speed;
        }
        if update.eta.is_some() {
            self.eta = update.eta;
        }
    }

    /// Append diagnostic text, keeping at most [`STDERR_TAIL_LIMIT`] trailing bytes.
    pub fn append_stderr(&mut self, text: &str) {
        if self.status.is_terminal() || text.is_empty() {
            return;
        }
        self.stderr.push_str(text);
        if !text.ends_with('\n') {
            self.stderr.push('\n');
        }
        if self.stderr.len() > STDERR_TAIL_LIMIT {
            let mut cut = self.stderr.len() - STDERR_TAIL_LIMIT;
            while !self.stderr.is_char_boundary(cut) {
                cut += 1;
            }
            self.stderr.drain(..cut);
        }
    }

    /// Transition to `finished` with the reconciled artifact path.
    ///
    /// Returns `false` when the record was already terminal.
    pub fn finish(&mut self, output_file: PathBuf) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        self.status = JobStatus::Finished;
        self.percent = 100.0;
        self.output_file = Some(output_file);
        true
    }

    /// Whether a transfer currently holds the artifact.
    #[must_use]
    pub const fn is_serving(&self) -> bool {
        self.serving
    }

    /// Claim the finished artifact for a single transfer.
    ///
    /// # Errors
    ///
    /// - [`JobError::NotReady`] when the job has not finished.
    /// - [`JobError::NotFound`] when no artifact is recorded or another
    ///   transfer already holds it.
    pub fn claim_artifact(&mut self) -> JobResult<PathBuf> {
        if self.status != JobStatus::Finished {
            return Err(JobError::NotReady {
                job_id: self.id,
                status: self.status,
            });
        }
        if self.serving {
            return Err(JobError::NotFound { job_id: self.id });
        }
        let path = self
            .output_file
            .clone()
            .ok_or(JobError::NotFound { job_id: self.id })?;
        self.serving = true;
        Ok(path)
    }

    /// Give the artifact back after an incomplete transfer.
    pub const fn release_artifact(&mut self) {
        self.serving = false;
    }

    /// Transition to `error`, dropping any announced output path.
    ///
    /// Returns `false` when the record was already terminal.
    pub fn fail(&mut self) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        self.status = JobStatus::Error;
        self.output_file = None;
        true
    }
}

/// Per-status job totals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct JobCounts {
    /// Jobs still running (or waiting for a slot).
    pub running: usize,
    /// Jobs whose artifact is ready.
    pub finished: usize,
    /// Failed jobs not yet evicted.
    pub error: usize,
}

impl JobCounts {
    /// Count a record's status.
    pub const fn record(&mut self, status: JobStatus) {
        match status {
            JobStatus::Running => self.running += 1,
            JobStatus::Finished => self.finished += 1,
            JobStatus::Error => self.error += 1,
        }
    }
}

/// Validated extraction request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadRequest {
    /// Source media URL.
    pub url: String,
    /// Optional format selector; `mp3` requests audio extraction.
    pub format: Option<String>,
}

impl DownloadRequest {
    /// Build a request, rejecting a missing or blank URL.
    ///
    /// # Errors
    ///
    /// Returns [`JobError::MissingInput`] when `url` is absent or blank.
    pub fn new(url: Option<&str>, format: Option<&str>) -> JobResult<Self> {
        let url = require_url(url)?;
        let format = format
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_string);
        Ok(Self {
            url: url.to_string(),
            format,
        })
    }
}

/// Return the trimmed URL or [`JobError::MissingInput`].
///
/// # Errors
///
/// Returns [`JobError::MissingInput`] when `url` is absent or blank.
pub fn require_url(url: Option<&str>) -> JobResult<&str> {
    url.map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or(JobError::MissingInput { field: "url" })
}
