//! Event payload types carried across the platform.

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Identifier assigned to each event emitted by the platform.
pub type EventId = u64;

/// Default buffer size for the in-memory replay ring.
pub const DEFAULT_REPLAY_CAPACITY: usize = 1_024;

/// Job lifecycle events surfaced across the system.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// A download was accepted and its record registered.
    JobQueued {
        /// Identifier for the accepted job.
        job_id: Uuid,
        /// Source URL submitted by the client.
        url: String,
    },
    /// The extraction subprocess for a job was launched.
    JobStarted {
        /// Identifier for the running job.
        job_id: Uuid,
    },
    /// The job finished and its artifact was located on disk.
    JobFinished {
        /// Identifier for the finished job.
        job_id: Uuid,
        /// Absolute path to the produced artifact.
        output_file: String,
    },
    /// The job failed; the record is terminal.
    JobFailed {
        /// Identifier for the failed job.
        job_id: Uuid,
        /// Short diagnostic suitable for logs and clients.
        message: String,
    },
    /// The artifact for a job was fully streamed to a client.
    ArtifactServed {
        /// Identifier for the served job.
        job_id: Uuid,
    },
    /// The artifact file was removed from disk and the record evicted.
    ArtifactDeleted {
        /// Identifier for the evicted job.
        job_id: Uuid,
    },
}

impl Event {
    /// Machine-friendly discriminator for SSE consumers.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::JobQueued { .. } => "job_queued",
            Self::JobStarted { .. } => "job_started",
            Self::JobFinished { .. } => "job_finished",
            Self::JobFailed { .. } => "job_failed",
            Self::ArtifactServed { .. } => "artifact_served",
            Self::ArtifactDeleted { .. } => "artifact_deleted",
        }
    }

    /// Identifier of the job the event refers to.
    #[must_use]
    pub const fn job_id(&self) -> Uuid {
        match self {
            Self::JobQueued { job_id, .. }
            | Self::JobStarted { job_id }
            | Self::JobFinished { job_id, .. }
            | Self::JobFailed { job_id, .. }
            | Self::ArtifactServed { job_id }
            | Self::ArtifactDeleted { job_id } => *job_id,
        }
    }
}

/// Metadata wrapper around events. Each envelope tracks the event id and
/// emission timestamp.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct EventEnvelope {
    /// Sequential identifier assigned by the bus.
    pub id: EventId,
    /// Emission timestamp.
    pub timestamp: DateTime<Utc>,
    /// Event payload.
    pub event: Event,
}
