//! Serve-once artifact lifecycle.
//!
//! A finished job's artifact is handed out as a byte stream. Opening claims
//! the record, so only one transfer can hold an artifact at a time. Once the
//! stream has yielded every byte (or reached end of file) the file is deleted
//! and the job record evicted, so a later request yields `NotFound`. A
//! transfer that is dropped early releases the claim and leaves both in place.

use std::fs;
use std::io;
use std::path::PathBuf;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures_core::Stream;
use reelay_core::{JobError, JobId, JobRecord, JobRegistry, JobResult};
use reelay_events::{Event, EventBus};
use reelay_telemetry::Metrics;
use tokio::fs::File;
use tokio_util::io::ReaderStream;
use tracing::{debug, info, warn};

use crate::store::ArtifactStore;

/// Locates, serves and deletes job artifacts.
#[derive(Clone)]
pub struct ArtifactManager {
    store: ArtifactStore,
    registry: JobRegistry,
    events: EventBus,
    metrics: Metrics,
}

impl ArtifactManager {
    /// Construct a manager over the shared registry.
    #[must_use]
    pub const fn new(
        store: ArtifactStore,
        registry: JobRegistry,
        events: EventBus,
        metrics: Metrics,
    ) -> Self {
        Self {
            store,
            registry,
            events,
            metrics,
        }
    }

    /// Backing store.
    #[must_use]
    pub const fn store(&self) -> &ArtifactStore {
        &self.store
    }

    /// Open the artifact for a finished job.
    ///
    /// # Errors
    ///
    /// - [`JobError::NotFound`] when the job or its file is gone.
    /// - [`JobError::NotReady`] when the job has not finished.
    /// - [`JobError::Io`] when the file exists but cannot be opened.
    pub async fn open(&self, job_id: JobId) -> JobResult<Artifact> {
        let path = self
            .registry
            .mutate(job_id, JobRecord::claim_artifact)
            .ok_or(JobError::NotFound { job_id })??;
        let lease = Lease {
            job_id,
            registry: self.registry.clone(),
            evicted: false,
        };

        let file = match File::open(&path).await {
            Ok(file) => file,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                warn!(job_id = %job_id, path = %path.display(), "artifact missing on disk");
                return Err(JobError::NotFound { job_id });
            }
            Err(source) => {
                return Err(JobError::Io {
                    operation: "artifact.open",
                    path,
                    source,
                });
            }
        };
        let len = file
            .metadata()
            .await
            .map_err(|source| JobError::Io {
                operation: "artifact.metadata",
                path: path.clone(),
                source,
            })?
            .len();

        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .map_or_else(|| format!("file_{job_id}"), str::to_string);
        debug!(job_id = %job_id, path = %path.display(), len, "serving artifact");

        Ok(Artifact {
            file_name,
            len,
            stream: ArtifactStream {
                inner: ReaderStream::new(file),
                remaining: len,
                finalizer: Some(Finalizer {
                    lease,
                    path,
                    events: self.events.clone(),
                    metrics: self.metrics.clone(),
                }),
            },
        })
    }
}

/// An opened artifact ready to be streamed.
pub struct Artifact {
    /// Filename offered to the client.
    pub file_name: String,
    /// Size in bytes.
    pub len: u64,
    /// Body stream; finalises the artifact once every byte is yielded.
    pub stream: ArtifactStream,
}

/// File body that deletes the artifact once fully read.
///
/// Completion is detected by byte count as well as end of file: HTTP/1
/// servers stop polling a body once the declared `Content-Length` is written.
pub struct ArtifactStream {
    inner: ReaderStream<File>,
    remaining: u64,
    finalizer: Option<Finalizer>,
}

impl Stream for ArtifactStream {
    type Item = <ReaderStream<File> as Stream>::Item;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        let polled = Pin::new(&mut this.inner).poll_next(cx);
        match &polled {
            Poll::Ready(Some(Ok(chunk))) => {
                let read = u64::try_from(chunk.len()).unwrap_or(u64::MAX);
                this.remaining = this.remaining.saturating_sub(read);
                if this.remaining == 0
                    && let Some(finalizer) = this.finalizer.take()
                {
                    finalizer.complete();
                }
            }
            Poll::Ready(None) => {
                if let Some(finalizer) = this.finalizer.take() {
                    finalizer.complete();
                }
            }
            Poll::Ready(Some(Err(err))) => {
                if let Some(finalizer) = this.finalizer.take() {
                    warn!(job_id = %finalizer.lease.job_id, error = %err, "artifact read failed; keeping file");
                }
            }
            Poll::Pending => {}
        }
        polled
    }
}

impl Drop for ArtifactStream {
    fn drop(&mut self) {
        if let Some(finalizer) = &self.finalizer {
            debug!(job_id = %finalizer.lease.job_id, "artifact transfer aborted; keeping file");
        }
    }
}

/// Claim on a record's artifact; released on drop unless the artifact was served.
struct Lease {
    job_id: JobId,
    registry: JobRegistry,
    evicted: bool,
}

impl Lease {
    fn evict(mut self) {
        self.registry.remove(self.job_id);
        self.evicted = true;
    }
}

impl Drop for Lease {
    fn drop(&mut self) {
        if !self.evicted {
            self.registry.mutate(self.job_id, JobRecord::release_artifact);
        }
    }
}

struct Finalizer {
    lease: Lease,
    path: PathBuf,
    events: EventBus,
    metrics: Metrics,
}

impl Finalizer {
    fn complete(self) {
        let Self {
            lease,
            path,
            events,
            metrics,
        } = self;
        let job_id = lease.job_id;
        metrics.inc_artifact_served();
        events.publish(Event::ArtifactServed { job_id });

        match fs::remove_file(&path) {
            Ok(()) => {
                events.publish(Event::ArtifactDeleted { job_id });
            }
            Err(err) => {
                warn!(
                    job_id = %job_id,
                    path = %path.display(),
                    error = %err,
                    "failed to delete served artifact"
                );
            }
        }
        lease.evict();
        info!(job_id = %job_id, "artifact served and released");
    }
}
