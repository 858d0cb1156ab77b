//! Per-job subprocess supervision.
//!
//! Each accepted request gets its own child process. Both output streams are
//! pumped line by line through the progress parser into the job record while
//! the process runs; after exit the download directory is reconciled to find
//! the artifact and the record is moved to its terminal status.

use std::ffi::OsString;
use std::process::ExitStatus;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reelay_core::{
    DownloadRequest, FormatPlan, JobId, JobRegistry, JobResult, JobStatus, JobWorkflow, parse_line,
};
use reelay_events::{Event, EventBus};
use reelay_fsops::ArtifactStore;
use reelay_telemetry::Metrics;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::command::ToolCommand;

/// Tuning knobs for the supervisor.
#[derive(Debug, Clone, Default)]
pub struct SupervisorSettings {
    /// Hosts that always receive a combined best-video plus best-audio selector.
    pub combined_hosts: Vec<String>,
    /// Maximum number of concurrently running subprocesses.
    pub max_concurrent_jobs: Option<usize>,
    /// Kill subprocesses that run longer than this.
    pub job_timeout: Option<Duration>,
}

/// Launches and tracks extraction subprocesses.
#[derive(Clone)]
pub struct Supervisor {
    inner: Arc<Inner>,
}

struct Inner {
    tool: ToolCommand,
    settings: SupervisorSettings,
    permits: Option<Arc<Semaphore>>,
    store: ArtifactStore,
    registry: JobRegistry,
    events: EventBus,
    metrics: Metrics,
}

enum Outcome {
    Exited(ExitStatus),
    SpawnFailed(std::io::Error),
    WaitFailed(std::io::Error),
    TimedOut(Duration),
}

#[derive(Clone, Copy)]
enum Channel {
    Stdout,
    Stderr,
}

impl Supervisor {
    /// Construct a supervisor sharing the given registry, bus and metrics.
    #[must_use]
    pub fn new(
        tool: ToolCommand,
        settings: SupervisorSettings,
        store: ArtifactStore,
        registry: JobRegistry,
        events: EventBus,
        metrics: Metrics,
    ) -> Self {
        let permits = settings
            .max_concurrent_jobs
            .map(|limit| Arc::new(Semaphore::new(limit.max(1))));
        Self {
            inner: Arc::new(Inner {
                tool,
                settings,
                permits,
                store,
                registry,
                events,
                metrics,
            }),
        }
    }

    /// Arguments for an extraction run, excluding base arguments and credentials.
    #[must_use]
    pub fn extraction_args(&self, job_id: JobId, request: &DownloadRequest) -> Vec<OsString> {
        self.inner.extraction_args(job_id, request)
    }
}

#[async_trait]
impl JobWorkflow for Supervisor {
    async fn start_job(&self, request: DownloadRequest) -> JobResult<JobId> {
        let job_id = Uuid::new_v4();
        let args = self.inner.extraction_args(job_id, &request);

        self.inner.registry.create(job_id);
        self.inner.metrics.inc_job_started();
        self.inner.events.publish(Event::JobQueued {
            job_id,
            url: request.url.clone(),
        });
        info!(
            job_id = %job_id,
            url = %request.url,
            format = request.format.as_deref().unwrap_or("default"),
            "extraction job accepted"
        );

        tokio::spawn(Arc::clone(&self.inner).run(job_id, args));
        Ok(job_id)
    }
}

impl Inner {
    fn extraction_args(&self, job_id: JobId, request: &DownloadRequest) -> Vec<OsString> {
        let plan = FormatPlan::resolve(
            &request.url,
            request.format.as_deref(),
            &self.settings.combined_hosts,
        );
        let mut args: Vec<OsString> = vec![
            "-o".into(),
            self.store.output_template(job_id).into_os_string(),
            "--newline".into(),
            "--no-warnings".into(),
        ];
        args.extend(plan.args().into_iter().map(OsString::from));
        args.push("--".into());
        args.push(OsString::from(&request.url));
        args
    }

    async fn run(self: Arc<Self>, job_id: JobId, args: Vec<OsString>) {
        let Some(_permit) = self.admit(job_id).await else {
            self.settle(job_id, Outcome::SpawnFailed(std::io::Error::other("admission closed")));
            return;
        };

        self.metrics.add_active_jobs(1);
        self.events.publish(Event::JobStarted { job_id });
        let outcome = self.execute(job_id, args).await;
        self.metrics.add_active_jobs(-1);
        self.settle(job_id, outcome);
    }

    /// Wait for a slot when admission control is enabled.
    ///
    /// Returns `None` only if the semaphore was closed.
    async fn admit(&self, job_id: JobId) -> Option<Option<OwnedSemaphorePermit>> {
        let Some(permits) = &self.permits else {
            return Some(None);
        };
        if permits.available_permits() == 0 {
            debug!(job_id = %job_id, "waiting for an extraction slot");
        }
        self.metrics.add_queued_jobs(1);
        let permit = Arc::clone(permits).acquire_owned().await;
        self.metrics.add_queued_jobs(-1);
        permit.ok().map(Some)
    }

    async fn execute(&self, job_id: JobId, args: Vec<OsString>) -> Outcome {
        let mut child = match self.tool.command(args).spawn() {
            Ok(child) => child,
            Err(err) => return Outcome::SpawnFailed(err),
        };
        debug!(job_id = %job_id, pid = ?child.id(), "extraction tool spawned");

        let stdout = child
            .stdout
            .take()
            .map(|out| tokio::spawn(pump(out, Channel::Stdout, job_id, self.registry.clone())));
        let stderr = child
            .stderr
            .take()
            .map(|err| tokio::spawn(pump(err, Channel::Stderr, job_id, self.registry.clone())));

        let waited = match self.settings.job_timeout {
            Some(limit) => match tokio::time::timeout(limit, child.wait()).await {
                Ok(result) => result,
                Err(_) => {
                    if let Err(err) = child.kill().await {
                        warn!(job_id = %job_id, error = %err, "failed to kill timed out tool");
                    }
                    for task in [stdout, stderr].into_iter().flatten() {
                        task.abort();
                    }
                    return Outcome::TimedOut(limit);
                }
            },
            None => child.wait().await,
        };

        for task in [stdout, stderr].into_iter().flatten() {
            if let Err(err) = task.await {
                warn!(job_id = %job_id, error = %err, "output reader task failed");
            }
        }

        match waited {
            Ok(status) => Outcome::Exited(status),
            Err(err) => Outcome::WaitFailed(err),
        }
    }

    fn settle(&self, job_id: JobId, outcome: Outcome) {
        let failure = match outcome {
            Outcome::Exited(status) if status.success() => match self.reconcile(job_id) {
                Ok(()) => None,
                Err(reason) => Some(reason),
            },
            Outcome::Exited(status) => {
                let stderr = self
                    .registry
                    .get(job_id)
                    .map(|record| record.stderr().trim_end().to_string())
                    .unwrap_or_default();
                warn!(job_id = %job_id, code = ?status.code(), stderr = %stderr, "extraction tool failed");
                Some(status.code().map_or_else(
                    || "extraction tool terminated by signal".to_string(),
                    |code| format!("extraction tool exited with code {code}"),
                ))
            }
            Outcome::SpawnFailed(err) => {
                error!(job_id = %job_id, program = %self.tool.program(), error = %err, "failed to launch extraction tool");
                Some(format!("failed to launch {}: {err}", self.tool.program()))
            }
            Outcome::WaitFailed(err) => {
                error!(job_id = %job_id, error = %err, "failed to wait for extraction tool");
                Some(format!("failed to wait for extraction tool: {err}"))
            }
            Outcome::TimedOut(limit) => {
                warn!(job_id = %job_id, limit_secs = limit.as_secs(), "extraction tool timed out");
                Some(format!("extraction timed out after {}s", limit.as_secs()))
            }
        };

        if let Some(message) = failure {
            let failed = self.registry.mutate(job_id, |record| {
                record.append_stderr(&message);
                record.fail()
            });
            if failed == Some(true) {
                self.metrics.inc_job_completed(JobStatus::Error.as_str());
                self.events.publish(Event::JobFailed { job_id, message });
            }
        }
    }

    /// Locate the artifact after a clean exit and mark the job finished.
    fn reconcile(&self, job_id: JobId) -> Result<(), String> {
        let hint = self
            .registry
            .get(job_id)
            .and_then(|record| record.output_file().map(ToOwned::to_owned));
        let located = self
            .store
            .locate(job_id, hint.as_deref())
            .map_err(|err| format!("failed to scan download directory: {err}"))?;
        let Some(path) = located else {
            warn!(job_id = %job_id, "tool exited cleanly but no artifact was found");
            return Err("extraction finished but no output file was found".to_string());
        };

        let finished = self
            .registry
            .mutate(job_id, |record| record.finish(path.clone()));
        if finished == Some(true) {
            self.metrics.inc_job_completed(JobStatus::Finished.as_str());
            info!(job_id = %job_id, path = %path.display(), "extraction job finished");
            self.events.publish(Event::JobFinished {
                job_id,
                output_file: path.display().to_string(),
            });
        }
        Ok(())
    }
}

/// Feed one output stream through the parser into the job record.
async fn pump<R>(reader: R, channel: Channel, job_id: JobId, registry: JobRegistry)
where
    R: AsyncRead + Unpin,
{
    let mut segments = BufReader::new(reader).split(b'\n');
    loop {
        let segment = match segments.next_segment().await {
            Ok(Some(segment)) => segment,
            Ok(None) => break,
            Err(err) => {
                warn!(job_id = %job_id, error = %err, "failed to read tool output");
                break;
            }
        };
        let text = String::from_utf8_lossy(&segment);
        for line in text.split('\r') {
            let update = parse_line(line);
            let keep_diagnostic = matches!(channel, Channel::Stderr) && !line.trim().is_empty();
            if update.is_empty() && !keep_diagnostic {
                continue;
            }
            registry.mutate(job_id, |record| {
                if keep_diagnostic {
                    record.append_stderr(line.trim_end());
                }
                record.apply(update);
            });
        }
    }
}
