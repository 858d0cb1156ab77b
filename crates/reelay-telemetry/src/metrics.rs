//! Prometheus-backed metrics registry and snapshot helpers.
//!
//! # Design
//! - Encapsulates collector registration to keep the public API small.
//! - Exposes the counters/gauges that describe job throughput and HTTP traffic.

use std::sync::Arc;

use prometheus::core::Collector;
use prometheus::{Encoder, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};
use serde::Serialize;

use crate::error::{Result, TelemetryError};

/// Prometheus-backed metrics registry shared across services.
#[derive(Clone)]
pub struct Metrics {
    inner: Arc<MetricsInner>,
}

struct MetricsInner {
    registry: Registry,
    http_requests_total: IntCounterVec,
    events_emitted_total: IntCounterVec,
    jobs_started_total: IntCounter,
    jobs_completed_total: IntCounterVec,
    artifacts_served_total: IntCounter,
    active_jobs: IntGauge,
    queued_jobs: IntGauge,
}

/// Snapshot of selected gauges and counters for health reporting.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    /// Subprocesses currently running.
    pub active_jobs: i64,
    /// Jobs waiting for an admission permit.
    pub queued_jobs: i64,
    /// Jobs accepted since startup.
    pub jobs_started_total: u64,
    /// Artifacts fully streamed to clients since startup.
    pub artifacts_served_total: u64,
}

impl Metrics {
    /// Construct a new metrics registry with the standard collectors registered.
    ///
    /// # Errors
    ///
    /// Returns an error if any of the Prometheus collectors cannot be built or registered.
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let http_requests_total = register(
            &registry,
            "http_requests_total",
            IntCounterVec::new(
                Opts::new("http_requests_total", "Total HTTP requests received"),
                &["route", "code"],
            ),
        )?;
        let events_emitted_total = register(
            &registry,
            "events_emitted_total",
            IntCounterVec::new(
                Opts::new("events_emitted_total", "Lifecycle events emitted by type"),
                &["type"],
            ),
        )?;
        let jobs_started_total = register(
            &registry,
            "jobs_started_total",
            IntCounter::with_opts(Opts::new(
                "jobs_started_total",
                "Extraction jobs accepted",
            )),
        )?;
        let jobs_completed_total = register(
            &registry,
            "jobs_completed_total",
            IntCounterVec::new(
                Opts::new(
                    "jobs_completed_total",
                    "Extraction jobs that reached a terminal status",
                ),
                &["status"],
            ),
        )?;
        let artifacts_served_total = register(
            &registry,
            "artifacts_served_total",
            IntCounter::with_opts(Opts::new(
                "artifacts_served_total",
                "Artifacts streamed to clients and deleted",
            )),
        )?;
        let active_jobs = register(
            &registry,
            "active_jobs",
            IntGauge::with_opts(Opts::new("active_jobs", "Running extraction subprocesses")),
        )?;
        let queued_jobs = register(
            &registry,
            "queued_jobs",
            IntGauge::with_opts(Opts::new(
                "queued_jobs",
                "Jobs waiting for an admission permit",
            )),
        )?;

        Ok(Self {
            inner: Arc::new(MetricsInner {
                registry,
                http_requests_total,
                events_emitted_total,
                jobs_started_total,
                jobs_completed_total,
                artifacts_served_total,
                active_jobs,
                queued_jobs,
            }),
        })
    }

    /// Increment the HTTP request counter for the given route and status code.
    pub fn inc_http_request(&self, route: &str, status: u16) {
        self.inner
            .http_requests_total
            .with_label_values(&[route, &status.to_string()])
            .inc();
    }

    /// Increment the emitted event counter for the specific event type.
    pub fn inc_event(&self, event_type: &str) {
        self.inner
            .events_emitted_total
            .with_label_values(&[event_type])
            .inc();
    }

    /// Count an accepted job.
    pub fn inc_job_started(&self) {
        self.inner.jobs_started_total.inc();
    }

    /// Count a job reaching `status` (`finished` or `error`).
    pub fn inc_job_completed(&self, status: &str) {
        self.inner
            .jobs_completed_total
            .with_label_values(&[status])
            .inc();
    }

    /// Count an artifact that was fully streamed.
    pub fn inc_artifact_served(&self) {
        self.inner.artifacts_served_total.inc();
    }

    /// Adjust the running-subprocess gauge by `delta`.
    pub fn add_active_jobs(&self, delta: i64) {
        self.inner.active_jobs.add(delta);
    }

    /// Adjust the waiting-for-permit gauge by `delta`.
    pub fn add_queued_jobs(&self, delta: i64) {
        self.inner.queued_jobs.add(delta);
    }

    /// Render the metrics registry using the Prometheus text exposition format.
    ///
    /// # Errors
    ///
    /// Returns an error if the metrics cannot be encoded or if the encoded
    /// buffer is not valid UTF-8.
    pub fn render(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.inner.registry.gather();
        let mut buffer = Vec::new();
        encoder
            .encode(&metric_families, &mut buffer)
            .map_err(|source| TelemetryError::MetricsEncode { source })?;
        String::from_utf8(buffer).map_err(|source| TelemetryError::MetricsUtf8 { source })
    }

    /// Take a point-in-time snapshot of the most relevant gauges and counters.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            active_jobs: self.inner.active_jobs.get(),
            queued_jobs: self.inner.queued_jobs.get(),
            jobs_started_total: self.inner.jobs_started_total.get(),
            artifacts_served_total: self.inner.artifacts_served_total.get(),
        }
    }
}

fn register<C>(
    registry: &Registry,
    name: &'static str,
    built: prometheus::Result<C>,
) -> Result<C>
where
    C: Collector + Clone + 'static,
{
    let collector = built.map_err(|source| TelemetryError::MetricsRegister { name, source })?;
    registry
        .register(Box::new(collector.clone()))
        .map_err(|source| TelemetryError::MetricsRegister { name, source })?;
    Ok(collector)
}
