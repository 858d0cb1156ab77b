//! Shared state handed to every handler.

use std::time::Duration;

use reelay_core::JobRegistry;
use reelay_events::EventBus;
use reelay_fsops::ArtifactManager;
use reelay_telemetry::Metrics;

use crate::JobHandles;

pub(crate) struct ApiState {
    pub(crate) telemetry: Metrics,
    pub(crate) events: EventBus,
    pub(crate) registry: JobRegistry,
    pub(crate) artifacts: ArtifactManager,
    pub(crate) jobs: JobHandles,
    pub(crate) progress_interval: Duration,
}
