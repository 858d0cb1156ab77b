use std::net::SocketAddr;
use std::sync::Arc;

use reelay_api::{ApiServer, JobHandles};
use reelay_config::ReelayConfig;
use reelay_core::{JobRegistry, JobWorkflow, MetadataSource};
use reelay_events::EventBus;
use reelay_fsops::{ArtifactManager, ArtifactStore};
use reelay_telemetry::{GlobalContextGuard, LogFormat, LoggingConfig, Metrics, build_sha};
use reelay_ytdlp::{MetadataFetcher, Supervisor, SupervisorSettings, ToolCommand};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::{AppError, AppResult};

/// Fully wired services ready to serve.
pub(crate) struct Services {
    api: ApiServer,
    addr: SocketAddr,
    event_bridge: JoinHandle<()>,
}

/// Entry point for the Reelay boot sequence.
///
/// # Errors
///
/// Returns an error if configuration, logging, the artifact directory or the
/// listener cannot be set up, or if the server loop fails.
pub async fn run_app() -> AppResult<()> {
    if let Err(err) = dotenvy::dotenv()
        && !err.not_found()
    {
        return Err(AppError::DotEnv { source: err });
    }

    let config =
        ReelayConfig::from_env().map_err(|err| AppError::config("config.from_env", err))?;
    reelay_telemetry::init_logging(&logging_config(&config))
        .map_err(|err| AppError::telemetry("telemetry.init", err))?;
    let _context = GlobalContextGuard::new("serve");

    info!(
        download_dir = %config.download_dir.display(),
        program = %config.tool.program,
        cookies = config.tool.cookies_file.is_some(),
        "Reelay bootstrap starting"
    );

    let services = build_services(&config)?;
    info!(addr = %services.addr, "Launching API listener");
    let serve_result = services.api.serve(services.addr, shutdown_signal()).await;

    services.event_bridge.abort();
    serve_result.map_err(|err| AppError::api_server("api_server.serve", err))?;
    info!("API server shutdown complete");
    Ok(())
}

pub(crate) fn logging_config(config: &ReelayConfig) -> LoggingConfig<'_> {
    LoggingConfig {
        level: &config.logging.level,
        format: config
            .logging
            .format
            .as_deref()
            .map_or_else(LogFormat::infer, LogFormat::from_name),
        build_sha: build_sha(),
    }
}

/// Wire the registry, bus, supervisor and artifact manager behind the API.
pub(crate) fn build_services(config: &ReelayConfig) -> AppResult<Services> {
    let store = ArtifactStore::prepare(&config.download_dir)
        .map_err(|err| AppError::fsops("artifact_store.prepare", err))?;
    let registry = JobRegistry::new();
    let events = EventBus::new();
    let telemetry =
        Metrics::new().map_err(|err| AppError::telemetry("telemetry.metrics", err))?;

    let command = ToolCommand::from_settings(&config.tool);
    let supervisor = Supervisor::new(
        command.clone(),
        SupervisorSettings {
            combined_hosts: config.tool.combined_hosts.clone(),
            max_concurrent_jobs: config.jobs.max_concurrent_jobs,
            job_timeout: config.jobs.job_timeout,
        },
        store.clone(),
        registry.clone(),
        events.clone(),
        telemetry.clone(),
    );
    let fetcher = MetadataFetcher::new(command, config.jobs.job_timeout);
    let workflow: Arc<dyn JobWorkflow> = Arc::new(supervisor);
    let metadata: Arc<dyn MetadataSource> = Arc::new(fetcher);

    let artifacts = ArtifactManager::new(store, registry.clone(), events.clone(), telemetry.clone());
    let event_bridge = spawn_event_metrics_bridge(&events, telemetry.clone());

    let api = ApiServer::new(
        JobHandles::new(workflow, metadata),
        registry,
        artifacts,
        events,
        telemetry,
        config.jobs.progress_interval,
    );

    Ok(Services {
        api,
        addr: config.server.socket_addr(),
        event_bridge,
    })
}

/// Count every published lifecycle event in the metrics registry.
fn spawn_event_metrics_bridge(events: &EventBus, telemetry: Metrics) -> JoinHandle<()> {
    let mut stream = events.subscribe(None);
    tokio::spawn(async move {
        while let Some(envelope) = stream.next().await {
            telemetry.inc_event(envelope.event.kind());
            debug!(
                event_id = envelope.id,
                event_kind = envelope.event.kind(),
                job_id = %envelope.event.job_id(),
                "lifecycle event"
            );
        }
    })
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(error = %err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                warn!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
    info!("shutdown signal received");
}
