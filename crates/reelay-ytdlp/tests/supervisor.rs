use std::time::Duration;

use anyhow::{Context, Result, bail};
use reelay_core::{
    DownloadRequest, JobError, JobId, JobRecord, JobRegistry, JobStatus, JobWorkflow,
    MetadataSource,
};
use reelay_events::{Event, EventBus};
use reelay_fsops::ArtifactStore;
use reelay_telemetry::Metrics;
use reelay_test_support::{FakeTool, FakeToolMode, shell_available};
use reelay_ytdlp::{MetadataFetcher, Supervisor, SupervisorSettings, ToolCommand};

struct Harness {
    tool: FakeTool,
    registry: JobRegistry,
    events: EventBus,
    metrics: Metrics,
    supervisor: Supervisor,
}

fn harness(mode: FakeToolMode, settings: SupervisorSettings) -> Result<Harness> {
    let tool = FakeTool::install(mode)?;
    let store = ArtifactStore::prepare(tool.dir().join("downloads"))?;
    let registry = JobRegistry::new();
    let events = EventBus::with_capacity(64);
    let metrics = Metrics::new()?;
    let supervisor = Supervisor::new(
        ToolCommand::from_settings(&tool.tool_settings()),
        settings,
        store,
        registry.clone(),
        events.clone(),
        metrics.clone(),
    );
    Ok(Harness {
        tool,
        registry,
        events,
        metrics,
        supervisor,
    })
}

async fn wait_terminal(registry: &JobRegistry, id: JobId) -> Result<JobRecord> {
    for _ in 0..200 {
        let record = registry.get(id).context("job record missing")?;
        if record.status().is_terminal() {
            return Ok(record);
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    bail!("job {id} did not reach a terminal status")
}

fn request(url: &str, format: Option<&str>) -> Result<DownloadRequest> {
    Ok(DownloadRequest::new(Some(url), format)?)
}

#[tokio::test]
async fn default_request_produces_mp4_artifact() -> Result<()> {
    if !shell_available() {
        return Ok(());
    }
    let h = harness(FakeToolMode::Succeed, SupervisorSettings::default())?;
    let id = h
        .supervisor
        .start_job(request("https://example.com/video", None)?)
        .await?;
    assert!(h.registry.get(id).is_some(), "record visible before completion");

    let record = wait_terminal(&h.registry, id).await?;
    assert_eq!(record.status(), JobStatus::Finished);
    let output = record.output_file().context("output file set")?;
    assert_eq!(output.extension().and_then(|ext| ext.to_str()), Some("mp4"));
    assert!(output.is_file());
    assert!(
        output
            .file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| name.contains(&id.to_string()))
    );
    assert!((record.percent() - 100.0).abs() < f64::EPSILON);
    assert!(record.stderr().contains("[download]  100% of 1.00MiB"));

    let args = h.tool.recorded_args()?;
    assert!(args.windows(2).any(|pair| pair[0] == "-f" && pair[1] == "bestvideo+bestaudio/best"));
    assert!(args.iter().any(|arg| arg == "--newline"));
    assert_eq!(args.last().map(String::as_str), Some("https://example.com/video"));

    let mut stream = h.events.subscribe(Some(0));
    let mut kinds = Vec::new();
    for _ in 0..3 {
        kinds.push(stream.next().await.context("event")?.event.kind());
    }
    assert_eq!(kinds, vec!["job_queued", "job_started", "job_finished"]);
    assert_eq!(h.metrics.snapshot().jobs_started_total, 1);
    Ok(())
}

#[tokio::test]
async fn mp3_request_produces_audio_artifact() -> Result<()> {
    if !shell_available() {
        return Ok(());
    }
    let h = harness(FakeToolMode::Succeed, SupervisorSettings::default())?;
    let id = h
        .supervisor
        .start_job(request("https://example.com/video", Some("mp3"))?)
        .await?;
    let record = wait_terminal(&h.registry, id).await?;
    assert_eq!(record.status(), JobStatus::Finished);
    let output = record.output_file().context("output file set")?;
    assert_eq!(output.extension().and_then(|ext| ext.to_str()), Some("mp3"));

    let args = h.tool.recorded_args()?;
    assert!(args.iter().any(|arg| arg == "-x"));
    assert!(!args.iter().any(|arg| arg == "--merge-output-format"));
    Ok(())
}

#[tokio::test]
async fn non_zero_exit_marks_job_failed_with_diagnostics() -> Result<()> {
    if !shell_available() {
        return Ok(());
    }
    let h = harness(FakeToolMode::Fail, SupervisorSettings::default())?;
    let id = h
        .supervisor
        .start_job(request("https://example.com/missing", None)?)
        .await?;
    let record = wait_terminal(&h.registry, id).await?;
    assert_eq!(record.status(), JobStatus::Error);
    assert!(record.output_file().is_none());
    assert!(record.stderr().contains("HTTP Error 404"));
    assert!(record.stderr().contains("exited with code 1"));

    let mut stream = h.events.subscribe(Some(0));
    let mut last = None;
    for _ in 0..3 {
        last = Some(stream.next().await.context("event")?.event);
    }
    assert!(matches!(last, Some(Event::JobFailed { job_id, .. }) if job_id == id));
    Ok(())
}

#[tokio::test]
async fn clean_exit_without_artifact_is_an_error() -> Result<()> {
    if !shell_available() {
        return Ok(());
    }
    let h = harness(FakeToolMode::NoArtifact, SupervisorSettings::default())?;
    let id = h
        .supervisor
        .start_job(request("https://example.com/video", None)?)
        .await?;
    let record = wait_terminal(&h.registry, id).await?;
    assert_eq!(record.status(), JobStatus::Error);
    assert!(record.output_file().is_none());
    assert!(record.stderr().contains("no output file"));
    Ok(())
}

#[tokio::test]
async fn missing_executable_fails_immediately() -> Result<()> {
    let h = harness(FakeToolMode::Succeed, SupervisorSettings::default())?;
    let mut settings = h.tool.tool_settings();
    settings.program = "/definitely/not/a/real/tool".into();
    let supervisor = Supervisor::new(
        ToolCommand::from_settings(&settings),
        SupervisorSettings::default(),
        ArtifactStore::prepare(h.tool.dir().join("downloads"))?,
        h.registry.clone(),
        h.events.clone(),
        h.metrics.clone(),
    );
    let id = supervisor
        .start_job(request("https://example.com/video", None)?)
        .await?;
    let record = wait_terminal(&h.registry, id).await?;
    assert_eq!(record.status(), JobStatus::Error);
    assert!(record.stderr().contains("failed to launch"));
    Ok(())
}

#[tokio::test]
async fn watchdog_kills_hung_tool() -> Result<()> {
    if !shell_available() {
        return Ok(());
    }
    let h = harness(
        FakeToolMode::Hang,
        SupervisorSettings {
            job_timeout: Some(Duration::from_secs(1)),
            ..SupervisorSettings::default()
        },
    )?;
    let id = h
        .supervisor
        .start_job(request("https://example.com/video", None)?)
        .await?;
    let record = wait_terminal(&h.registry, id).await?;
    assert_eq!(record.status(), JobStatus::Error);
    assert!(record.stderr().contains("extraction timed out after 1s"));
    assert_eq!(h.metrics.snapshot().active_jobs, 0);
    Ok(())
}

#[tokio::test]
async fn admission_control_queues_excess_jobs() -> Result<()> {
    if !shell_available() {
        return Ok(());
    }
    let h = harness(
        FakeToolMode::Slow,
        SupervisorSettings {
            max_concurrent_jobs: Some(1),
            ..SupervisorSettings::default()
        },
    )?;
    let first = h
        .supervisor
        .start_job(request("https://example.com/a", None)?)
        .await?;
    let second = h
        .supervisor
        .start_job(request("https://example.com/b", None)?)
        .await?;

    tokio::time::sleep(Duration::from_millis(500)).await;
    let snapshot = h.metrics.snapshot();
    assert_eq!(snapshot.active_jobs, 1);
    assert_eq!(snapshot.queued_jobs, 1);
    assert_eq!(
        h.registry.get(second).map(|record| record.status()),
        Some(JobStatus::Running)
    );

    let first = wait_terminal(&h.registry, first).await?;
    let second = wait_terminal(&h.registry, second).await?;
    assert_eq!(first.status(), JobStatus::Finished);
    assert_eq!(second.status(), JobStatus::Finished);
    assert_eq!(h.metrics.snapshot().queued_jobs, 0);
    Ok(())
}

#[tokio::test]
async fn metadata_fetch_normalises_formats() -> Result<()> {
    if !shell_available() {
        return Ok(());
    }
    let tool = FakeTool::install(FakeToolMode::Succeed)?;
    let fetcher = MetadataFetcher::new(ToolCommand::from_settings(&tool.tool_settings()), None);
    let summary = fetcher.fetch_info("https://example.com/watch/abc123").await?;
    assert_eq!(summary.title.as_deref(), Some("Sample clip"));
    let ids: Vec<_> = summary
        .formats
        .iter()
        .map(|format| format.format_id.as_str())
        .collect();
    assert_eq!(ids, vec!["merged", "137", "140"]);
    assert!(tool.recorded_args()?.contains(&"--dump-json".to_string()));
    Ok(())
}

#[tokio::test]
async fn metadata_fetch_reports_tool_failures() -> Result<()> {
    if !shell_available() {
        return Ok(());
    }
    let tool = FakeTool::install(FakeToolMode::Fail)?;
    let fetcher = MetadataFetcher::new(ToolCommand::from_settings(&tool.tool_settings()), None);
    match fetcher.fetch_info("https://example.com/x").await {
        Err(JobError::UpstreamTool {
            exit_code, stderr, ..
        }) => {
            assert_eq!(exit_code, Some(1));
            assert!(stderr.contains("HTTP Error 404"));
        }
        other => bail!("unexpected result: {other:?}"),
    }

    let tool = FakeTool::install(FakeToolMode::Garbage)?;
    let fetcher = MetadataFetcher::new(ToolCommand::from_settings(&tool.tool_settings()), None);
    let err = fetcher
        .fetch_info("https://example.com/x")
        .await
        .err()
        .context("garbage output must fail")?;
    assert!(matches!(err, JobError::MalformedOutput { .. }));
    Ok(())
}
