use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use http_body_util::BodyExt;
use reelay_api::{ApiServer, JobHandles};
use reelay_core::JobRegistry;
use reelay_events::EventBus;
use reelay_fsops::{ArtifactManager, ArtifactStore};
use reelay_telemetry::Metrics;
use reelay_test_support::{FakeTool, FakeToolMode, shell_available};
use reelay_ytdlp::{MetadataFetcher, Supervisor, SupervisorSettings, ToolCommand};
use serde_json::{Value, json};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;
use tower::ServiceExt;

struct Harness {
    _tool: FakeTool,
    registry: JobRegistry,
    store: ArtifactStore,
    router: Router,
}

fn harness(mode: FakeToolMode) -> Result<Harness> {
    let tool = FakeTool::install(mode)?;
    let store = ArtifactStore::prepare(tool.dir().join("downloads"))?;
    let registry = JobRegistry::new();
    let events = EventBus::with_capacity(64);
    let metrics = Metrics::new()?;
    let command = ToolCommand::from_settings(&tool.tool_settings());
    let supervisor = Supervisor::new(
        command.clone(),
        SupervisorSettings::default(),
        store.clone(),
        registry.clone(),
        events.clone(),
        metrics.clone(),
    );
    let fetcher = MetadataFetcher::new(command, Some(Duration::from_secs(10)));
    let artifacts = ArtifactManager::new(
        store.clone(),
        registry.clone(),
        events.clone(),
        metrics.clone(),
    );
    let server = ApiServer::new(
        JobHandles::new(Arc::new(supervisor), Arc::new(fetcher)),
        registry.clone(),
        artifacts,
        events,
        metrics,
        Duration::from_millis(50),
    );
    Ok(Harness {
        _tool: tool,
        registry,
        store,
        router: server.router(),
    })
}

async fn send(router: &Router, request: Request<Body>) -> Result<(StatusCode, Vec<u8>)> {
    let response = router.clone().oneshot(request).await?;
    let status = response.status();
    let body = timeout(Duration::from_secs(15), response.into_body().collect())
        .await
        .context("response body did not complete")??
        .to_bytes()
        .to_vec();
    Ok((status, body))
}

fn post_json(uri: &str, body: &Value) -> Result<Request<Body>> {
    Ok(Request::post(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_vec(body)?))?)
}

fn get(uri: &str) -> Result<Request<Body>> {
    Ok(Request::get(uri).body(Body::empty())?)
}

async fn submit(router: &Router, body: &Value) -> Result<String> {
    let (status, bytes) = send(router, post_json("/download", body)?).await?;
    assert_eq!(status, StatusCode::OK);
    let value: Value = serde_json::from_slice(&bytes)?;
    Ok(value["jobId"].as_str().context("jobId in response")?.to_string())
}

#[tokio::test]
async fn info_returns_normalised_formats() -> Result<()> {
    if !shell_available() {
        return Ok(());
    }
    let h = harness(FakeToolMode::Succeed)?;
    let (status, bytes) = send(
        &h.router,
        post_json("/info", &json!({ "url": "https://example.com/watch/abc123" }))?,
    )
    .await?;
    assert_eq!(status, StatusCode::OK);

    let body: Value = serde_json::from_slice(&bytes)?;
    assert_eq!(body["title"], "Sample clip");
    let ids: Vec<_> = body["formats"]
        .as_array()
        .context("formats array")?
        .iter()
        .filter_map(|format| format["format_id"].as_str())
        .collect();
    assert_eq!(ids, ["merged", "137", "140"]);
    Ok(())
}

#[tokio::test]
async fn missing_url_is_rejected() -> Result<()> {
    let h = harness(FakeToolMode::Succeed)?;

    let (status, bytes) = send(&h.router, post_json("/info", &json!({}))?).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let body: Value = serde_json::from_slice(&bytes)?;
    assert!(body["details"].as_str().is_some_and(|d| d.contains("url")));

    let (status, _) = send(&h.router, post_json("/download", &json!({ "url": "  " }))?).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let malformed = Request::post("/download")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))?;
    let (status, _) = send(&h.router, malformed).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(h.registry.is_empty());
    Ok(())
}

#[tokio::test]
async fn upstream_failure_reports_stderr() -> Result<()> {
    if !shell_available() {
        return Ok(());
    }
    let h = harness(FakeToolMode::Fail)?;
    let (status, bytes) = send(
        &h.router,
        post_json("/info", &json!({ "url": "https://example.com/missing" }))?,
    )
    .await?;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = serde_json::from_slice(&bytes)?;
    assert!(body["error"].is_string());
    assert!(
        body["details"]
            .as_str()
            .is_some_and(|details| details.contains("HTTP Error 404"))
    );
    Ok(())
}

#[tokio::test]
async fn unknown_job_is_not_found() -> Result<()> {
    let h = harness(FakeToolMode::Succeed)?;
    let unknown = uuid::Uuid::new_v4();

    let (status, _) = send(&h.router, get(&format!("/progress/{unknown}"))?).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = send(&h.router, get("/progress/not-a-job")?).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = send(&h.router, get(&format!("/file/{unknown}"))?).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn download_streams_progress_then_serves_file_once() -> Result<()> {
    if !shell_available() {
        return Ok(());
    }
    let h = harness(FakeToolMode::Succeed)?;
    let job_id = submit(&h.router, &json!({ "url": "https://example.com/video" })).await?;

    let (status, bytes) = send(&h.router, get(&format!("/progress/{job_id}"))?).await?;
    assert_eq!(status, StatusCode::OK);
    let text = String::from_utf8(bytes)?;
    assert!(text.contains("event: progress"));
    let done_at = text.find("event: done").context("done event")?;
    assert!(text[done_at..].contains(r#"{"status":"finished"}"#));
    assert!(!text[done_at..].contains("event: progress"));

    let response = h
        .router
        .clone()
        .oneshot(get(&format!("/file/{job_id}"))?)
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    let disposition = response
        .headers()
        .get(header::CONTENT_DISPOSITION)
        .and_then(|value| value.to_str().ok())
        .context("content-disposition header")?
        .to_string();
    assert!(disposition.starts_with("attachment;"));
    assert!(disposition.contains(&job_id));
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).map(|v| v.as_bytes()),
        Some(b"video/mp4".as_slice())
    );
    let body = response.into_body().collect().await?.to_bytes();
    assert_eq!(&body[..], b"fake mp4 payload for https://example.com/video\n");

    let (status, _) = send(&h.router, get(&format!("/file/{job_id}"))?).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(h.registry.is_empty());
    assert_eq!(std::fs::read_dir(h.store.root())?.count(), 0);
    Ok(())
}

#[tokio::test]
async fn audio_request_serves_mp3() -> Result<()> {
    if !shell_available() {
        return Ok(());
    }
    let h = harness(FakeToolMode::Succeed)?;
    let job_id = submit(
        &h.router,
        &json!({ "url": "https://example.com/song", "format": "mp3" }),
    )
    .await?;
    let (_, progress) = send(&h.router, get(&format!("/progress/{job_id}"))?).await?;
    assert!(String::from_utf8(progress)?.contains(r#"{"status":"finished"}"#));

    let response = h
        .router
        .clone()
        .oneshot(get(&format!("/file/{job_id}"))?)
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).map(|v| v.as_bytes()),
        Some(b"audio/mpeg".as_slice())
    );
    Ok(())
}

#[tokio::test]
async fn file_before_completion_is_not_ready() -> Result<()> {
    if !shell_available() {
        return Ok(());
    }
    let h = harness(FakeToolMode::Slow)?;
    let job_id = submit(&h.router, &json!({ "url": "https://example.com/slow" })).await?;

    let (status, bytes) = send(&h.router, get(&format!("/file/{job_id}"))?).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let body: Value = serde_json::from_slice(&bytes)?;
    assert_eq!(body["details"], "job is running");
    Ok(())
}

#[tokio::test]
async fn failed_job_stream_ends_with_error_status() -> Result<()> {
    if !shell_available() {
        return Ok(());
    }
    let h = harness(FakeToolMode::Fail)?;
    let job_id = submit(&h.router, &json!({ "url": "https://example.com/gone" })).await?;

    let (_, bytes) = send(&h.router, get(&format!("/progress/{job_id}"))?).await?;
    let text = String::from_utf8(bytes)?;
    assert!(text.contains(r#""status":"error""#));
    assert!(text.contains("HTTP Error 404"));
    assert!(text.ends_with("data: {\"status\":\"error\"}\n\n"));

    let (status, _) = send(&h.router, get(&format!("/file/{job_id}"))?).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn health_and_metrics_report_activity() -> Result<()> {
    let h = harness(FakeToolMode::Succeed)?;

    let response = h.router.clone().oneshot(get("/health")?).await?;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));
    let body: Value = serde_json::from_slice(&response.into_body().collect().await?.to_bytes())?;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["jobs"]["running"], 0);

    let (status, bytes) = send(&h.router, get("/metrics")?).await?;
    assert_eq!(status, StatusCode::OK);
    let text = String::from_utf8(bytes)?;
    assert!(text.contains("http_requests_total"));
    assert!(text.contains("route=\"/health\""));
    Ok(())
}

async fn raw_get(addr: SocketAddr, path: &str) -> Result<String> {
    let mut socket = TcpStream::connect(addr).await?;
    socket
        .write_all(format!("GET {path} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n").as_bytes())
        .await?;
    let mut raw = Vec::new();
    timeout(Duration::from_secs(10), socket.read_to_end(&mut raw))
        .await
        .context("server did not close the connection")??;
    Ok(String::from_utf8_lossy(&raw).into_owned())
}

#[tokio::test]
async fn artifact_is_released_when_served_over_a_socket() -> Result<()> {
    if !shell_available() {
        return Ok(());
    }
    let h = harness(FakeToolMode::Succeed)?;
    let job_id = submit(&h.router, &json!({ "url": "https://example.com/video" })).await?;
    let (_, progress) = send(&h.router, get(&format!("/progress/{job_id}"))?).await?;
    assert!(String::from_utf8(progress)?.contains(r#"{"status":"finished"}"#));

    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let server = tokio::spawn(axum::serve(listener, h.router.clone()).into_future());

    let first = raw_get(addr, &format!("/file/{job_id}")).await?;
    assert!(first.starts_with("HTTP/1.1 200"), "first response: {first}");
    assert!(first.ends_with("fake mp4 payload for https://example.com/video\n"));
    assert!(h.registry.is_empty());
    assert_eq!(std::fs::read_dir(h.store.root())?.count(), 0);

    let second = raw_get(addr, &format!("/file/{job_id}")).await?;
    assert!(second.starts_with("HTTP/1.1 404"), "second response: {second}");

    server.abort();
    Ok(())
}
