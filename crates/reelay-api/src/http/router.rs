//! Router construction and server host for the API.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    http::{HeaderName, Method, Request, header::CONTENT_TYPE},
    routing::{get, post},
};
use reelay_core::JobRegistry;
use reelay_events::EventBus;
use reelay_fsops::ArtifactManager;
use reelay_telemetry::{Metrics, build_sha, request_id_layers};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{Span, info};

use crate::JobHandles;
use crate::error::ApiServerError;
use crate::http::constants::{HEADER_LAST_EVENT_ID, HEADER_REQUEST_ID};
use crate::http::health::{health, metrics};
use crate::http::jobs::{download_file, fetch_info, start_download};
use crate::http::progress::stream_progress;
use crate::http::sse::stream_events;
use crate::http::telemetry::HttpMetricsLayer;
use crate::state::ApiState;

/// Axum router wrapper that hosts the Reelay API.
pub struct ApiServer {
    router: Router,
}

impl ApiServer {
    /// Wire the shared services into application state and build the router.
    #[must_use]
    pub fn new(
        jobs: JobHandles,
        registry: JobRegistry,
        artifacts: ArtifactManager,
        events: EventBus,
        telemetry: Metrics,
        progress_interval: Duration,
    ) -> Self {
        let state = Arc::new(ApiState {
            telemetry: telemetry.clone(),
            events,
            registry,
            artifacts,
            jobs,
            progress_interval,
        });

        let cors_layer = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers([
                CONTENT_TYPE,
                HeaderName::from_static(HEADER_REQUEST_ID),
                HeaderName::from_static(HEADER_LAST_EVENT_ID),
            ]);
        let trace_layer = TraceLayer::new_for_http()
            .make_span_with(|request: &Request<_>| {
                let request_id = request
                    .headers()
                    .get(HEADER_REQUEST_ID)
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("")
                    .to_string();

                tracing::info_span!(
                    "http.request",
                    method = %request.method(),
                    route = %request.uri().path(),
                    request_id = %request_id,
                    build_sha = %build_sha(),
                    status_code = tracing::field::Empty,
                    latency_ms = tracing::field::Empty
                )
            })
            .on_response(
                |response: &axum::response::Response, latency: Duration, span: &Span| {
                    span.record("status_code", response.status().as_u16());
                    let latency_ms = u64::try_from(latency.as_millis()).unwrap_or(u64::MAX);
                    span.record("latency_ms", latency_ms);
                },
            );
        let layered = ServiceBuilder::new()
            .layer(request_id_layers())
            .layer(trace_layer)
            .layer(HttpMetricsLayer::new(telemetry));

        let router = Self::routes()
            .layer(cors_layer)
            .route_layer(layered)
            .with_state(state);

        Self { router }
    }

    fn routes() -> Router<Arc<ApiState>> {
        Router::new()
            .route("/info", post(fetch_info))
            .route("/download", post(start_download))
            .route("/progress/{job_id}", get(stream_progress))
            .route("/file/{job_id}", get(download_file))
            .route("/events", get(stream_events))
            .route("/health", get(health))
            .route("/metrics", get(metrics))
    }

    /// Router with state attached, for embedding or in-process testing.
    #[must_use]
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Serve until `shutdown` resolves, then drain in-flight requests.
    ///
    /// # Errors
    ///
    /// Returns [`ApiServerError::Bind`] when the listener cannot be bound and
    /// [`ApiServerError::Serve`] when the server loop fails.
    pub async fn serve<F>(self, addr: SocketAddr, shutdown: F) -> Result<(), ApiServerError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ApiServerError::Bind { addr, source })?;
        info!(%addr, "API listening");
        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|source| ApiServerError::Serve { source })
    }
}
