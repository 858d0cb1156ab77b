//! Context propagation helpers for request and application spans.
//!
//! # Design
//! - Keeps request identifiers and routes in task-local storage so handlers deep in
//!   the stack can tag their logs without threading the request through.
//! - Bundles the `x-request-id` tower layers so the router installs them as one unit.

use std::future::Future;
use std::sync::Arc;

use tower::ServiceBuilder;
use tower::layer::util::{Identity, Stack};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tracing::{Span, span::Entered};

use crate::init::build_sha;

/// Guard that keeps the application-level span entered for the lifetime of the process.
pub struct GlobalContextGuard {
    _guard: Entered<'static>,
}

impl GlobalContextGuard {
    /// Enter the `app` span tagged with `mode` and the recorded build SHA.
    #[must_use]
    pub fn new(mode: impl Into<String>) -> Self {
        let mode = mode.into();
        let span: &'static Span = Box::leak(Box::new(
            tracing::info_span!("app", mode = %mode, build_sha = %build_sha()),
        ));
        Self {
            _guard: span.enter(),
        }
    }
}

/// Request identifier of the in-flight request, when called inside [`with_request_context`].
#[must_use]
pub fn current_request_id() -> Option<String> {
    ACTIVE_REQUEST_CONTEXT
        .try_with(|ctx| ctx.request_id.as_ref().to_string())
        .ok()
}

/// Matched route of the in-flight request, when called inside [`with_request_context`].
#[must_use]
pub fn current_route() -> Option<String> {
    ACTIVE_REQUEST_CONTEXT
        .try_with(|ctx| ctx.route.as_ref().to_string())
        .ok()
}

/// Execute the provided future with the supplied request context available to downstream code.
pub async fn with_request_context<Fut, T>(
    request_id: impl Into<String>,
    route: impl Into<String>,
    fut: Fut,
) -> T
where
    Fut: Future<Output = T>,
{
    let context = RequestContext {
        request_id: Arc::from(request_id.into()),
        route: Arc::from(route.into()),
    };
    ACTIVE_REQUEST_CONTEXT.scope(context, fut).await
}

#[derive(Clone)]
struct RequestContext {
    request_id: Arc<str>,
    route: Arc<str>,
}

tokio::task_local! {
    static ACTIVE_REQUEST_CONTEXT: RequestContext;
}

/// Layer stack that echoes an incoming `x-request-id` and generates one when absent.
pub type RequestIdLayers =
    Stack<PropagateRequestIdLayer, Stack<SetRequestIdLayer<MakeRequestUuid>, Identity>>;

/// Build the `x-request-id` layers in the order the router expects: generation
/// runs first so propagation also echoes generated ids.
#[must_use]
pub fn request_id_layers() -> RequestIdLayers {
    ServiceBuilder::new()
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(PropagateRequestIdLayer::x_request_id())
        .into_inner()
}
