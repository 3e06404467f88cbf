//! Request context and correlation-id assignment.
//!
//! # Responsibilities
//! - Generate one correlation id (UUID v4) per inbound request
//! - Fix the request deadline from the route's timeout at arrival
//! - Open the `request` span every later log line is recorded in
//! - Echo the id back to the client in `x-request-id`
//!
//! # Design Decisions
//! - The context is created once, by the outermost layer, and only read
//!   afterwards; the cancellation token is its single one-way transition
//! - Cloning is cheap (`Arc`), so every stage owns a handle

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::State,
    http::{HeaderValue, Request},
    middleware::Next,
    response::Response,
};
use tokio_util::sync::CancellationToken;
use tracing::Instrument;
use uuid::Uuid;

use crate::resources::ResourceKind;
use crate::routing::{Operation, RouteSpec};

/// Header carrying the correlation id on responses.
pub const X_REQUEST_ID: &str = "x-request-id";

/// Opaque per-request correlation id.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestId(Arc<str>);

impl RequestId {
    pub fn generate() -> Self {
        Self(Arc::from(Uuid::new_v4().to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug)]
struct ContextInner {
    request_id: RequestId,
    received_at: Instant,
    deadline: Instant,
    route: Option<RouteSpec>,
    cancel: CancellationToken,
}

/// Per-request state shared by every pipeline stage.
#[derive(Debug, Clone)]
pub struct RequestContext {
    inner: Arc<ContextInner>,
}

impl RequestContext {
    /// A context for a request arriving now, bounded by `timeout`.
    pub fn new(timeout: Duration) -> Self {
        Self::build(timeout, None)
    }

    /// A context for a request on a known route.
    pub fn for_route(route: RouteSpec) -> Self {
        Self::build(route.timeout, Some(route))
    }

    fn build(timeout: Duration, route: Option<RouteSpec>) -> Self {
        let received_at = Instant::now();
        Self {
            inner: Arc::new(ContextInner {
                request_id: RequestId::generate(),
                received_at,
                deadline: received_at + timeout,
                route,
                cancel: CancellationToken::new(),
            }),
        }
    }

    pub fn request_id(&self) -> &RequestId {
        &self.inner.request_id
    }

    pub fn received_at(&self) -> Instant {
        self.inner.received_at
    }

    pub fn deadline(&self) -> Instant {
        self.inner.deadline
    }

    pub fn resource(&self) -> Option<ResourceKind> {
        self.inner.route.map(|r| r.resource)
    }

    pub fn operation(&self) -> Option<Operation> {
        self.inner.route.map(|r| r.operation)
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.inner.cancel
    }

    /// Signal cooperative cancellation to everything holding this context.
    pub fn cancel(&self) {
        self.inner.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancel.is_cancelled()
    }
}

/// Outermost layer: builds the context and runs the rest of the chain inside
/// the request span.
pub async fn correlate(State(route): State<RouteSpec>, mut req: Request<Body>, next: Next) -> Response {
    let ctx = RequestContext::for_route(route);
    let span = tracing::info_span!(
        "request",
        request_id = %ctx.request_id(),
        resource = route.resource.segment(),
        operation = route.operation.as_str(),
    );
    req.extensions_mut().insert(ctx.clone());

    let mut response = next.run(req).instrument(span).await;
    if let Ok(value) = HeaderValue::from_str(ctx.request_id().as_str()) {
        response.headers_mut().insert(X_REQUEST_ID, value);
    }
    response
}
