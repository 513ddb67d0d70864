//! HTTP middleware implementations

use std::time::{Duration, Instant};

use axum::{
    extract::{MatchedPath, Request, State},
    http::HeaderValue,
    middleware::Next,
    response::Response,
};
use tracing::debug;
use uuid::Uuid;

use crate::telemetry::HttpServerMetrics;

/// Header carrying the request ID
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Request ID middleware
pub async fn request_id_middleware(mut request: Request, next: Next) -> Response {
    let request_id = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    request.extensions_mut().insert(RequestId(request_id.clone()));

    let mut response = next.run(request).await;

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }

    response
}

/// Request ID extension
#[derive(Clone, Debug)]
pub struct RequestId(pub String);

/// Status recorded for requests whose future was dropped before a response
/// existed, e.g. because the client went away.
pub const CLIENT_CLOSED_REQUEST: u16 = 499;

/// One instrumented request. Dropping it without [`finish`](Self::finish)
/// records [`CLIENT_CLOSED_REQUEST`].
struct InstrumentedRequest<'a> {
    metrics: &'a HttpServerMetrics,
    handler: String,
    method: String,
    start: Instant,
    finished: bool,
}

impl<'a> InstrumentedRequest<'a> {
    fn start(metrics: &'a HttpServerMetrics, handler: String, method: String) -> Self {
        metrics.inflight_add(&handler, 1);
        Self {
            metrics,
            handler,
            method,
            start: Instant::now(),
            finished: false,
        }
    }

    fn finish(&mut self, status: u16) -> Duration {
        self.finished = true;
        let elapsed = self.start.elapsed();
        self.metrics
            .observe(&self.handler, &self.method, status, elapsed.as_secs_f64());
        elapsed
    }
}

impl Drop for InstrumentedRequest<'_> {
    fn drop(&mut self) {
        self.metrics.inflight_add(&self.handler, -1);
        if !self.finished {
            let elapsed = self.start.elapsed();
            self.metrics.observe(
                &self.handler,
                &self.method,
                CLIENT_CLOSED_REQUEST,
                elapsed.as_secs_f64(),
            );
            debug!(
                handler = %self.handler,
                method = %self.method,
                duration_ms = elapsed.as_millis() as u64,
                "Request dropped before completion"
            );
        }
    }
}

/// Records `http_requests_total`, `http_request_duration_seconds` and
/// `http_requests_inflight` for the matched route.
///
/// Install with `route_layer` so the matched path is known.
pub async fn instrumentation_middleware(
    State(metrics): State<HttpServerMetrics>,
    request: Request,
    next: Next,
) -> Response {
    let handler = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| request.uri().path().to_string());
    let method = request.method().as_str().to_ascii_lowercase();
    let request_id = request
        .extensions()
        .get::<RequestId>()
        .map(|r| r.0.clone())
        .unwrap_or_default();

    let mut tracked = InstrumentedRequest::start(&metrics, handler, method);
    let response = next.run(request).await;

    let status = response.status().as_u16();
    let elapsed = tracked.finish(status);

    debug!(
        request_id = %request_id,
        handler = %tracked.handler,
        method = %tracked.method,
        status,
        duration_ms = elapsed.as_millis() as u64,
        "Request completed"
    );

    response
}
