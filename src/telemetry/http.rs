//! HTTP server and client metrics

use std::sync::Arc;

use super::metrics::MetricsRegistry;

pub const HTTP_REQUESTS_TOTAL: &str = "http_requests_total";
pub const HTTP_REQUEST_DURATION: &str = "http_request_duration_seconds";
pub const HTTP_REQUESTS_INFLIGHT: &str = "http_requests_inflight";

pub const HTTP_CLIENT_REQUESTS_TOTAL: &str = "http_client_requests_total";
pub const HTTP_CLIENT_REQUEST_DURATION: &str = "http_client_request_duration_seconds";
pub const HTTP_CLIENT_REQUESTS_INFLIGHT: &str = "http_client_requests_inflight";

/// Request duration buckets, in seconds, shared by server and client.
pub const HTTP_DURATION_BUCKETS: &[f64] = &[
    0.001, 0.01, 0.1, 0.3, 0.6, 1.0, 3.0, 6.0, 9.0, 20.0, 30.0, 60.0, 90.0, 120.0, 240.0, 360.0, 720.0,
];

/// Per-handler metrics recorded by the instrumentation middleware
#[derive(Clone)]
pub struct HttpServerMetrics {
    registry: Arc<MetricsRegistry>,
}

impl HttpServerMetrics {
    pub fn new(registry: Arc<MetricsRegistry>) -> Self {
        registry.describe_counter(
            HTTP_REQUESTS_TOTAL,
            "Tracks the number of HTTP requests.",
        );
        registry.describe_histogram(
            HTTP_REQUEST_DURATION,
            "Tracks the latencies for HTTP requests.",
            HTTP_DURATION_BUCKETS,
        );
        registry.describe_gauge(
            HTTP_REQUESTS_INFLIGHT,
            "Current number of HTTP requests the handler is responding to.",
        );
        Self { registry }
    }

    pub fn inflight_add(&self, handler: &str, delta: i64) {
        self.registry
            .gauge_add(HTTP_REQUESTS_INFLIGHT, &[("handler", handler)], delta);
    }

    pub fn observe(&self, handler: &str, method: &str, code: u16, seconds: f64) {
        let code = code.to_string();
        let labels = [("handler", handler), ("method", method), ("code", code.as_str())];
        self.registry.counter_inc(HTTP_REQUESTS_TOTAL, &labels, 1);
        self.registry
            .histogram_observe(HTTP_REQUEST_DURATION, &labels, seconds);
    }
}

/// Metrics for outgoing requests made by the ping client
#[derive(Clone)]
pub struct HttpClientMetrics {
    registry: Arc<MetricsRegistry>,
}

impl HttpClientMetrics {
    pub fn new(registry: Arc<MetricsRegistry>) -> Self {
        registry.describe_counter(
            HTTP_CLIENT_REQUESTS_TOTAL,
            "Tracks the number of HTTP client requests.",
        );
        registry.describe_histogram(
            HTTP_CLIENT_REQUEST_DURATION,
            "Tracks the latencies for HTTP client requests.",
            HTTP_DURATION_BUCKETS,
        );
        registry.describe_gauge(
            HTTP_CLIENT_REQUESTS_INFLIGHT,
            "Current number of in-flight HTTP client requests.",
        );
        Self { registry }
    }

    pub fn inflight_add(&self, delta: i64) {
        self.registry
            .gauge_add(HTTP_CLIENT_REQUESTS_INFLIGHT, &[], delta);
    }

    /// Count one in-flight request until the returned guard is dropped.
    pub fn track_inflight(&self) -> ClientInflight<'_> {
        self.inflight_add(1);
        ClientInflight(self)
    }

    /// Record a finished request. `code` is the status code, or `error` when
    /// no response was received.
    pub fn observe(&self, method: &str, code: &str, seconds: f64) {
        self.registry.counter_inc(
            HTTP_CLIENT_REQUESTS_TOTAL,
            &[("method", method), ("code", code)],
            1,
        );
        self.registry
            .histogram_observe(HTTP_CLIENT_REQUEST_DURATION, &[("method", method)], seconds);
    }
}

/// Decrements `http_client_requests_inflight` on drop.
#[must_use = "the request stops counting as in flight when this is dropped"]
pub struct ClientInflight<'a>(&'a HttpClientMetrics);

impl Drop for ClientInflight<'_> {
    fn drop(&mut self) {
        self.0.inflight_add(-1);
    }
}

/// Publish `<program>_build_info{version=...} 1`.
pub fn record_build_info(registry: &MetricsRegistry, program: &str, version: &str) {
    let name = format!("{}_build_info", program);
    registry.describe_gauge(
        &name,
        &format!("A metric with a constant '1' value labeled by version from which {} was built.", program),
    );
    registry.gauge_set(
        &name,
        &[("version", version), ("crate_version", env!("CARGO_PKG_VERSION"))],
        1,
    );
}
