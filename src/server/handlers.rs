//! HTTP request handlers

use std::sync::Arc;

use axum::{
    extract::{FromRef, State},
    http::{header, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::{debug, warn};

use super::shutdown::{DrainStatus, ShutdownState};
use super::state::{AppState, MetricsState};
use crate::simulator::PingOutcome;
use crate::telemetry::MetricsRegistry;

/// Content type of the Prometheus text exposition format
pub const PROMETHEUS_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

impl FromRef<AppState> for Arc<MetricsRegistry> {
    fn from_ref(state: &AppState) -> Self {
        state.registry.clone()
    }
}

impl FromRef<AppState> for Arc<ShutdownState> {
    fn from_ref(state: &AppState) -> Self {
        state.shutdown.clone()
    }
}

impl FromRef<MetricsState> for Arc<MetricsRegistry> {
    fn from_ref(state: &MetricsState) -> Self {
        state.registry.clone()
    }
}

impl FromRef<MetricsState> for Arc<ShutdownState> {
    fn from_ref(state: &MetricsState) -> Self {
        state.shutdown.clone()
    }
}

// ============== Pong Handlers ==============

/// GET /ping
pub async fn ping(State(state): State<AppState>, method: Method, uri: Uri) -> Response {
    let cancel = state.shutdown.child_token();
    let reply = state.responder.respond(&cancel).await;

    match reply.outcome {
        PingOutcome::Pong => {
            debug!(
                method = %method,
                path = %uri.path(),
                latency_ms = reply.elapsed.as_millis() as u64,
                "Ping request succeeded"
            );
            (StatusCode::OK, "pong\n").into_response()
        }
        PingOutcome::Failed => {
            warn!(
                method = %method,
                path = %uri.path(),
                status = 500,
                "Ping request failed"
            );
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
        PingOutcome::Cancelled => {
            debug!(
                method = %method,
                path = %uri.path(),
                "Ping abandoned during shutdown"
            );
            StatusCode::SERVICE_UNAVAILABLE.into_response()
        }
    }
}

// ============== Health & Metrics Handlers ==============

/// GET /metrics
pub async fn metrics(State(registry): State<Arc<MetricsRegistry>>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, PROMETHEUS_CONTENT_TYPE)],
        registry.export_prometheus(),
    )
}

/// GET /health
pub async fn health_check(State(shutdown): State<Arc<ShutdownState>>) -> Json<HealthResponse> {
    let status = if shutdown.is_draining() {
        HealthStatus::Unhealthy
    } else {
        HealthStatus::Healthy
    };

    Json(HealthResponse {
        status,
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: shutdown.uptime().as_secs(),
        timestamp: chrono::Utc::now(),
        drain: DrainStatus::of(&shutdown),
    })
}

/// Health response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub version: String,
    pub uptime_seconds: u64,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub drain: DrainStatus,
}

/// Overall health status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
}

/// GET /ready
pub async fn ready_check(
    State(shutdown): State<Arc<ShutdownState>>,
) -> (StatusCode, Json<ReadyResponse>) {
    // Not ready if draining
    if shutdown.is_draining() {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ReadyResponse {
                ready: false,
                reason: Some("Server is draining".to_string()),
            }),
        );
    }

    if !shutdown.is_ready() {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ReadyResponse {
                ready: false,
                reason: Some("Server is not ready".to_string()),
            }),
        );
    }

    (
        StatusCode::OK,
        Json(ReadyResponse {
            ready: true,
            reason: None,
        }),
    )
}

/// Readiness response
#[derive(Debug, Clone, Serialize)]
pub struct ReadyResponse {
    pub ready: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// GET /version
pub async fn version(State(state): State<AppState>) -> Json<VersionResponse> {
    Json(VersionResponse {
        name: env!("CARGO_PKG_NAME").to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        app_version: state.config.pong.app_version.clone(),
    })
}

#[derive(Debug, Serialize)]
pub struct VersionResponse {
    pub name: String,
    pub version: String,
    /// Version injected with `--set-version`
    pub app_version: String,
}

/// GET /
pub async fn root() -> Json<RootResponse> {
    Json(RootResponse {
        name: "pingpong".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        description: env!("CARGO_PKG_DESCRIPTION").to_string(),
        endpoints: ["/ping", "/metrics", "/health", "/ready", "/version"]
            .iter()
            .map(|s| s.to_string())
            .collect(),
    })
}

#[derive(Debug, Serialize)]
pub struct RootResponse {
    pub name: String,
    pub version: String,
    pub description: String,
    pub endpoints: Vec<String>,
}
