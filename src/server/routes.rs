//! Route definitions

use std::sync::Arc;

use axum::{extract::FromRef, routing::get, Router};

use super::handlers;
use super::shutdown::ShutdownState;
use super::state::AppState;
use crate::telemetry::MetricsRegistry;

/// Routes answered by the simulator
pub fn pong_routes() -> Router<AppState> {
    Router::new()
        .route("/ping", get(handlers::ping))
}

/// Informational routes of the pong server
pub fn info_routes() -> Router<AppState> {
    Router::new()
        // Version info
        .route("/version", get(handlers::version))
        // Root
        .route("/", get(handlers::root))
}

/// Health and metrics routes, shared by every server
pub fn health_routes<S>() -> Router<S>
where
    S: Clone + Send + Sync + 'static,
    Arc<MetricsRegistry>: FromRef<S>,
    Arc<ShutdownState>: FromRef<S>,
{
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        .route("/healthz", get(handlers::health_check))
        .route("/ready", get(handlers::ready_check))
        .route("/readyz", get(handlers::ready_check))
        // Metrics (Prometheus format)
        .route("/metrics", get(handlers::metrics))
}
