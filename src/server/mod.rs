//! HTTP server implementation
//!
//! Provides the Axum-based pong server answering `/ping`, and the
//! metrics-only server run next to the ping client.

mod handlers;
mod middleware;
mod routes;
mod state;
pub mod shutdown;

pub use handlers::*;
pub use middleware::*;
pub use routes::*;
pub use shutdown::*;
pub use state::*;

use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::PingPongConfig;

/// Run the pong server until a shutdown signal arrives
pub async fn run_server(config: PingPongConfig) -> anyhow::Result<()> {
    let addr = config.server.socket_addr()?;
    let state = AppState::new(config)?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        app_version = %state.config.pong.app_version,
        latency = %state.config.pong.latency,
        success_prob = state.config.pong.success_prob,
        "Starting pong server"
    );

    let listener = TcpListener::bind(addr).await?;
    info!(address = %listener.local_addr()?, mode = "pong", "Starting HTTP server");

    let shutdown = state.shutdown.clone();
    serve(listener, create_router(state), shutdown).await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Serve `router` on `listener` until `shutdown` completes a graceful shutdown.
pub async fn serve(
    listener: TcpListener,
    router: Router,
    shutdown: Arc<ShutdownState>,
) -> std::io::Result<()> {
    axum::serve(listener, router)
        .with_graceful_shutdown(graceful_shutdown(shutdown))
        .await
}

/// Create the pong router with all routes
///
/// `/ping` has no request timeout. It waits for the decided latency unless
/// the server cancels outstanding work.
pub fn create_router(state: AppState) -> Router {
    // Only simulated work counts towards the drain.
    let work = routes::pong_routes().route_layer(axum::middleware::from_fn_with_state(
        state.shutdown.clone(),
        request_tracking_middleware,
    ));

    Router::new()
        .merge(work)
        .merge(routes::info_routes())
        .merge(routes::health_routes())
        .route_layer(axum::middleware::from_fn_with_state(
            state.http_metrics.clone(),
            instrumentation_middleware,
        ))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(axum::middleware::from_fn(request_id_middleware)),
        )
        .with_state(state)
}

/// Create the router of a metrics-only server
pub fn create_metrics_router(state: MetricsState) -> Router {
    Router::new()
        .merge(routes::health_routes())
        .route_layer(axum::middleware::from_fn_with_state(
            state.http_metrics.clone(),
            instrumentation_middleware,
        ))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(axum::middleware::from_fn(request_id_middleware)),
        )
        .with_state(state)
}
