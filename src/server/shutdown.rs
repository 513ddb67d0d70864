//! Graceful Shutdown Implementation
//!
//! Provides connection draining and graceful shutdown functionality:
//! - Tracks in-flight requests
//! - Rejects new requests during drain
//! - Waits for existing requests to complete
//! - Cancels whatever is still waiting once the drain timeout passes

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::error::ErrorResponse;

/// Shutdown state for tracking in-flight requests
#[derive(Debug)]
pub struct ShutdownState {
    /// Number of in-flight requests
    in_flight: AtomicU64,
    /// Whether we're in draining mode
    draining: AtomicBool,
    /// Whether server is ready to accept requests
    ready: AtomicBool,
    /// Drain timeout
    drain_timeout: Duration,
    /// Server start time
    start_time: Instant,
    /// Fired to request a shutdown without a signal
    trigger: CancellationToken,
    /// Parent of every per-request token; fired after the drain
    work: CancellationToken,
}

impl ShutdownState {
    /// Create new shutdown state
    pub fn new(drain_timeout: Duration) -> Self {
        Self {
            in_flight: AtomicU64::new(0),
            draining: AtomicBool::new(false),
            ready: AtomicBool::new(true),
            drain_timeout,
            start_time: Instant::now(),
            trigger: CancellationToken::new(),
            work: CancellationToken::new(),
        }
    }

    /// Mark a request as started
    pub fn request_started(&self) {
        self.in_flight.fetch_add(1, Ordering::SeqCst);
    }

    /// Mark a request as completed
    pub fn request_completed(&self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }

    /// Get the number of in-flight requests
    pub fn in_flight_count(&self) -> u64 {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Check if we're draining
    pub fn is_draining(&self) -> bool {
        self.draining.load(Ordering::SeqCst)
    }

    /// Check if server is ready
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst) && !self.is_draining()
    }

    /// Start draining (stop accepting new requests)
    pub fn start_drain(&self) {
        info!("Starting graceful shutdown, marking as draining");
        self.draining.store(true, Ordering::SeqCst);
        self.ready.store(false, Ordering::SeqCst);
    }

    /// Set readiness state
    pub fn set_ready(&self, ready: bool) {
        self.ready.store(ready, Ordering::SeqCst);
    }

    /// Get uptime
    pub fn uptime(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Get drain timeout
    pub fn drain_timeout(&self) -> Duration {
        self.drain_timeout
    }

    /// A token cancelled when the server stops waiting for work.
    pub fn child_token(&self) -> CancellationToken {
        self.work.child_token()
    }

    /// Request a shutdown, as a signal would.
    pub fn trigger_shutdown(&self) {
        self.trigger.cancel();
    }

    /// Cancel every outstanding request token.
    pub fn cancel_work(&self) {
        self.work.cancel();
    }

    /// Wait for all in-flight requests to complete
    pub async fn wait_for_drain(&self) {
        let drain_start = Instant::now();

        while self.in_flight_count() > 0 {
            if drain_start.elapsed() > self.drain_timeout {
                warn!(
                    remaining_requests = self.in_flight_count(),
                    "Drain timeout exceeded, forcing shutdown"
                );
                break;
            }

            info!(
                in_flight = self.in_flight_count(),
                elapsed_ms = drain_start.elapsed().as_millis() as u64,
                "Waiting for in-flight requests to complete"
            );

            tokio::time::sleep(Duration::from_millis(100)).await;
        }

        info!("All requests drained, proceeding with shutdown");
    }
}

impl Default for ShutdownState {
    fn default() -> Self {
        Self::new(Duration::from_secs(30))
    }
}

/// Drain status response
#[derive(Debug, Serialize)]
pub struct DrainStatus {
    pub draining: bool,
    pub in_flight_requests: u64,
    pub ready: bool,
    pub uptime_seconds: u64,
}

impl DrainStatus {
    pub fn of(shutdown: &ShutdownState) -> Self {
        Self {
            draining: shutdown.is_draining(),
            in_flight_requests: shutdown.in_flight_count(),
            ready: shutdown.is_ready(),
            uptime_seconds: shutdown.uptime().as_secs(),
        }
    }
}

/// Decrements the in-flight count even if the request future is dropped.
struct InFlight<'a>(&'a ShutdownState);

impl<'a> InFlight<'a> {
    fn start(shutdown: &'a ShutdownState) -> Self {
        shutdown.request_started();
        Self(shutdown)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.request_completed();
    }
}

/// Request tracking middleware
pub async fn request_tracking_middleware(
    State(shutdown): State<Arc<ShutdownState>>,
    request: Request,
    next: Next,
) -> Result<Response, DrainError> {
    // Reject new requests if draining
    if shutdown.is_draining() {
        return Err(DrainError);
    }

    let _in_flight = InFlight::start(&shutdown);
    Ok(next.run(request).await)
}

/// Error returned when server is draining
#[derive(Debug)]
pub struct DrainError;

impl IntoResponse for DrainError {
    fn into_response(self) -> Response {
        let body = ErrorResponse::new(
            "service_unavailable",
            "Server is shutting down. Please retry your request.",
        );
        (StatusCode::SERVICE_UNAVAILABLE, Json(body)).into_response()
    }
}

/// Resolve on SIGINT or SIGTERM, returning the signal name.
///
/// A handler that cannot be installed is logged and never resolves.
pub async fn wait_for_signal() -> &'static str {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => "SIGINT",
        _ = terminate => "SIGTERM",
    }
}

/// Graceful shutdown handler
///
/// Waits for a signal or [`ShutdownState::trigger_shutdown`], drains, then
/// cancels outstanding work.
pub async fn graceful_shutdown(shutdown_state: Arc<ShutdownState>) {
    tokio::select! {
        signal = wait_for_signal() => {
            info!(signal, "Received signal, shutting down");
        }
        _ = shutdown_state.trigger.cancelled() => {
            info!("Shutdown requested");
        }
    }

    shutdown_state.start_drain();
    shutdown_state.wait_for_drain().await;
    shutdown_state.cancel_work();
}
