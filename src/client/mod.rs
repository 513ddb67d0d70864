//! Ping load generator
//!
//! Sends a fixed number of pings per second to a pong endpoint and records
//! client-side HTTP metrics. The process also serves its own `/metrics`.

use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::task::JoinSet;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};
use url::Url;

use crate::config::PingPongConfig;
use crate::error::SimulatorResult;
use crate::server::{create_metrics_router, serve, MetricsState, ShutdownState};
use crate::telemetry::{record_build_info, HttpClientMetrics, MetricsRegistry};

/// Interval between two bursts of pings
pub const PING_PERIOD: Duration = Duration::from_secs(1);

/// Label recorded as `code` when no response was received
pub const ERROR_CODE: &str = "error";

/// How a single ping ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PingStatus {
    /// A response arrived with this status code
    Response(u16),
    /// Transport failure or timeout
    Failed(String),
    /// The run was stopped before a response arrived
    Cancelled,
}

/// Counts of finished pings
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PingSummary {
    pub sent: u64,
    pub responses: u64,
    pub failures: u64,
    pub cancelled: u64,
}

impl PingSummary {
    fn record(&mut self, status: &PingStatus) {
        match status {
            PingStatus::Response(_) => self.responses += 1,
            PingStatus::Failed(_) => self.failures += 1,
            PingStatus::Cancelled => self.cancelled += 1,
        }
    }
}

/// Sends instrumented `GET` requests to one endpoint
pub struct Pinger {
    client: reqwest::Client,
    endpoint: Url,
    timeout: Duration,
    metrics: HttpClientMetrics,
}

impl Pinger {
    pub fn new(endpoint: Url, timeout: Duration, metrics: HttpClientMetrics) -> SimulatorResult<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("pingpong/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            endpoint,
            timeout,
            metrics,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Send one ping, giving up after the timeout or when `cancel` fires.
    pub async fn ping(&self, cancel: &CancellationToken) -> PingStatus {
        if cancel.is_cancelled() {
            return PingStatus::Cancelled;
        }

        let inflight = self.metrics.track_inflight();
        let start = Instant::now();

        let request = self
            .client
            .get(self.endpoint.clone())
            .timeout(self.timeout)
            .send();

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            result = request => Some(result),
        };
        drop(inflight);

        let elapsed = start.elapsed().as_secs_f64();
        match result {
            None => {
                debug!(endpoint = %self.endpoint, "Ping cancelled");
                PingStatus::Cancelled
            }
            Some(Ok(response)) => {
                let status = response.status().as_u16();
                self.metrics.observe("get", &status.to_string(), elapsed);
                // Drain the body to release the connection.
                let _ = response.bytes().await;
                debug!(endpoint = %self.endpoint, status, "Ping sent successfully");
                PingStatus::Response(status)
            }
            Some(Err(e)) => {
                self.metrics.observe("get", ERROR_CODE, elapsed);
                error!(endpoint = %self.endpoint, error = %e, "Failed to send request");
                PingStatus::Failed(e.to_string())
            }
        }
    }
}

/// Every [`PING_PERIOD`], spawn `pings_per_second` concurrent pings until
/// `cancel` fires, then wait for the outstanding ones.
pub async fn spam_pings(
    pinger: Arc<Pinger>,
    pings_per_second: u32,
    cancel: CancellationToken,
) -> PingSummary {
    spam_pings_every(pinger, pings_per_second, PING_PERIOD, cancel).await
}

/// [`spam_pings`] with a custom period.
pub async fn spam_pings_every(
    pinger: Arc<Pinger>,
    per_tick: u32,
    period: Duration,
    cancel: CancellationToken,
) -> PingSummary {
    info!(endpoint = %pinger.endpoint(), pings_per_tick = per_tick, period_ms = period.as_millis() as u64, "Starting ping spam");

    let mut summary = PingSummary::default();
    let mut tasks = JoinSet::new();
    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }

        for _ in 0..per_tick {
            let pinger = pinger.clone();
            let cancel = cancel.clone();
            tasks.spawn(async move { pinger.ping(&cancel).await });
            summary.sent += 1;
        }

        while let Some(joined) = tasks.try_join_next() {
            if let Ok(status) = joined {
                summary.record(&status);
            }
        }
    }

    while let Some(joined) = tasks.join_next().await {
        if let Ok(status) = joined {
            summary.record(&status);
        }
    }

    info!(
        sent = summary.sent,
        responses = summary.responses,
        failures = summary.failures,
        cancelled = summary.cancelled,
        "Ping spam stopped"
    );
    summary
}

/// Run the ping client until a shutdown signal arrives
pub async fn run_pinger(config: PingPongConfig) -> anyhow::Result<()> {
    let addr = config.ping.socket_addr()?;
    let endpoint = config.ping.endpoint_url()?;

    info!(version = env!("CARGO_PKG_VERSION"), "Starting pinger");

    let registry = Arc::new(MetricsRegistry::new());
    record_build_info(&registry, "ping", &config.pong.app_version);
    let pinger = Arc::new(Pinger::new(
        endpoint,
        config.ping.request_timeout,
        HttpClientMetrics::new(registry.clone()),
    )?);

    let shutdown = Arc::new(ShutdownState::new(config.server.request_timeout));
    let router = create_metrics_router(MetricsState::new(registry, shutdown.clone()));

    let listener = TcpListener::bind(addr).await?;
    info!(address = %listener.local_addr()?, mode = "ping", "Starting HTTP server");

    let spam = tokio::spawn(spam_pings(
        pinger,
        config.ping.pings_per_second,
        shutdown.child_token(),
    ));

    let served = serve(listener, router, shutdown.clone()).await;
    // Stop the pings even if the server failed on its own.
    shutdown.cancel_work();
    spam.await?;
    served?;

    info!("Pinger shutdown complete");
    Ok(())
}
