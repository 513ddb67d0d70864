//! Server state management

use std::sync::Arc;

use tracing::info;

use super::shutdown::ShutdownState;
use crate::config::PingPongConfig;
use crate::decider::{source_for_seed, UniformSource};
use crate::error::SimulatorResult;
use crate::simulator::{DependencySimulator, PingResponder};
use crate::telemetry::{record_build_info, DbMetrics, HttpServerMetrics, MetricsRegistry};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub responder: Arc<PingResponder>,
    pub registry: Arc<MetricsRegistry>,
    pub http_metrics: HttpServerMetrics,
    pub config: Arc<PingPongConfig>,
    pub shutdown: Arc<ShutdownState>,
}

impl AppState {
    /// Build the pong state, seeding randomness from `pong.seed` when set.
    pub fn new(config: PingPongConfig) -> SimulatorResult<Self> {
        let source = source_for_seed(config.pong.seed);
        Self::with_source(config, source)
    }

    /// Build the pong state with every decision drawn from `source`.
    pub fn with_source(config: PingPongConfig, source: Arc<dyn UniformSource>) -> SimulatorResult<Self> {
        config.validate()?;

        let registry = Arc::new(MetricsRegistry::new());
        record_build_info(&registry, "pong", &config.pong.app_version);
        let http_metrics = HttpServerMetrics::new(registry.clone());

        let mut responder = PingResponder::new(
            &config.pong.latency,
            config.pong.success_prob,
            source.clone(),
        )?;

        if config.database.enabled {
            let db_metrics = DbMetrics::new(registry.clone(), None);
            let simulator = DependencySimulator::with_source(
                Arc::new(db_metrics),
                &config.database.simulator_opts(),
                source,
            )?;
            info!(
                latency = %config.database.latency,
                success_prob = config.database.success_prob,
                error_types = %config.database.error_types,
                "Database simulation enabled"
            );
            responder = responder.with_database(Arc::new(simulator));
        }

        Ok(Self {
            responder: Arc::new(responder),
            registry,
            http_metrics,
            shutdown: Arc::new(ShutdownState::new(config.server.request_timeout)),
            config: Arc::new(config),
        })
    }
}

/// State of a server that only exposes metrics, such as the ping client's.
#[derive(Clone)]
pub struct MetricsState {
    pub registry: Arc<MetricsRegistry>,
    pub http_metrics: HttpServerMetrics,
    pub shutdown: Arc<ShutdownState>,
}

impl MetricsState {
    pub fn new(registry: Arc<MetricsRegistry>, shutdown: Arc<ShutdownState>) -> Self {
        Self {
            http_metrics: HttpServerMetrics::new(registry.clone()),
            registry,
            shutdown,
        }
    }
}
