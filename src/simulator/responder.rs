//! The decision logic behind `GET /ping`

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use super::{suspend, validate_success_prob, DependencySimulator, SimulationResult};
use crate::decider::{LatencyDecider, UniformSource};
use crate::error::{SimulationError, SimulatorResult};

/// Table queried by the optional database simulation.
pub const PING_TABLE: &str = "users";

/// How a single ping was answered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PingOutcome {
    /// Respond `200 pong`
    Pong,
    /// Respond `500`
    Failed,
    /// The server is shutting down; the wait was abandoned
    Cancelled,
}

/// Result of [`PingResponder::respond`]
#[derive(Debug, Clone)]
pub struct PingReply {
    pub outcome: PingOutcome,
    /// Time spent answering, including the database call
    pub elapsed: Duration,
    /// Result of the simulated database call, when enabled
    pub db: Option<SimulationResult>,
}

/// Decides latency and success for every ping, optionally calling a
/// simulated database first.
pub struct PingResponder {
    latency: LatencyDecider,
    success_prob: f64,
    source: Arc<dyn UniformSource>,
    database: Option<Arc<DependencySimulator>>,
}

impl PingResponder {
    pub fn new(latency: &str, success_prob: f64, source: Arc<dyn UniformSource>) -> SimulatorResult<Self> {
        let latency = LatencyDecider::parse(latency)
            .map_err(|e| SimulationError::distribution("pong.latency", e))?;
        validate_success_prob("pong.success_prob", success_prob)?;

        Ok(Self {
            latency,
            success_prob,
            source,
            database: None,
        })
    }

    /// Run a simulated `select` on every ping.
    pub fn with_database(mut self, database: Arc<DependencySimulator>) -> Self {
        self.database = Some(database);
        self
    }

    pub fn database(&self) -> Option<&Arc<DependencySimulator>> {
        self.database.as_ref()
    }

    pub fn success_prob(&self) -> f64 {
        self.success_prob
    }

    pub async fn respond(&self, cancel: &CancellationToken) -> PingReply {
        let start = Instant::now();

        let latency = *self.latency.decide(self.source.as_ref());
        if !suspend(latency, cancel).await {
            return PingReply {
                outcome: PingOutcome::Cancelled,
                elapsed: start.elapsed(),
                db: None,
            };
        }

        let db = match &self.database {
            Some(database) => {
                let result = database.simulate_select(cancel, PING_TABLE).await;
                if result.is_cancelled() {
                    return PingReply {
                        outcome: PingOutcome::Cancelled,
                        elapsed: start.elapsed(),
                        db: Some(result),
                    };
                }
                if !result.success {
                    warn!(
                        error_type = result.error_type.as_deref().unwrap_or_default(),
                        "Simulated db query failed during ping"
                    );
                }
                Some(result)
            }
            None => None,
        };

        let outcome = if self.source.sample() <= self.success_prob {
            PingOutcome::Pong
        } else {
            PingOutcome::Failed
        };

        PingReply {
            outcome,
            elapsed: start.elapsed(),
            db,
        }
    }
}
