//! Request simulation
//!
//! A [`DependencySimulator`] plays the part of a downstream dependency (a
//! database) that a request handler calls. Each call waits for a decided
//! latency, succeeds or fails with a configured probability, picks an error
//! category on failure, and reports everything to an [`Instrumentation`]
//! sink. Failures and cancellations are returned as data, never as `Err`.

mod instrument;
mod responder;

pub use instrument::*;
pub use responder::*;

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::decider::{ErrorDecider, LatencyDecider, ThreadRngSource, UniformSource};
use crate::error::{SimulationError, SimulatorResult};

/// Error category reported when the caller cancels a simulated call.
pub const CONTEXT_CANCELLED: &str = "context_cancelled";

/// Error categories used when none are configured.
pub const DEFAULT_ERROR_TYPES: &str = "100%generic";

pub const STATUS_SUCCESS: &str = "success";
pub const STATUS_ERROR: &str = "error";

/// Options for a [`DependencySimulator`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulatorOpts {
    /// Encoded latency distribution, e.g. `90%10ms,10%100ms`
    pub latency: String,
    /// Probability (in %) of a successful call
    pub success_prob: f64,
    /// Encoded error-type distribution, e.g. `50%timeout,30%connection,20%deadlock`.
    /// Empty means `100%generic`.
    pub error_types: String,
}

impl Default for SimulatorOpts {
    fn default() -> Self {
        Self {
            latency: "90%10ms,10%50ms".to_string(),
            success_prob: 95.0,
            error_types: "50%timeout,30%connection,20%deadlock".to_string(),
        }
    }
}

/// Reject success probabilities outside `0..=100`.
pub fn validate_success_prob(param: &str, value: f64) -> SimulatorResult<()> {
    if !(0.0..=100.0).contains(&value) {
        return Err(SimulationError::Validation {
            message: format!("success probability must be between 0 and 100, got {}", value),
            param: Some(param.to_string()),
        });
    }
    Ok(())
}

/// Outcome of one simulated call
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimulationResult {
    pub success: bool,
    pub error_type: Option<String>,
    pub duration: Duration,
    /// Rows touched by a successful call, 0 otherwise
    pub rows_affected: u32,
}

impl SimulationResult {
    fn cancelled(duration: Duration) -> Self {
        Self {
            success: false,
            error_type: Some(CONTEXT_CANCELLED.to_string()),
            duration,
            rows_affected: 0,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.error_type.as_deref() == Some(CONTEXT_CANCELLED)
    }

    /// The failure as an error value, if the call failed.
    pub fn error(&self) -> Option<SimulatedError> {
        self.error_type.as_ref().map(|error_type| SimulatedError {
            error_type: error_type.clone(),
            message: format!("simulated call failed after {:?}", self.duration),
        })
    }
}

/// A failed simulated call, for callers that want an error value
#[derive(Error, Debug, Clone, PartialEq)]
#[error("simulated db error [{error_type}]: {message}")]
pub struct SimulatedError {
    pub error_type: String,
    pub message: String,
}

/// Wait for `duration` unless `cancel` fires first.
///
/// Returns `true` when the full duration elapsed.
pub async fn suspend(duration: Duration, cancel: &CancellationToken) -> bool {
    if cancel.is_cancelled() {
        return false;
    }
    if duration.is_zero() {
        return true;
    }
    tokio::select! {
        biased;
        _ = cancel.cancelled() => false,
        _ = tokio::time::sleep(duration) => true,
    }
}

/// Simulates calls to a downstream dependency
pub struct DependencySimulator {
    instrumentation: Arc<dyn Instrumentation>,
    latency: LatencyDecider,
    errors: ErrorDecider,
    success_prob: f64,
    source: Arc<dyn UniformSource>,
}

impl DependencySimulator {
    /// Create a simulator drawing from the thread-local RNG
    pub fn new(instrumentation: Arc<dyn Instrumentation>, opts: &SimulatorOpts) -> SimulatorResult<Self> {
        Self::with_source(instrumentation, opts, Arc::new(ThreadRngSource))
    }

    /// Create a simulator drawing every sample from `source`
    pub fn with_source(
        instrumentation: Arc<dyn Instrumentation>,
        opts: &SimulatorOpts,
        source: Arc<dyn UniformSource>,
    ) -> SimulatorResult<Self> {
        let latency = LatencyDecider::parse(&opts.latency)
            .map_err(|e| SimulationError::distribution("latency", e))?;

        let error_types = if opts.error_types.is_empty() {
            DEFAULT_ERROR_TYPES
        } else {
            opts.error_types.as_str()
        };
        let errors = ErrorDecider::parse(error_types)
            .map_err(|e| SimulationError::distribution("error_types", e))?;

        validate_success_prob("success_prob", opts.success_prob)?;

        Ok(Self {
            instrumentation,
            latency,
            errors,
            success_prob: opts.success_prob,
            source,
        })
    }

    pub fn success_prob(&self) -> f64 {
        self.success_prob
    }

    pub fn latency(&self) -> &LatencyDecider {
        &self.latency
    }

    pub fn errors(&self) -> &ErrorDecider {
        &self.errors
    }

    /// Simulate one call of `operation` against `target`.
    ///
    /// Never retries. A cancelled token, before or during the latency wait,
    /// yields a failed result with the `context_cancelled` category.
    pub async fn simulate(
        &self,
        cancel: &CancellationToken,
        operation: &str,
        target: &str,
    ) -> SimulationResult {
        let _inflight = InflightGuard::acquire(self.instrumentation.as_ref(), operation, target);
        let start = Instant::now();

        if cancel.is_cancelled() {
            return self.record_cancelled(operation, target, start.elapsed());
        }

        let latency = *self.latency.decide(self.source.as_ref());
        if !suspend(latency, cancel).await {
            return self.record_cancelled(operation, target, start.elapsed());
        }

        let duration = start.elapsed();

        if self.source.sample() <= self.success_prob {
            let rows_affected = (self.source.sample() as u32).min(99) + 1;
            self.instrumentation
                .record_query(operation, target, STATUS_SUCCESS, duration.as_secs_f64());
            self.instrumentation
                .record_rows_affected(operation, target, rows_affected);

            debug!(
                operation,
                table = target,
                duration_ms = duration.as_secs_f64() * 1000.0,
                rows_affected,
                "Simulated db query succeeded"
            );

            return SimulationResult {
                success: true,
                error_type: None,
                duration,
                rows_affected,
            };
        }

        let error_type = self.errors.decide(self.source.as_ref()).clone();
        self.instrumentation
            .record_query(operation, target, STATUS_ERROR, duration.as_secs_f64());
        self.instrumentation
            .record_error(operation, target, &error_type);

        warn!(
            operation,
            table = target,
            duration_ms = duration.as_secs_f64() * 1000.0,
            error_type = %error_type,
            "Simulated db query failed"
        );

        SimulationResult {
            success: false,
            error_type: Some(error_type),
            duration,
            rows_affected: 0,
        }
    }

    pub async fn simulate_select(&self, cancel: &CancellationToken, table: &str) -> SimulationResult {
        self.simulate(cancel, "select", table).await
    }

    pub async fn simulate_insert(&self, cancel: &CancellationToken, table: &str) -> SimulationResult {
        self.simulate(cancel, "insert", table).await
    }

    pub async fn simulate_update(&self, cancel: &CancellationToken, table: &str) -> SimulationResult {
        self.simulate(cancel, "update", table).await
    }

    pub async fn simulate_delete(&self, cancel: &CancellationToken, table: &str) -> SimulationResult {
        self.simulate(cancel, "delete", table).await
    }

    fn record_cancelled(&self, operation: &str, target: &str, elapsed: Duration) -> SimulationResult {
        self.instrumentation
            .record_error(operation, target, CONTEXT_CANCELLED);
        self.instrumentation
            .record_query(operation, target, STATUS_ERROR, elapsed.as_secs_f64());
        SimulationResult::cancelled(elapsed)
    }
}
