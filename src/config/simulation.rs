//! Ping handler and database simulation settings

use serde::{Deserialize, Serialize};

use crate::distribution::{LabelDistribution, LatencyDistribution};
use crate::error::{SimulationError, SimulatorResult};
use crate::simulator::{validate_success_prob, SimulatorOpts, DEFAULT_ERROR_TYPES};

/// Behavior of `GET /ping`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PongConfig {
    /// Encoded latency distribution, `<probability>%<duration>,...`
    pub latency: String,
    /// Probability (in %) of answering `200 pong`
    pub success_prob: f64,
    /// Version reported by `pong_build_info`
    pub app_version: String,
    /// Seed for reproducible runs (None = thread RNG)
    pub seed: Option<u64>,
}

impl Default for PongConfig {
    fn default() -> Self {
        Self {
            latency: "90%500ms,10%200ms".to_string(),
            success_prob: 100.0,
            app_version: "first".to_string(),
            seed: None,
        }
    }
}

impl PongConfig {
    pub fn validate(&self) -> SimulatorResult<()> {
        LatencyDistribution::parse(&self.latency)
            .map_err(|e| SimulationError::distribution("pong.latency", e))?;
        validate_success_prob("pong.success_prob", self.success_prob)?;
        if self.app_version.is_empty() {
            return Err(SimulationError::Validation {
                message: "app_version cannot be empty".to_string(),
                param: Some("pong.app_version".to_string()),
            });
        }
        Ok(())
    }
}

/// Simulated database queried on every ping
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub enabled: bool,
    /// Encoded latency distribution of a query
    pub latency: String,
    /// Probability (in %) of a successful query
    pub success_prob: f64,
    /// Encoded error-type distribution, `<probability>%<error_type>,...`
    pub error_types: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        let opts = SimulatorOpts::default();
        Self {
            enabled: false,
            latency: opts.latency,
            success_prob: opts.success_prob,
            error_types: opts.error_types,
        }
    }
}

impl DatabaseConfig {
    /// Validated even when disabled, so a bad value fails before it is switched on.
    pub fn validate(&self) -> SimulatorResult<()> {
        LatencyDistribution::parse(&self.latency)
            .map_err(|e| SimulationError::distribution("database.latency", e))?;
        validate_success_prob("database.success_prob", self.success_prob)?;

        let error_types = if self.error_types.is_empty() {
            DEFAULT_ERROR_TYPES
        } else {
            self.error_types.as_str()
        };
        LabelDistribution::parse(error_types)
            .map_err(|e| SimulationError::distribution("database.error_types", e))?;
        Ok(())
    }

    pub fn simulator_opts(&self) -> SimulatorOpts {
        SimulatorOpts {
            latency: self.latency.clone(),
            success_prob: self.success_prob,
            error_types: self.error_types.clone(),
        }
    }
}
