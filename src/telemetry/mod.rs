//! Telemetry and observability module
//!
//! Provides:
//! - Structured logging with tracing
//! - A labeled Prometheus metrics registry
//! - Database, HTTP server and HTTP client metric families

mod db;
mod http;
mod logfmt;
mod metrics;

pub use db::*;
pub use http::*;
pub use logfmt::Logfmt;
pub use metrics::*;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::TelemetryConfig;
use crate::error::{SimulationError, SimulatorResult};

/// Accepted values of `log_level`.
pub const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Output format of log lines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// `ts=... level=info msg="..." key=value` lines
    #[default]
    Logfmt,
    Json,
}

impl FromStr for LogFormat {
    type Err = SimulationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "logfmt" => Ok(Self::Logfmt),
            "json" => Ok(Self::Json),
            other => Err(SimulationError::Validation {
                message: format!("unknown log format {:?}, expected logfmt or json", other),
                param: Some("log.format".to_string()),
            }),
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Logfmt => f.write_str("logfmt"),
            Self::Json => f.write_str("json"),
        }
    }
}

/// Reject log levels the filter would not understand.
pub fn validate_log_level(level: &str) -> SimulatorResult<()> {
    if LOG_LEVELS.contains(&level.to_ascii_lowercase().as_str()) {
        Ok(())
    } else {
        Err(SimulationError::Validation {
            message: format!("invalid log level {:?}, expected one of {}", level, LOG_LEVELS.join("|")),
            param: Some("log.level".to_string()),
        })
    }
}

/// Initialize the telemetry subsystem
///
/// `RUST_LOG` takes precedence over the configured level. Returns an error if
/// a global subscriber is already installed.
pub fn init_telemetry(config: &TelemetryConfig) -> SimulatorResult<()> {
    validate_log_level(&config.log_level)?;

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let subscriber = tracing_subscriber::registry().with(env_filter);

    let result = match config.log_format {
        LogFormat::Json => {
            let json_layer = tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr)
                .with_file(true)
                .with_line_number(true)
                .with_target(true);

            subscriber.with(json_layer).try_init()
        }
        LogFormat::Logfmt => {
            let fmt_layer = tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .event_format(Logfmt);

            subscriber.with(fmt_layer).try_init()
        }
    };
    result.map_err(|e| SimulationError::Config(format!("installing log subscriber: {}", e)))?;

    tracing::debug!(
        level = %config.log_level,
        format = %config.log_format,
        "Telemetry initialized"
    );

    Ok(())
}
