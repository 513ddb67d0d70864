//! Configuration module for pingpong
//!
//! Provides hierarchical configuration with support for:
//! - YAML/TOML/JSON config files
//! - Environment variable overrides
//! - Validation

mod ping;
mod simulation;

pub use ping::*;
pub use simulation::*;

use std::net::{SocketAddr, ToSocketAddrs};
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{SimulationError, SimulatorResult};
use crate::telemetry::{validate_log_level, LogFormat};

/// Prefix of every environment override
pub const ENV_PREFIX: &str = "PINGPONG_";

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PingPongConfig {
    /// Pong HTTP server
    pub server: ServerConfig,
    /// Ping handler behavior
    pub pong: PongConfig,
    /// Simulated database behind the ping handler
    pub database: DatabaseConfig,
    /// Load generator
    pub ping: PingConfig,
    /// Logging
    pub telemetry: TelemetryConfig,
}

impl PingPongConfig {
    /// Load configuration from a file
    pub fn from_file<P: AsRef<Path>>(path: P) -> SimulatorResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| SimulationError::Config(format!("Failed to read config file: {}", e)))?;

        let config: Self = match path.extension().and_then(|e| e.to_str()) {
            Some("yaml") | Some("yml") => serde_yaml::from_str(&content)
                .map_err(|e| SimulationError::Config(format!("YAML parse error: {}", e)))?,
            Some("toml") => toml::from_str(&content)
                .map_err(|e| SimulationError::Config(format!("TOML parse error: {}", e)))?,
            Some("json") => serde_json::from_str(&content)
                .map_err(|e| SimulationError::Config(format!("JSON parse error: {}", e)))?,
            _ => return Err(SimulationError::Config(
                "Unsupported config file format. Use .yaml, .toml, or .json".to_string()
            )),
        };

        config.validate()?;
        Ok(config)
    }

    /// Defaults with environment variable overrides
    pub fn from_env() -> SimulatorResult<Self> {
        let mut config = Self::default();
        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `PINGPONG_*` overrides from the process environment.
    pub fn apply_env(&mut self) -> SimulatorResult<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides read through `lookup`, keyed by full variable name.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> SimulatorResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |suffix: &str| lookup(&format!("{}{}", ENV_PREFIX, suffix));

        if let Some(host) = var("HOST") {
            self.server.host = host;
        }
        if let Some(port) = var("PORT") {
            self.server.port = parse_env("PORT", &port)?;
        }

        if let Some(latency) = var("LATENCY") {
            self.pong.latency = latency;
        }
        if let Some(prob) = var("SUCCESS_PROB") {
            self.pong.success_prob = parse_env("SUCCESS_PROB", &prob)?;
        }
        if let Some(version) = var("APP_VERSION") {
            self.pong.app_version = version;
        }
        if let Some(seed) = var("SEED") {
            self.pong.seed = Some(parse_env("SEED", &seed)?);
        }

        if let Some(enabled) = var("DB_ENABLED") {
            self.database.enabled = parse_env("DB_ENABLED", &enabled)?;
        }
        if let Some(latency) = var("DB_LATENCY") {
            self.database.latency = latency;
        }
        if let Some(prob) = var("DB_SUCCESS_PROB") {
            self.database.success_prob = parse_env("DB_SUCCESS_PROB", &prob)?;
        }
        if let Some(error_types) = var("DB_ERROR_TYPES") {
            self.database.error_types = error_types;
        }

        if let Some(endpoint) = var("PING_ENDPOINT") {
            self.ping.endpoint = endpoint;
        }
        if let Some(rate) = var("PINGS_PER_SECOND") {
            self.ping.pings_per_second = parse_env("PINGS_PER_SECOND", &rate)?;
        }

        if let Some(level) = var("LOG_LEVEL") {
            self.telemetry.log_level = level;
        }
        if let Some(format) = var("LOG_FORMAT") {
            self.telemetry.log_format = format.parse()?;
        }

        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> SimulatorResult<()> {
        self.server.validate()?;
        self.pong.validate()?;
        self.database.validate()?;
        self.ping.validate()?;
        validate_log_level(&self.telemetry.log_level)?;
        Ok(())
    }
}

fn parse_env<T>(suffix: &str, value: &str) -> SimulatorResult<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e: T::Err| {
        SimulationError::Config(format!("Invalid value for {}{}: {}", ENV_PREFIX, suffix, e))
    })
}

/// Resolve `host:port` to the first socket address it names.
pub fn resolve_addr(host: &str, port: u16) -> SimulatorResult<SocketAddr> {
    (host, port)
        .to_socket_addrs()
        .map_err(|e| SimulationError::Config(format!("Invalid listen address {}:{}: {}", host, port, e)))?
        .next()
        .ok_or_else(|| SimulationError::Config(format!("No address for {}:{}", host, port)))
}

/// Server configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// How long shutdown waits for in-flight requests
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            request_timeout: Duration::from_secs(30),
        }
    }
}

impl ServerConfig {
    pub fn validate(&self) -> SimulatorResult<()> {
        if self.port == 0 {
            return Err(SimulationError::Validation {
                message: "Port cannot be 0".to_string(),
                param: Some("server.port".to_string()),
            });
        }
        if self.host.is_empty() {
            return Err(SimulationError::Validation {
                message: "Host cannot be empty".to_string(),
                param: Some("server.host".to_string()),
            });
        }
        Ok(())
    }

    /// Get the socket address
    pub fn socket_addr(&self) -> SimulatorResult<SocketAddr> {
        resolve_addr(&self.host, self.port)
    }
}

/// Telemetry configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    /// Log level
    pub log_level: String,
    /// `logfmt` or `json`
    pub log_format: LogFormat,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Logfmt,
        }
    }
}

/// Helper module for Duration serialization
pub(crate) mod humantime_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    use crate::distribution::{format_duration, parse_duration};

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&format_duration(*duration))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        parse_duration(s.trim()).map_err(serde::de::Error::custom)
    }
}
