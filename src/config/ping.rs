//! Load generator settings

use std::net::SocketAddr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use super::{humantime_serde, resolve_addr};
use crate::error::{SimulationError, SimulatorResult};

/// Settings of the `ping` command
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PingConfig {
    /// Host of the client's own `/metrics` server
    pub listen_host: String,
    pub listen_port: u16,
    /// Pong endpoint to send requests to
    pub endpoint: String,
    /// Pings spawned every second
    pub pings_per_second: u32,
    /// Timeout of a single ping
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
}

impl Default for PingConfig {
    fn default() -> Self {
        Self {
            listen_host: "0.0.0.0".to_string(),
            listen_port: 8081,
            endpoint: "http://localhost:8080/ping".to_string(),
            pings_per_second: 10,
            request_timeout: Duration::from_secs(5),
        }
    }
}

impl PingConfig {
    pub fn validate(&self) -> SimulatorResult<()> {
        self.endpoint_url()?;
        if self.listen_port == 0 {
            return Err(SimulationError::Validation {
                message: "Port cannot be 0".to_string(),
                param: Some("ping.listen_port".to_string()),
            });
        }
        if self.pings_per_second == 0 {
            return Err(SimulationError::Validation {
                message: "pings_per_second must be greater than 0".to_string(),
                param: Some("ping.pings_per_second".to_string()),
            });
        }
        if self.request_timeout.is_zero() {
            return Err(SimulationError::Validation {
                message: "request_timeout must be greater than 0".to_string(),
                param: Some("ping.request_timeout".to_string()),
            });
        }
        Ok(())
    }

    /// The endpoint, parsed. Only `http` and `https` are accepted.
    pub fn endpoint_url(&self) -> SimulatorResult<Url> {
        let url = Url::parse(&self.endpoint).map_err(|e| SimulationError::Validation {
            message: format!("invalid endpoint {:?}: {}", self.endpoint, e),
            param: Some("ping.endpoint".to_string()),
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(SimulationError::Validation {
                message: format!("endpoint scheme must be http or https, got {}", url.scheme()),
                param: Some("ping.endpoint".to_string()),
            });
        }
        Ok(url)
    }

    pub fn socket_addr(&self) -> SimulatorResult<SocketAddr> {
        resolve_addr(&self.listen_host, self.listen_port)
    }
}
