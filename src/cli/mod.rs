//! CLI Module for pingpong
//!
//! Provides the command-line interface with subcommands for:
//! - Starting the pong server
//! - Starting the ping load generator
//! - Managing configuration

mod commands;

pub use commands::*;

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use clap::{Parser, Subcommand};

use crate::VERSION;

/// pingpong: demo HTTP client/server for exercising observability tooling
#[derive(Parser, Debug)]
#[command(name = "pingpong")]
#[command(version = VERSION)]
#[command(about = "Pingpong is a demo HTTP client/server for testing")]
#[command(
    long_about = "Pingpong provides ping and pong commands for testing HTTP request/response with configurable latency and metrics."
)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Configuration file path (YAML, TOML, or JSON)
    #[arg(short, long, global = true, env = "PINGPONG_CONFIG")]
    pub config: Option<PathBuf>,

    /// Only log messages with the given severity or above. One of: [trace, debug, info, warn, error]
    #[arg(long = "log.level", global = true)]
    pub log_level: Option<String>,

    /// Output format of log messages. One of: [logfmt, json]
    #[arg(long = "log.format", global = true)]
    pub log_format: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the pong HTTP server
    ///
    /// Responds to /ping requests with configurable latency and success probability.
    Pong(PongCommand),

    /// Start the ping client that sends requests to a pong server
    ///
    /// Continuously sends HTTP requests to a pong server endpoint with configurable rate.
    Ping(PingCommand),

    /// Configuration management
    #[command(alias = "cfg")]
    Config(ConfigCommand),

    /// Show version and build information
    Version,
}

/// Start the pong HTTP server
#[derive(Parser, Debug, Default)]
pub struct PongCommand {
    /// The address to listen on for HTTP requests [default: :8080]
    #[arg(long)]
    pub listen_address: Option<ListenAddress>,

    /// Injected version to be presented via metrics [default: first]
    #[arg(long)]
    pub set_version: Option<String>,

    /// Encoded latency and probability of the response in format as: <probability>%<duration>,<probability>%<duration>.... [default: 90%500ms,10%200ms]
    #[arg(long)]
    pub latency: Option<String>,

    /// The probability (in %) of getting a successful response [default: 100]
    #[arg(long)]
    pub success_prob: Option<f64>,

    /// Enable database simulation metrics
    #[arg(long)]
    pub db_enabled: bool,

    /// Encoded latency and probability for simulated DB queries in format: <probability>%<duration>,... [default: 90%10ms,10%50ms]
    #[arg(long)]
    pub db_latency: Option<String>,

    /// The probability (in %) of a successful simulated DB query [default: 95]
    #[arg(long)]
    pub db_success_prob: Option<f64>,

    /// Distribution of error types when DB queries fail in format: <probability>%<error_type>,... [default: 50%timeout,30%connection,20%deadlock]
    #[arg(long)]
    pub db_error_types: Option<String>,

    /// Seed for reproducible latency and outcome decisions
    #[arg(long)]
    pub seed: Option<u64>,
}

/// Start the ping client
#[derive(Parser, Debug, Default)]
pub struct PingCommand {
    /// The address to listen on for HTTP requests [default: :8081]
    #[arg(long)]
    pub listen_address: Option<ListenAddress>,

    /// The address of pong app we can connect to and send requests [default: http://localhost:8080/ping]
    #[arg(long)]
    pub endpoint: Option<String>,

    /// How many pings per second we should request [default: 10]
    #[arg(long)]
    pub pings_per_second: Option<u32>,
}

/// Configuration management
#[derive(Parser, Debug)]
pub struct ConfigCommand {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show the effective configuration
    Show {
        /// Output format (yaml, toml, json)
        #[arg(short, long, default_value = "yaml")]
        format: String,
    },

    /// Validate a configuration file
    Validate {
        /// Configuration file to validate
        file: PathBuf,
    },

    /// Write a configuration file with default values
    Init {
        /// Output file path
        #[arg(short, long, default_value = "pingpong.yaml")]
        output: PathBuf,

        /// Force overwrite existing file
        #[arg(short, long)]
        force: bool,
    },
}

/// A `host:port` listen address. An empty host (`:8080`) means all interfaces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListenAddress {
    pub host: String,
    pub port: u16,
}

impl FromStr for ListenAddress {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (host, port) = s
            .rsplit_once(':')
            .ok_or_else(|| format!("missing port in address {:?}", s))?;
        let port = port
            .parse()
            .map_err(|e| format!("invalid port in address {:?}: {}", s, e))?;

        let host = host.trim_start_matches('[').trim_end_matches(']');
        let host = if host.is_empty() { "0.0.0.0" } else { host };

        Ok(Self {
            host: host.to_string(),
            port,
        })
    }
}

impl fmt::Display for ListenAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}
