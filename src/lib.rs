//! # pingpong
//!
//! Request/response latency-and-error simulator for exercising observability
//! tooling such as metrics dashboards and alerts.
//!
//! ## Features
//!
//! - **Weighted distributions**: compact `90%500ms,10%200ms` encodings for
//!   latencies and error categories
//! - **Outcome decider**: maps a uniform draw onto a distribution
//! - **Dependency simulation**: cancellable simulated database calls with
//!   Prometheus metrics
//! - **pong / ping**: an instrumented HTTP server and a load generator
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pingpong::{run_server, PingPongConfig};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = PingPongConfig::default();
//!     run_server(config).await
//! }
//! ```

pub mod cli;
pub mod client;
pub mod config;
pub mod decider;
pub mod distribution;
pub mod error;
pub mod server;
pub mod simulator;
pub mod telemetry;

pub use client::run_pinger;
pub use config::PingPongConfig;
pub use decider::{ErrorDecider, LatencyDecider, OutcomeDecider};
pub use distribution::{Distribution, LabelDistribution, LatencyDistribution};
pub use error::{DistributionError, SimulationError, SimulatorResult};
pub use server::run_server;
pub use simulator::{DependencySimulator, SimulationResult, SimulatorOpts};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
