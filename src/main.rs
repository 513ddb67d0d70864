//! pingpong CLI
//!
//! Demo HTTP client/server with configurable latency, errors and metrics.

use clap::Parser;

use pingpong::cli::{execute, Cli};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    execute(cli).await
}
