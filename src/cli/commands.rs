//! CLI Command Implementations

use std::path::Path;

use anyhow::{bail, Context, Result};

use crate::config::PingPongConfig;
use crate::telemetry::init_telemetry;
use crate::VERSION;

use super::{Cli, Commands, ConfigAction, ConfigCommand, PingCommand, PongCommand};

/// Execute the CLI command
pub async fn execute(cli: Cli) -> Result<()> {
    let mut config = load_config(cli.config.as_deref())?;

    // Apply global settings
    if let Some(level) = cli.log_level {
        config.telemetry.log_level = level;
    }
    if let Some(format) = cli.log_format {
        config.telemetry.log_format = format.parse()?;
    }

    match cli.command {
        Commands::Pong(cmd) => execute_pong(cmd, config).await,
        Commands::Ping(cmd) => execute_ping(cmd, config).await,
        Commands::Config(cmd) => execute_config(cmd, config),
        Commands::Version => execute_version(),
    }
}

/// Configuration file (or defaults), then environment overrides.
pub fn load_config(path: Option<&Path>) -> Result<PingPongConfig> {
    let mut config = match path {
        Some(path) => PingPongConfig::from_file(path)
            .with_context(|| format!("Loading configuration from {:?}", path))?,
        None => PingPongConfig::default(),
    };
    config.apply_env().context("Applying environment overrides")?;
    Ok(config)
}

impl PongCommand {
    /// Overlay the flags that were given on `config`.
    pub fn apply(self, config: &mut PingPongConfig) {
        if let Some(addr) = self.listen_address {
            config.server.host = addr.host;
            config.server.port = addr.port;
        }
        if let Some(version) = self.set_version {
            config.pong.app_version = version;
        }
        if let Some(latency) = self.latency {
            config.pong.latency = latency;
        }
        if let Some(prob) = self.success_prob {
            config.pong.success_prob = prob;
        }
        if let Some(seed) = self.seed {
            config.pong.seed = Some(seed);
        }
        if self.db_enabled {
            config.database.enabled = true;
        }
        if let Some(latency) = self.db_latency {
            config.database.latency = latency;
        }
        if let Some(prob) = self.db_success_prob {
            config.database.success_prob = prob;
        }
        if let Some(error_types) = self.db_error_types {
            config.database.error_types = error_types;
        }
    }
}

impl PingCommand {
    /// Overlay the flags that were given on `config`.
    pub fn apply(self, config: &mut PingPongConfig) {
        if let Some(addr) = self.listen_address {
            config.ping.listen_host = addr.host;
            config.ping.listen_port = addr.port;
        }
        if let Some(endpoint) = self.endpoint {
            config.ping.endpoint = endpoint;
        }
        if let Some(rate) = self.pings_per_second {
            config.ping.pings_per_second = rate;
        }
    }
}

/// Execute the pong command
async fn execute_pong(cmd: PongCommand, mut config: PingPongConfig) -> Result<()> {
    cmd.apply(&mut config);
    config.validate().context("Configuration validation failed")?;
    init_telemetry(&config.telemetry)?;

    crate::run_server(config).await
}

/// Execute the ping command
async fn execute_ping(cmd: PingCommand, mut config: PingPongConfig) -> Result<()> {
    cmd.apply(&mut config);
    config.validate().context("Configuration validation failed")?;
    init_telemetry(&config.telemetry)?;

    crate::run_pinger(config).await
}

/// Execute the config command
fn execute_config(cmd: ConfigCommand, config: PingPongConfig) -> Result<()> {
    match cmd.action {
        ConfigAction::Show { format } => {
            println!("{}", render_config(&config, &format)?);
            Ok(())
        }

        ConfigAction::Validate { file } => {
            let config = PingPongConfig::from_file(&file)?;
            println!("Configuration at {:?} is valid", file);
            println!("  Listen:      {}:{}", config.server.host, config.server.port);
            println!("  Latency:     {}", config.pong.latency);
            println!("  Success:     {}%", config.pong.success_prob);
            println!(
                "  Database:    {}",
                if config.database.enabled { "enabled" } else { "disabled" }
            );
            println!("  Ping target: {}", config.ping.endpoint);
            Ok(())
        }

        ConfigAction::Init { output, force } => {
            if output.exists() && !force {
                bail!("File {:?} already exists. Use --force to overwrite.", output);
            }

            let format = output
                .extension()
                .and_then(|e| e.to_str())
                .unwrap_or("yaml");
            let rendered = render_config(&PingPongConfig::default(), format)?;
            std::fs::write(&output, rendered)
                .with_context(|| format!("Writing {:?}", output))?;
            println!("Created configuration file: {:?}", output);
            Ok(())
        }
    }
}

/// Serialize `config` as yaml (the default), toml or json.
pub fn render_config(config: &PingPongConfig, format: &str) -> Result<String> {
    Ok(match format {
        "toml" => toml::to_string_pretty(config)?,
        "json" => serde_json::to_string_pretty(config)?,
        "yaml" | "yml" => serde_yaml::to_string(config)?,
        other => bail!("Unsupported format {:?}. Use yaml, toml, or json", other),
    })
}

/// Execute the version command
fn execute_version() -> Result<()> {
    println!("pingpong {}", VERSION);
    println!("  rust-version: {}", env!("CARGO_PKG_RUST_VERSION"));
    println!("  license:      {}", env!("CARGO_PKG_LICENSE"));
    Ok(())
}
