//! Courier command-line interface.

pub mod commands;

use clap::{Parser, Subcommand};
use courier_core::config::{LogLevel, LoggingConfig};
use courier_core::{env, Config};
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Courier - realtime notification, chat and call-signaling gateway
#[derive(Parser)]
#[command(name = "courier")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Increase logging verbosity
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Path to config file
    #[arg(short, long, env = "COURIER_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand)]
pub enum Commands {
    /// Run or inspect the gateway server
    Gateway(commands::gateway::GatewayArgs),

    /// Configuration management
    Config(commands::config::ConfigArgs),

    /// Issue development tokens
    Token(commands::token::TokenArgs),

    /// Show version information
    Version,
}

/// Run the CLI with the given arguments.
pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let config_path = cli.config.as_deref();
    match cli.command {
        Commands::Gateway(args) => commands::gateway::run(args, config_path).await,
        Commands::Config(args) => commands::config::run(args, config_path).await,
        Commands::Token(args) => commands::token::run(args, config_path).await,
        Commands::Version => {
            println!("courier {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

/// Resolve the config file path: explicit path, else the default location.
pub fn config_path(explicit: Option<&Path>) -> anyhow::Result<PathBuf> {
    match explicit {
        Some(path) => Ok(path.to_path_buf()),
        None => Ok(courier_core::paths::config_file()?),
    }
}

/// Load the effective configuration with environment overrides applied.
///
/// An explicit path must exist; the default path falls back to defaults.
pub fn load_config(explicit: Option<&Path>) -> anyhow::Result<Config> {
    match explicit {
        Some(path) => Ok(Config::load(path)?.with_env_overrides()),
        None => Ok(Config::load_or_default()),
    }
}

/// Load the config for logging setup without failing startup.
pub fn load_config_quiet(explicit: Option<&Path>) -> Config {
    match explicit {
        Some(path) => Config::load(path)
            .unwrap_or_default()
            .with_env_overrides(),
        None => Config::load_or_default(),
    }
}

/// Build the log filter. Precedence: `RUST_LOG`, `COURIER_LOG`, `-v`, config.
pub fn build_filter(verbose: u8, level: LogLevel) -> EnvFilter {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return filter;
    }
    if let Ok(filter) = EnvFilter::try_from_env(env::vars::COURIER_LOG) {
        return filter;
    }
    filter_directives(verbose, level)
}

fn filter_directives(verbose: u8, level: LogLevel) -> EnvFilter {
    let (courier, http) = match verbose {
        0 => (level.as_str(), "warn"),
        1 => ("debug", "debug"),
        _ => ("trace", "trace"),
    };
    EnvFilter::new(format!("courier={},tower_http={}", courier, http))
}

/// Install the global tracing subscriber.
pub fn init_logging(verbose: u8, logging: &LoggingConfig) {
    let registry = tracing_subscriber::registry().with(build_filter(verbose, logging.level));
    if logging.json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}
