//! Gateway command.

use crate::load_config;
use clap::Args;
use courier_core::config::BindMode;
use courier_gateway::Gateway;
use std::path::Path;
use tracing::info;

/// Gateway command arguments.
#[derive(Args)]
pub struct GatewayArgs {
    #[command(subcommand)]
    pub command: GatewayCommand,
}

#[derive(clap::Subcommand)]
pub enum GatewayCommand {
    /// Start the gateway server
    Run {
        /// Bind mode (loopback, lan); overrides the config file
        #[arg(short, long)]
        bind: Option<String>,

        /// Port number; overrides the config file
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Show gateway status
    Status,
}

/// Run the gateway command.
pub async fn run(args: GatewayArgs, config_path: Option<&Path>) -> anyhow::Result<()> {
    match args.command {
        GatewayCommand::Run { bind, port } => {
            let mut config = load_config(config_path)?;
            if let Some(bind) = bind {
                config.gateway.bind = bind
                    .parse::<BindMode>()
                    .map_err(|e| anyhow::anyhow!(e))?;
            }
            if let Some(port) = port {
                config.gateway.port = port;
            }
            config.validate()?;

            let gateway = Gateway::from_config(&config)?;
            info!(
                port = config.gateway.port,
                namespaces = gateway.namespaces().len(),
                "Starting gateway"
            );
            gateway.run().await?;
        }

        GatewayCommand::Status => {
            let config = load_config(config_path)?;
            let port = config.gateway.port;

            match fetch_health(&health_url(port)).await {
                Ok(health) => {
                    println!("Gateway is running on port {}", port);
                    println!("{}", serde_json::to_string_pretty(&health)?);
                }
                Err(e) => {
                    info!(port, error = %e, "Health probe failed");
                    println!("Gateway is not running.");
                }
            }
        }
    }

    Ok(())
}

fn health_url(port: u16) -> String {
    format!("http://127.0.0.1:{}/health", port)
}

/// Fetch and decode a gateway's `/health` report.
async fn fetch_health(url: &str) -> anyhow::Result<serde_json::Value> {
    let health = reqwest::get(url)
        .await?
        .error_for_status()?
        .json::<serde_json::Value>()
        .await?;
    Ok(health)
}
