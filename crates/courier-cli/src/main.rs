//! Courier CLI entry point.

use clap::Parser;
use courier_cli::{init_logging, load_config_quiet, run, Cli};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Logging settings come from the config file, so read it before anything logs
    let config = load_config_quiet(cli.config.as_deref());
    init_logging(cli.verbose, &config.logging);

    // Run the command
    run(cli).await
}
