//! Configuration management commands.

use crate::{config_path, load_config};
use clap::Args;
use courier_core::config::Config;
use courier_core::secret::REDACTED;
use courier_core::ConfigError;
use serde_json::Value;
use std::path::Path;

/// Config command arguments.
#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(clap::Subcommand)]
pub enum ConfigCommand {
    /// Show the effective configuration
    Show,

    /// Get a configuration value
    Get {
        /// Configuration key (dot-separated path)
        key: String,
    },

    /// Set a configuration value
    Set {
        /// Configuration key
        key: String,

        /// Value to set
        value: String,
    },

    /// Initialize configuration
    Init {
        /// Force overwrite existing config
        #[arg(short, long)]
        force: bool,
    },

    /// Show configuration file path
    Path,

    /// Validate configuration
    Validate,
}

/// Run the config command.
pub async fn run(args: ConfigArgs, explicit: Option<&Path>) -> anyhow::Result<()> {
    match args.command {
        ConfigCommand::Show => {
            let config = load_config(explicit)?;
            let mut json = serde_json::to_value(&config)?;
            redact_secrets(&mut json);
            println!("{}", serde_json::to_string_pretty(&json)?);
        }

        ConfigCommand::Get { key } => {
            let config = load_config(explicit)?;
            let mut json = serde_json::to_value(&config)?;
            redact_secrets(&mut json);

            match get_path(&json, &key) {
                Some(v) => println!("{}", serde_json::to_string_pretty(v)?),
                None => anyhow::bail!("Key not found: {}", key),
            }
        }

        ConfigCommand::Set { key, value } => {
            // Edit the file as written; env overrides must not be persisted
            let path = config_path(explicit)?;
            let config = match Config::load(&path) {
                Ok(config) => config,
                Err(ConfigError::NotFound(_)) => Config::default(),
                Err(e) => return Err(e.into()),
            };

            let updated = apply_set(&config, &key, &value)?;
            updated.validate()?;
            updated.save(&path)?;

            println!("Set {} = {}", key, value);
        }

        ConfigCommand::Init { force } => {
            let path = config_path(explicit)?;

            if path.exists() && !force {
                anyhow::bail!(
                    "Config file already exists: {:?}. Use --force to overwrite.",
                    path
                );
            }

            Config::default().save(&path)?;
            println!("Created config file: {:?}", path);
        }

        ConfigCommand::Path => {
            println!("{}", config_path(explicit)?.display());
        }

        ConfigCommand::Validate => {
            let path = config_path(explicit)?;
            let config = Config::load(&path)
                .map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;
            match config.validate() {
                Ok(_) => println!("Configuration is valid"),
                Err(e) => anyhow::bail!("Configuration error: {}", e),
            }
        }
    }

    Ok(())
}

/// Walk a dot-separated key path.
fn get_path<'a>(json: &'a Value, key: &str) -> Option<&'a Value> {
    key.split('.').try_fold(json, |acc, k| acc.get(k))
}

/// Set a dot-separated key path, creating intermediate objects as needed.
///
/// The value is parsed as JSON first (numbers, bools, arrays) and falls back
/// to a plain string.
fn set_path(json: &mut Value, key: &str, raw: &str) {
    let parsed = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
    let parts: Vec<&str> = key.split('.').collect();
    let mut current = json;
    for (i, part) in parts.iter().enumerate() {
        if i == parts.len() - 1 {
            current[*part] = parsed;
            return;
        }
        if !current.get(*part).is_some_and(Value::is_object) {
            current[*part] = serde_json::json!({});
        }
        current = &mut current[*part];
    }
}

/// Apply a `config set` to a config, returning the updated one.
fn apply_set(config: &Config, key: &str, raw: &str) -> anyhow::Result<Config> {
    let mut json = serde_json::to_value(config)?;
    set_path(&mut json, key, raw);
    serde_json::from_value(json)
        .map_err(|e| anyhow::anyhow!("Invalid configuration after set: {}", e))
}

fn redact_secrets(json: &mut Value) {
    if let Some(secret) = json.pointer_mut("/auth/jwt_secret") {
        if !secret.is_null() {
            *secret = Value::String(REDACTED.to_string());
        }
    }
}
