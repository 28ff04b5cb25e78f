//! Configuration loading and persistence.

use super::Config;
use crate::env;
use crate::error::ConfigError;
use crate::paths;
use crate::types::expand_allowed_roles;
use std::collections::HashSet;
use std::fs;
use std::path::Path;

impl Config {
    /// Load configuration from the default path.
    pub fn load_default() -> Result<Self, ConfigError> {
        let path = paths::config_file()?;
        Self::load(&path)
    }

    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse configuration from a string.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        json5::from_str(content).map_err(|e| ConfigError::Json5(e.to_string()))
    }

    /// Save configuration to the default path.
    pub fn save_default(&self) -> Result<(), ConfigError> {
        let path = paths::config_file()?;
        self.save(&path)
    }

    /// Save configuration to a file path.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = self.to_json5()?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        // Write atomically
        let temp_path = path.with_extension("tmp");
        fs::write(&temp_path, &content)?;
        fs::rename(&temp_path, path)?;

        Ok(())
    }

    /// Serialize to JSON5 string.
    pub fn to_json5(&self) -> Result<String, ConfigError> {
        // json5 has no serializer; plain JSON is valid JSON5.
        serde_json::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Validate the configuration, collecting all errors before returning.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();

        if self.gateway.port == 0 {
            errors.push("Gateway port cannot be 0".to_string());
        }

        if self.gateway.outbound_buffer == 0 {
            errors.push("Gateway outbound_buffer must be greater than 0".to_string());
        }

        if self.gateway.max_connections == 0 {
            errors.push("Gateway max_connections must be greater than 0".to_string());
        }

        if let Some(secret) = &self.auth.jwt_secret {
            if secret.is_empty() {
                errors.push("auth.jwt_secret is set but empty".to_string());
            }
        }

        let mut seen_paths = HashSet::new();
        for (name, ns) in self.namespaces.iter() {
            if !ns.enabled {
                continue;
            }
            if !ns.path.starts_with('/') {
                errors.push(format!(
                    "Namespace '{}': path '{}' must start with '/'",
                    name, ns.path
                ));
            }
            if ns.path == "/health" {
                errors.push(format!("Namespace '{}': path '/health' is reserved", name));
            }
            if !seen_paths.insert(ns.path.as_str()) {
                errors.push(format!(
                    "Namespace '{}': path '{}' is already used by another namespace",
                    name, ns.path
                ));
            }
            match expand_allowed_roles(&ns.allowed_roles) {
                Ok(roles) if roles.is_empty() => {
                    errors.push(format!("Namespace '{}': allowed_roles is empty", name));
                }
                Ok(_) => {}
                Err(e) => errors.push(format!("Namespace '{}': {}", name, e)),
            }
        }

        for (i, user) in self.directory.users.iter().enumerate() {
            if user.id.trim().is_empty() {
                errors.push(format!("Directory user [{}]: id must not be empty", i));
            }
            if user.role.trim().is_empty() {
                errors.push(format!("Directory user [{}]: role must not be empty", i));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors.join("; ")))
        }
    }

    /// Load configuration from the default path, falling back to defaults if no file exists.
    pub fn load_or_default() -> Self {
        let config = match Self::load_default() {
            Ok(config) => config,
            Err(ConfigError::NotFound(_)) => Self::default(),
            Err(e) => {
                tracing::warn!("Failed to load config, using defaults: {}", e);
                Self::default()
            }
        };
        config.with_env_overrides()
    }

    /// Apply `COURIER_*` environment overrides.
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(port) = env::get_u16(env::vars::COURIER_PORT) {
            self.gateway.port = port;
        }
        if let Some(secret) = env::get_var(env::vars::COURIER_JWT_SECRET) {
            self.auth.jwt_secret = Some(secret.into());
        }
        if env::get_bool(env::vars::COURIER_LOG_JSON) {
            self.logging.json = true;
        }
        self
    }
}
