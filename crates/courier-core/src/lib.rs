//! # courier-core
//!
//! Core types, configuration, and utilities for Courier.
//!
//! This crate provides shared functionality used by the gateway and the CLI:
//!
//! - **Configuration**: Loading, validation, and persistence of the JSON5 config file
//! - **Types**: Identities, roles, role groups, and notification payloads
//! - **Utilities**: Path resolution, environment handling, and secret strings

pub mod config;
pub mod env;
pub mod error;
pub mod paths;
pub mod secret;
pub mod types;

// Re-exports for convenience
pub use config::Config;
pub use error::{ConfigError, Error, Result};
pub use secret::SecretString;
pub use types::*;
