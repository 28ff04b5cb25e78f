//! CLI command implementations.

pub mod config;
pub mod gateway;
pub mod token;
