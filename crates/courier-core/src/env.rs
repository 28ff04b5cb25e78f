//! Environment variable handling.

use std::env;

/// Get an environment variable, returning None if not set or empty.
pub fn get_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.is_empty())
}

/// Get an environment variable as a boolean.
pub fn get_bool(name: &str) -> bool {
    get_var(name)
        .map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(false)
}

/// Get an environment variable as a u16 (e.g., for ports).
pub fn get_u16(name: &str) -> Option<u16> {
    get_var(name).and_then(|v| v.parse().ok())
}

/// Common environment variable names.
pub mod vars {
    /// Courier home directory override.
    pub const COURIER_HOME: &str = "COURIER_HOME";

    /// Courier config file override.
    pub const COURIER_CONFIG: &str = "COURIER_CONFIG";

    /// Gateway port override.
    pub const COURIER_PORT: &str = "COURIER_PORT";

    /// HS256 signing secret override.
    pub const COURIER_JWT_SECRET: &str = "COURIER_JWT_SECRET";

    /// Log filter override.
    pub const COURIER_LOG: &str = "COURIER_LOG";

    /// Force JSON log output.
    pub const COURIER_LOG_JSON: &str = "COURIER_LOG_JSON";
}
