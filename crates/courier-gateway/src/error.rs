//! Gateway error types.

use thiserror::Error;

/// Errors that can occur in the gateway.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(String),

    /// No handler registered for the event.
    #[error("Unknown event: {0}")]
    UnknownEvent(String),

    /// Invalid event payload.
    #[error("Invalid parameters: {0}")]
    InvalidParams(String),

    /// The event needs a user id and the connection has none.
    #[error("Event '{0}' requires an identified connection")]
    Unauthenticated(String),

    /// Role not in the namespace allow-list.
    #[error("Role '{role}' is not allowed in namespace {namespace}")]
    Forbidden { role: String, namespace: String },

    /// Namespace is at its connection cap.
    #[error("Namespace {0} is at capacity")]
    AtCapacity(String),

    /// Attempt to join another user's private room.
    #[error("Room '{0}' is reserved")]
    ReservedRoom(String),

    /// Notification store error.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl GatewayError {
    /// Get the error code carried in `error` frames.
    pub fn code(&self) -> i32 {
        match self {
            Self::UnknownEvent(_) => -32601,
            Self::InvalidParams(_) => -32602,
            Self::Json(_) => -32700,
            Self::Unauthenticated(_) | Self::Forbidden { .. } | Self::ReservedRoom(_) => -32001,
            _ => -32603,
        }
    }
}

/// Handshake authentication failures.
///
/// None of these block a handshake; the authenticator downgrades every one of
/// them to an unauthenticated connection.
#[derive(Debug, Error)]
pub enum AuthError {
    /// No signing secret configured.
    #[error("token verification is not configured")]
    MissingSecret,

    /// Malformed, expired, or wrongly signed token.
    #[error("invalid token: {0}")]
    InvalidToken(String),

    /// Token verified but the user is unknown to the directory.
    #[error("unknown user: {0}")]
    UnknownUser(String),

    /// The verification or directory service failed.
    #[error("upstream failure: {0}")]
    Upstream(String),
}

impl From<jsonwebtoken::errors::Error> for AuthError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        Self::InvalidToken(err.to_string())
    }
}

/// Errors from the external notification store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Store unreachable or failed.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// Notification does not exist for this user.
    #[error("notification not found: {0}")]
    NotFound(String),
}
