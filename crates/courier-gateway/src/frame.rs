//! Wire frames exchanged over a namespace socket.
//!
//! Every text message is one JSON object `{"event": "...", "data": ...}`.

use crate::error::GatewayError;
use serde::{Deserialize, Serialize};

/// Name of the server-originated error event.
pub const ERROR_EVENT: &str = "error";

/// Name of the server-originated lifecycle event sent on admission.
pub const CONNECTION_EVENT: &str = "connection";

/// One event travelling in either direction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventFrame {
    /// Event name, e.g. `chat:message:send`.
    pub event: String,

    /// Event payload.
    #[serde(default)]
    pub data: serde_json::Value,
}

impl EventFrame {
    /// Create a new frame.
    pub fn new(event: impl Into<String>, data: serde_json::Value) -> Self {
        Self {
            event: event.into(),
            data,
        }
    }

    /// Create a frame without payload.
    pub fn empty(event: impl Into<String>) -> Self {
        Self::new(event, serde_json::Value::Null)
    }

    /// Create a frame from any serializable payload.
    pub fn from_payload<T: Serialize>(
        event: impl Into<String>,
        payload: &T,
    ) -> Result<Self, GatewayError> {
        Ok(Self::new(event, serde_json::to_value(payload)?))
    }

    /// Parse a frame from a text message.
    pub fn parse(text: &str) -> Result<Self, GatewayError> {
        let frame: Self = serde_json::from_str(text)?;
        if frame.event.is_empty() {
            return Err(GatewayError::InvalidParams("empty event name".to_string()));
        }
        Ok(frame)
    }

    /// Serialize to a text message.
    pub fn to_text(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }

    /// Build the `error` frame reported to a sender.
    pub fn error(event: Option<&str>, error: &GatewayError) -> Self {
        let mut data = serde_json::json!({
            "code": error.code(),
            "message": error.to_string(),
        });
        if let Some(event) = event {
            data["event"] = serde_json::Value::String(event.to_string());
        }
        Self::new(ERROR_EVENT, data)
    }
}
