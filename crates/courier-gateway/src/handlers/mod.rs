//! Channel event handlers.
//!
//! Each channel registers its handlers into a namespace's
//! [`EventRegistry`](crate::events::EventRegistry).

pub mod call;
pub mod chat;
pub mod notification;
pub mod rooms;

use crate::error::GatewayError;
use crate::events::EventContext;
use crate::Result;
use serde::de::DeserializeOwned;
use tracing::debug;

pub use call::{CallPhase, CallRegistry, CallSignaling};
pub use chat::ChatChannel;
pub use notification::{NotificationChannel, NotificationPublisher};
pub use rooms::RoomControl;

/// Deserialize an event payload.
pub(crate) fn parse_params<T: DeserializeOwned>(data: serde_json::Value) -> Result<T> {
    serde_json::from_value(data).map_err(|e| GatewayError::InvalidParams(e.to_string()))
}

/// Reject blank identifiers.
pub(crate) fn require_id(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(GatewayError::InvalidParams(format!("{} must not be empty", field)));
    }
    Ok(())
}

/// User id of the acting connection. Events that need one are dropped
/// without an error when it is missing.
pub(crate) fn acting_user<'a>(ctx: &EventContext<'a>, event: &str) -> Option<&'a str> {
    let user = ctx.user_id();
    if user.is_none() {
        debug!(
            namespace = %ctx.namespace,
            conn = %ctx.connection,
            event = %event,
            "Ignoring event from connection without user id"
        );
    }
    user
}
