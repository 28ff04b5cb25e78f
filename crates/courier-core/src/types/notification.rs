//! Notification payload pushed to a user's private room.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A server-originated notification.
///
/// The persisted copy lives in the external store; this is the low-latency
/// hint relayed to currently connected sockets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    /// Notification ID (owned by the store).
    pub id: String,

    /// Title.
    pub title: String,

    /// Body text.
    pub message: String,

    /// Category, e.g. `order`, `system`.
    #[serde(rename = "type")]
    pub kind: String,

    /// When the notification was created.
    pub created_at: DateTime<Utc>,

    /// Deep link for the client.
    #[serde(default)]
    pub action_url: Option<String>,
}

impl Notification {
    /// Create a notification stamped with the current time.
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        message: impl Into<String>,
        kind: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            message: message.into(),
            kind: kind.into(),
            created_at: Utc::now(),
            action_url: None,
        }
    }

    /// Set the action URL.
    pub fn with_action_url(mut self, url: impl Into<String>) -> Self {
        self.action_url = Some(url.into());
        self
    }
}
