//! Room addressing.
//!
//! Pure builders for the canonical room keys. Keys are namespace-local: the
//! same string in two namespaces names two unrelated rooms.

use serde::{Deserialize, Serialize};
use std::fmt;

const NOTIFICATION_PREFIX: &str = "notification:user:";
const USER_PREFIX: &str = "user:";

/// A room key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomKey(String);

impl RoomKey {
    /// Wrap a raw key, as received from `room:join`.
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Get the key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The user a private room belongs to, if this is one.
    ///
    /// Private rooms are the notification room and the direct user room.
    pub fn private_owner(&self) -> Option<&str> {
        self.0
            .strip_prefix(NOTIFICATION_PREFIX)
            .or_else(|| self.0.strip_prefix(USER_PREFIX))
    }
}

impl fmt::Display for RoomKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Participant pairing a chat conversation belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatKind {
    Admin,
    Shop,
    Ai,
}

impl ChatKind {
    /// Channel segment used in room keys.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Shop => "shop",
            Self::Ai => "ai",
        }
    }
}

impl fmt::Display for ChatKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `notification:user:<userId>`
pub fn notification_room(user_id: &str) -> RoomKey {
    RoomKey(format!("{}{}", NOTIFICATION_PREFIX, user_id))
}

/// `chat:<channel>:<conversationId>`
pub fn chat_room(kind: ChatKind, conversation_id: &str) -> RoomKey {
    RoomKey(format!("chat:{}:{}", kind.as_str(), conversation_id))
}

/// `user:<userId>`
pub fn user_room(user_id: &str) -> RoomKey {
    RoomKey(format!("{}{}", USER_PREFIX, user_id))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_formats() {
        assert_eq!(notification_room("42").as_str(), "notification:user:42");
        assert_eq!(chat_room(ChatKind::Shop, "conv1").as_str(), "chat:shop:conv1");
        assert_eq!(chat_room(ChatKind::Ai, "c").as_str(), "chat:ai:c");
        assert_eq!(user_room("u1").as_str(), "user:u1");
    }

    #[test]
    fn test_notification_room_stable_and_distinct() {
        let ids = ["u1", "u2", "U1", "u1 ", "", "user:u1", "42"];
        for a in ids {
            assert_eq!(notification_room(a), notification_room(a));
            for b in ids {
                if a != b {
                    assert_ne!(notification_room(a), notification_room(b));
                }
            }
        }
    }

    #[test]
    fn test_builders_do_not_collide_across_kinds() {
        let id = "x";
        let keys = [
            notification_room(id),
            user_room(id),
            chat_room(ChatKind::Admin, id),
            chat_room(ChatKind::Shop, id),
            chat_room(ChatKind::Ai, id),
        ];
        for (i, a) in keys.iter().enumerate() {
            for b in &keys[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn test_private_owner() {
        assert_eq!(notification_room("u9").private_owner(), Some("u9"));
        assert_eq!(user_room("u9").private_owner(), Some("u9"));
        assert_eq!(chat_room(ChatKind::Admin, "u9").private_owner(), None);
        assert_eq!(RoomKey::new("lobby").private_owner(), None);
    }
}
