//! WebSocket gateway server for Courier.
//!
//! This crate provides:
//! - Namespaced WebSocket routes with role-based admission
//! - Handshake authentication (bearer token or anonymous user id)
//! - Room-scoped relay for notifications, chat and call signaling
//! - A health endpoint reporting per-namespace connection counts

pub mod auth;
pub mod error;
pub mod events;
pub mod frame;
pub mod handlers;
pub mod namespace;
pub mod rooms;
pub mod server;
pub mod session;
pub mod store;
pub mod transport;

pub use auth::{Authenticator, Claims, Handshake, IdentityResolver, UserDirectory};
pub use error::{AuthError, GatewayError, StoreError};
pub use events::{EventContext, EventHandler, EventRegistry};
pub use frame::EventFrame;
pub use handlers::{CallPhase, NotificationPublisher};
pub use namespace::{Namespace, NamespaceOptions, NamespaceRegistry};
pub use rooms::{chat_room, notification_room, user_room, ChatKind, RoomKey};
pub use server::{Gateway, GatewayServices};
pub use store::{MemoryNotificationStore, NotificationStore};
pub use transport::{RoomTable, RoomTransport};

/// Result type for gateway operations.
pub type Result<T> = std::result::Result<T, GatewayError>;
