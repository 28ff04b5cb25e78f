//! Connection lifecycle records.

use courier_core::{ConnectionId, Identity};
use serde::Serialize;
use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;

/// One admitted socket, as seen by its own reader loop.
#[derive(Debug, Clone)]
pub struct Connection {
    /// Connection ID.
    pub id: ConnectionId,

    /// Namespace path the socket was admitted to.
    pub namespace: String,

    /// Identity attached at handshake.
    pub identity: Option<Arc<Identity>>,

    /// Remote address.
    pub remote_addr: Option<SocketAddr>,

    /// Admission timestamp.
    pub connected_at: chrono::DateTime<chrono::Utc>,
}

impl Connection {
    /// Create a connection record stamped with the current time.
    pub fn new(
        id: ConnectionId,
        namespace: impl Into<String>,
        identity: Option<Arc<Identity>>,
    ) -> Self {
        Self {
            id,
            namespace: namespace.into(),
            identity,
            remote_addr: None,
            connected_at: chrono::Utc::now(),
        }
    }

    /// Set the remote address.
    pub fn with_remote_addr(mut self, addr: SocketAddr) -> Self {
        self.remote_addr = Some(addr);
        self
    }

    /// User id, if any identity is attached.
    pub fn user_id(&self) -> Option<&str> {
        self.identity.as_deref().map(|i| i.user_id.as_str())
    }

    /// Payload of the `connection` lifecycle event.
    pub fn hello(&self) -> ConnectionHello<'_> {
        ConnectionHello {
            id: self.id.as_str(),
            namespace: &self.namespace,
            user_id: self.user_id(),
        }
    }

    /// Seconds since admission.
    pub fn age_secs(&self) -> i64 {
        (chrono::Utc::now() - self.connected_at).num_seconds()
    }
}

/// Body of the `connection` event.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionHello<'a> {
    pub id: &'a str,
    pub namespace: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<&'a str>,
}

/// Why a socket went away.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisconnectReason {
    /// Client sent a close frame or ended the stream.
    ClientClose,

    /// Read or write failed.
    TransportError,

    /// The gateway is shutting down.
    ServerShutdown,
}

impl DisconnectReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ClientClose => "client_close",
            Self::TransportError => "transport_error",
            Self::ServerShutdown => "server_shutdown",
        }
    }
}

impl fmt::Display for DisconnectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
