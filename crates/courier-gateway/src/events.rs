//! Event registry and per-event dispatch context.

use crate::error::GatewayError;
use crate::frame::EventFrame;
use crate::rooms::RoomKey;
use crate::transport::RoomTransport;
use crate::Result;
use async_trait::async_trait;
use courier_core::{ConnectionId, Identity};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, trace};

/// Everything a handler may touch while handling one inbound event.
pub struct EventContext<'a> {
    /// Connection the event arrived on.
    pub connection: &'a ConnectionId,

    /// Identity attached at handshake, if any.
    pub identity: Option<&'a Identity>,

    /// Namespace path.
    pub namespace: &'a str,

    /// Room primitives of the owning namespace.
    pub rooms: &'a dyn RoomTransport,

    /// Namespace-level debug logging switch.
    pub debug: bool,
}

impl<'a> EventContext<'a> {
    /// User id of the connection, authenticated or degraded.
    pub fn user_id(&self) -> Option<&'a str> {
        self.identity.map(|i| i.user_id.as_str())
    }

    /// Send a frame to this connection only.
    pub fn reply(&self, frame: EventFrame) -> bool {
        self.rooms.emit(self.connection, frame)
    }

    /// Join a room on behalf of this connection.
    pub fn join(&self, room: &RoomKey) -> bool {
        let joined = self.rooms.join(self.connection, room);
        self.log_room("join", room);
        joined
    }

    /// Leave a room on behalf of this connection.
    pub fn leave(&self, room: &RoomKey) -> bool {
        let left = self.rooms.leave(self.connection, room);
        self.log_room("leave", room);
        left
    }

    /// Broadcast to a room, skipping this connection.
    pub fn relay(&self, room: &RoomKey, frame: EventFrame) -> usize {
        let event = frame.event.clone();
        let delivered = self.rooms.broadcast(room, frame, Some(self.connection));
        if self.debug {
            debug!(
                namespace = %self.namespace,
                conn = %self.connection,
                room = %room,
                event = %event,
                delivered,
                "Relayed"
            );
        } else {
            trace!(room = %room, event = %event, delivered, "Relayed");
        }
        delivered
    }

    fn log_room(&self, action: &str, room: &RoomKey) {
        if self.debug {
            debug!(namespace = %self.namespace, conn = %self.connection, room = %room, "Room {}", action);
        }
    }
}

/// Trait for inbound event handlers.
#[async_trait]
pub trait EventHandler: Send + Sync {
    /// Handle one inbound event.
    async fn handle(&self, ctx: &EventContext<'_>, data: serde_json::Value) -> Result<()>;
}

/// Event name to handler map owned by one namespace.
pub struct EventRegistry {
    handlers: RwLock<HashMap<String, Arc<dyn EventHandler>>>,
}

impl Default for EventRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl EventRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            handlers: RwLock::new(HashMap::new()),
        }
    }

    /// Register a handler, replacing any previous one for the same event.
    pub fn register(&self, event: impl Into<String>, handler: Arc<dyn EventHandler>) {
        self.handlers.write().insert(event.into(), handler);
    }

    /// Remove a handler.
    pub fn unregister(&self, event: &str) {
        self.handlers.write().remove(event);
    }

    /// Whether an event has a handler.
    pub fn contains(&self, event: &str) -> bool {
        self.handlers.read().contains_key(event)
    }

    /// Dispatch one event to its handler.
    pub async fn dispatch(
        &self,
        ctx: &EventContext<'_>,
        event: &str,
        data: serde_json::Value,
    ) -> Result<()> {
        // Clone out so no lock is held while the handler runs.
        let handler = self
            .handlers
            .read()
            .get(event)
            .cloned()
            .ok_or_else(|| GatewayError::UnknownEvent(event.to_string()))?;

        trace!(event = %event, conn = %ctx.connection, "Dispatching event");
        handler.handle(ctx, data).await
    }

    /// Registered event names, sorted.
    pub fn list(&self) -> Vec<String> {
        let mut events: Vec<String> = self.handlers.read().keys().cloned().collect();
        events.sort();
        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::RoomTable;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::mpsc;

    struct CountingHandler(AtomicUsize);

    #[async_trait]
    impl EventHandler for CountingHandler {
        async fn handle(&self, ctx: &EventContext<'_>, data: serde_json::Value) -> Result<()> {
            self.0.fetch_add(1, Ordering::SeqCst);
            ctx.reply(EventFrame::new("echo", data));
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_dispatch_reaches_handler() {
        let registry = EventRegistry::new();
        let handler = Arc::new(CountingHandler(AtomicUsize::new(0)));
        registry.register("echo", handler.clone());

        let table = RoomTable::new();
        let conn = ConnectionId::new("c1");
        let (tx, mut rx) = mpsc::channel(4);
        table.attach(conn.clone(), tx);

        let ctx = EventContext {
            connection: &conn,
            identity: None,
            namespace: "/test",
            rooms: &table,
            debug: false,
        };
        registry.dispatch(&ctx, "echo", json!({"n": 1})).await.unwrap();

        assert_eq!(handler.0.load(Ordering::SeqCst), 1);
        assert_eq!(rx.recv().await.unwrap().data["n"], 1);
    }

    #[tokio::test]
    async fn test_unknown_event() {
        let registry = EventRegistry::new();
        let table = RoomTable::new();
        let conn = ConnectionId::new("c1");
        let ctx = EventContext {
            connection: &conn,
            identity: None,
            namespace: "/test",
            rooms: &table,
            debug: true,
        };

        let result = registry.dispatch(&ctx, "nope", serde_json::Value::Null).await;
        assert!(matches!(result, Err(GatewayError::UnknownEvent(_))));
    }

    #[test]
    fn test_register_and_list() {
        let registry = EventRegistry::new();
        registry.register("b", Arc::new(CountingHandler(AtomicUsize::new(0))));
        registry.register("a", Arc::new(CountingHandler(AtomicUsize::new(0))));
        assert_eq!(registry.list(), vec!["a".to_string(), "b".to_string()]);
        registry.unregister("a");
        assert!(!registry.contains("a"));
        assert!(registry.contains("b"));
    }
}
