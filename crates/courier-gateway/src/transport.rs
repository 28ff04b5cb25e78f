//! Room membership and delivery for one namespace.
//!
//! [`RoomTransport`] is the only surface channels use to reach sockets.
//! [`RoomTable`] is the in-process implementation: one lock around the
//! connection and room maps, taken once per primitive and never held across
//! an `.await`.

use crate::frame::EventFrame;
use crate::rooms::RoomKey;
use courier_core::ConnectionId;
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, trace};

/// Sending half of a connection's outbound queue.
pub type Outbound = mpsc::Sender<Arc<EventFrame>>;

/// Join/leave/broadcast primitives, each individually atomic.
///
/// Operations on a connection that has already gone away are no-ops.
pub trait RoomTransport: Send + Sync {
    /// Add a connection to a room. Returns false if the connection is gone.
    fn join(&self, conn: &ConnectionId, room: &RoomKey) -> bool;

    /// Remove a connection from a room. Returns false if it was not a member.
    fn leave(&self, conn: &ConnectionId, room: &RoomKey) -> bool;

    /// Queue a frame for one connection. Returns false if it was dropped.
    fn emit(&self, conn: &ConnectionId, frame: EventFrame) -> bool;

    /// Queue a frame for every member of a room, optionally skipping one
    /// connection. Returns how many connections the frame was queued for.
    fn broadcast(&self, room: &RoomKey, frame: EventFrame, except: Option<&ConnectionId>) -> usize;

    /// Whether a connection is currently in a room.
    fn is_member(&self, conn: &ConnectionId, room: &RoomKey) -> bool;
}

struct Member {
    outbound: Outbound,
    rooms: HashSet<RoomKey>,
}

#[derive(Default)]
struct Inner {
    connections: HashMap<ConnectionId, Member>,
    rooms: HashMap<RoomKey, HashSet<ConnectionId>>,
}

/// In-process room table for one namespace.
#[derive(Default)]
pub struct RoomTable {
    inner: RwLock<Inner>,
}

impl RoomTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a live connection and its outbound queue.
    pub fn attach(&self, conn: ConnectionId, outbound: Outbound) {
        let mut inner = self.inner.write();
        inner.connections.insert(
            conn,
            Member {
                outbound,
                rooms: HashSet::new(),
            },
        );
    }

    /// Forget a connection, releasing every room it was in.
    ///
    /// Returns the rooms that were released.
    pub fn detach(&self, conn: &ConnectionId) -> Vec<RoomKey> {
        let mut inner = self.inner.write();
        let Some(member) = inner.connections.remove(conn) else {
            return Vec::new();
        };
        let released: Vec<RoomKey> = member.rooms.into_iter().collect();
        for room in &released {
            if let Some(members) = inner.rooms.get_mut(room) {
                members.remove(conn);
                if members.is_empty() {
                    inner.rooms.remove(room);
                }
            }
        }
        released
    }

    /// Number of live connections.
    pub fn connection_count(&self) -> usize {
        self.inner.read().connections.len()
    }

    /// Number of connections in a room.
    pub fn room_size(&self, room: &RoomKey) -> usize {
        self.inner.read().rooms.get(room).map_or(0, HashSet::len)
    }

    /// Rooms a connection is currently in, sorted.
    pub fn rooms_of(&self, conn: &ConnectionId) -> Vec<RoomKey> {
        let inner = self.inner.read();
        let mut rooms: Vec<RoomKey> = inner
            .connections
            .get(conn)
            .map(|m| m.rooms.iter().cloned().collect())
            .unwrap_or_default();
        rooms.sort();
        rooms
    }

    fn deliver(conn: &ConnectionId, outbound: &Outbound, frame: Arc<EventFrame>) -> bool {
        match outbound.try_send(frame) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(frame)) => {
                debug!(conn = %conn, event = %frame.event, "Outbound queue full, dropping frame");
                false
            }
            Err(mpsc::error::TrySendError::Closed(frame)) => {
                trace!(conn = %conn, event = %frame.event, "Connection closed, dropping frame");
                false
            }
        }
    }
}

impl RoomTransport for RoomTable {
    fn join(&self, conn: &ConnectionId, room: &RoomKey) -> bool {
        let mut inner = self.inner.write();
        let Some(member) = inner.connections.get_mut(conn) else {
            return false;
        };
        member.rooms.insert(room.clone());
        inner
            .rooms
            .entry(room.clone())
            .or_default()
            .insert(conn.clone());
        true
    }

    fn leave(&self, conn: &ConnectionId, room: &RoomKey) -> bool {
        let mut inner = self.inner.write();
        let was_member = inner
            .connections
            .get_mut(conn)
            .map_or(false, |m| m.rooms.remove(room));
        if let Some(members) = inner.rooms.get_mut(room) {
            members.remove(conn);
            if members.is_empty() {
                inner.rooms.remove(room);
            }
        }
        was_member
    }

    fn emit(&self, conn: &ConnectionId, frame: EventFrame) -> bool {
        let inner = self.inner.read();
        match inner.connections.get(conn) {
            Some(member) => Self::deliver(conn, &member.outbound, Arc::new(frame)),
            None => false,
        }
    }

    fn broadcast(&self, room: &RoomKey, frame: EventFrame, except: Option<&ConnectionId>) -> usize {
        let inner = self.inner.read();
        let Some(members) = inner.rooms.get(room) else {
            return 0;
        };
        let frame = Arc::new(frame);
        let mut delivered = 0;
        for conn in members {
            if Some(conn) == except {
                continue;
            }
            if let Some(member) = inner.connections.get(conn) {
                if Self::deliver(conn, &member.outbound, frame.clone()) {
                    delivered += 1;
                }
            }
        }
        delivered
    }

    fn is_member(&self, conn: &ConnectionId, room: &RoomKey) -> bool {
        self.inner
            .read()
            .rooms
            .get(room)
            .map_or(false, |members| members.contains(conn))
    }
}
