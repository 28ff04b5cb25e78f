//! Generic `room:join` / `room:leave`.

use super::{parse_params, require_id};
use crate::error::GatewayError;
use crate::events::{EventContext, EventHandler, EventRegistry};
use crate::frame::EventFrame;
use crate::rooms::RoomKey;
use crate::Result;
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;

pub const ROOM_JOIN: &str = "room:join";
pub const ROOM_LEAVE: &str = "room:leave";
pub const ROOM_JOINED: &str = "room:joined";

#[derive(Debug, Deserialize)]
struct RoomParams {
    room: String,
}

impl RoomParams {
    /// Validate the key and refuse other users' private rooms.
    fn into_key(self, ctx: &EventContext<'_>) -> Result<RoomKey> {
        require_id("room", &self.room)?;
        let key = RoomKey::new(self.room);
        if let Some(owner) = key.private_owner() {
            if ctx.user_id() != Some(owner) {
                return Err(GatewayError::ReservedRoom(key.to_string()));
            }
        }
        Ok(key)
    }
}

/// Registers generic room control on a namespace.
pub struct RoomControl;

impl RoomControl {
    pub fn register(events: &EventRegistry) {
        events.register(ROOM_JOIN, Arc::new(RoomJoinHandler));
        events.register(ROOM_LEAVE, Arc::new(RoomLeaveHandler));
    }
}

/// `room:join {room}`
pub struct RoomJoinHandler;

#[async_trait]
impl EventHandler for RoomJoinHandler {
    async fn handle(&self, ctx: &EventContext<'_>, data: serde_json::Value) -> Result<()> {
        let room = parse_params::<RoomParams>(data)?.into_key(ctx)?;
        ctx.join(&room);
        ctx.reply(EventFrame::new(ROOM_JOINED, serde_json::json!({ "room": room })));
        Ok(())
    }
}

/// `room:leave {room}`
pub struct RoomLeaveHandler;

#[async_trait]
impl EventHandler for RoomLeaveHandler {
    async fn handle(&self, ctx: &EventContext<'_>, data: serde_json::Value) -> Result<()> {
        let room = parse_params::<RoomParams>(data)?.into_key(ctx)?;
        ctx.leave(&room);
        Ok(())
    }
}
