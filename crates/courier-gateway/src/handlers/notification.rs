//! Notification channel.
//!
//! Clients subscribe to their own private room and acknowledge what they
//! have seen. Pushes come from the server side through
//! [`NotificationPublisher`] and reach only sockets connected right now.

use super::{acting_user, parse_params, require_id};
use crate::error::StoreError;
use crate::events::{EventContext, EventHandler, EventRegistry};
use crate::frame::EventFrame;
use crate::rooms::notification_room;
use crate::store::NotificationStore;
use crate::transport::RoomTransport;
use crate::Result;
use async_trait::async_trait;
use courier_core::Notification;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, warn};

pub const NOTIFICATION_SUBSCRIBE: &str = "notification:subscribe";
pub const NOTIFICATION_SUBSCRIBED: &str = "notification:subscribed";
pub const NOTIFICATION_SEND: &str = "notification:send";
pub const NOTIFICATION_ACK: &str = "notification:ack";

/// Registers the notification events on a namespace.
pub struct NotificationChannel {
    store: Arc<dyn NotificationStore>,
}

impl NotificationChannel {
    pub fn new(store: Arc<dyn NotificationStore>) -> Self {
        Self { store }
    }

    pub fn register(&self, events: &EventRegistry) {
        events.register(NOTIFICATION_SUBSCRIBE, Arc::new(SubscribeHandler));
        events.register(
            NOTIFICATION_ACK,
            Arc::new(AckHandler {
                store: self.store.clone(),
            }),
        );
    }
}

/// `notification:subscribe`
///
/// The room is always derived from the connection's identity; any payload is
/// ignored.
pub struct SubscribeHandler;

#[async_trait]
impl EventHandler for SubscribeHandler {
    async fn handle(&self, ctx: &EventContext<'_>, _data: serde_json::Value) -> Result<()> {
        let Some(user_id) = acting_user(ctx, NOTIFICATION_SUBSCRIBE) else {
            return Ok(());
        };
        let room = notification_room(user_id);
        ctx.join(&room);
        ctx.reply(EventFrame::new(
            NOTIFICATION_SUBSCRIBED,
            serde_json::json!({ "room": room }),
        ));
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct AckParams {
    id: String,
}

/// `notification:ack {id}`
///
/// Best effort: store failures are logged and never retried.
pub struct AckHandler {
    store: Arc<dyn NotificationStore>,
}

#[async_trait]
impl EventHandler for AckHandler {
    async fn handle(&self, ctx: &EventContext<'_>, data: serde_json::Value) -> Result<()> {
        let params: AckParams = parse_params(data)?;
        require_id("id", &params.id)?;
        let Some(user_id) = acting_user(ctx, NOTIFICATION_ACK) else {
            return Ok(());
        };

        if let Err(e) = self.store.mark_read(user_id, &params.id).await {
            warn!(
                user = %user_id,
                notification = %params.id,
                error = %e,
                "Failed to mark notification read"
            );
        }
        Ok(())
    }
}

/// Server-side push handle for the notification namespace.
#[derive(Clone)]
pub struct NotificationPublisher {
    rooms: Arc<dyn RoomTransport>,
    store: Arc<dyn NotificationStore>,
}

impl NotificationPublisher {
    pub fn new(rooms: Arc<dyn RoomTransport>, store: Arc<dyn NotificationStore>) -> Self {
        Self { rooms, store }
    }

    /// Relay a notification to a user's connected sockets.
    ///
    /// Returns how many sockets it was queued for; 0 means it was dropped.
    pub fn push(&self, user_id: &str, notification: &Notification) -> usize {
        let frame = match EventFrame::from_payload(NOTIFICATION_SEND, notification) {
            Ok(frame) => frame,
            Err(e) => {
                warn!(user = %user_id, error = %e, "Failed to encode notification");
                return 0;
            }
        };
        let delivered = self.rooms.broadcast(&notification_room(user_id), frame, None);
        debug!(user = %user_id, notification = %notification.id, delivered, "Pushed notification");
        delivered
    }

    /// Persist a notification, then push it.
    pub async fn publish(
        &self,
        user_id: &str,
        notification: Notification,
    ) -> std::result::Result<usize, StoreError> {
        self.store.append(user_id, notification.clone()).await?;
        Ok(self.push(user_id, &notification))
    }

    /// The backing store.
    pub fn store(&self) -> &Arc<dyn NotificationStore> {
        &self.store
    }
}
