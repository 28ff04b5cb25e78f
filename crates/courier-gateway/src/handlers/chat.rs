//! Chat channel, shared by the admin, shop and AI namespaces.

use super::{acting_user, parse_params, require_id};
use crate::events::{EventContext, EventHandler, EventRegistry};
use crate::frame::EventFrame;
use crate::rooms::{chat_room, ChatKind};
use crate::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub const CONVERSATION_JOIN: &str = "chat:conversation:join";
pub const CONVERSATION_JOINED: &str = "chat:conversation:joined";
pub const CONVERSATION_LEAVE: &str = "chat:conversation:leave";
pub const MESSAGE_SEND: &str = "chat:message:send";
pub const MESSAGE_RECEIVE: &str = "chat:message:receive";
pub const TYPING: &str = "chat:typing";
pub const DELIVERED: &str = "chat:delivered";
pub const SEEN: &str = "chat:seen";

/// Chat events for one participant pairing.
#[derive(Debug, Clone, Copy)]
pub struct ChatChannel {
    kind: ChatKind,
}

impl ChatChannel {
    pub fn new(kind: ChatKind) -> Self {
        Self { kind }
    }

    pub fn kind(&self) -> ChatKind {
        self.kind
    }

    /// Register every chat event on a namespace.
    pub fn register(&self, events: &EventRegistry) {
        let kind = self.kind;
        events.register(CONVERSATION_JOIN, Arc::new(ConversationJoinHandler { kind }));
        events.register(CONVERSATION_LEAVE, Arc::new(ConversationLeaveHandler { kind }));
        events.register(MESSAGE_SEND, Arc::new(MessageSendHandler { kind }));
        events.register(TYPING, Arc::new(TypingHandler { kind }));
        events.register(
            DELIVERED,
            Arc::new(ReceiptHandler {
                kind,
                event: DELIVERED,
            }),
        );
        events.register(SEEN, Arc::new(ReceiptHandler { kind, event: SEEN }));
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConversationParams {
    conversation_id: String,
}

/// `chat:conversation:join {conversationId}`
pub struct ConversationJoinHandler {
    kind: ChatKind,
}

#[async_trait]
impl EventHandler for ConversationJoinHandler {
    async fn handle(&self, ctx: &EventContext<'_>, data: serde_json::Value) -> Result<()> {
        let params: ConversationParams = parse_params(data)?;
        require_id("conversationId", &params.conversation_id)?;
        let room = chat_room(self.kind, &params.conversation_id);
        ctx.join(&room);
        ctx.reply(EventFrame::new(
            CONVERSATION_JOINED,
            serde_json::json!({
                "conversationId": params.conversation_id,
                "room": room,
            }),
        ));
        Ok(())
    }
}

/// `chat:conversation:leave {conversationId}`
pub struct ConversationLeaveHandler {
    kind: ChatKind,
}

#[async_trait]
impl EventHandler for ConversationLeaveHandler {
    async fn handle(&self, ctx: &EventContext<'_>, data: serde_json::Value) -> Result<()> {
        let params: ConversationParams = parse_params(data)?;
        require_id("conversationId", &params.conversation_id)?;
        ctx.leave(&chat_room(self.kind, &params.conversation_id));
        Ok(())
    }
}

/// Inbound `chat:message:send`. Any client `senderId` is ignored.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MessageSendParams {
    conversation_id: String,
    #[serde(default)]
    message_id: Option<String>,
    body: String,
    #[serde(default)]
    attachments: Option<Vec<serde_json::Value>>,
}

/// Outbound `chat:message:receive`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceivedMessage {
    pub conversation_id: String,
    pub message_id: String,
    pub sender_id: String,
    pub body: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attachments: Option<Vec<serde_json::Value>>,
    pub sent_at: DateTime<Utc>,
}

/// `chat:message:send {conversationId, body, attachments?}`
pub struct MessageSendHandler {
    kind: ChatKind,
}

#[async_trait]
impl EventHandler for MessageSendHandler {
    async fn handle(&self, ctx: &EventContext<'_>, data: serde_json::Value) -> Result<()> {
        let params: MessageSendParams = parse_params(data)?;
        require_id("conversationId", &params.conversation_id)?;
        let Some(sender_id) = acting_user(ctx, MESSAGE_SEND) else {
            return Ok(());
        };

        let room = chat_room(self.kind, &params.conversation_id);
        let message = ReceivedMessage {
            conversation_id: params.conversation_id,
            message_id: params
                .message_id
                .filter(|id| !id.trim().is_empty())
                .unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
            sender_id: sender_id.to_string(),
            body: params.body,
            attachments: params.attachments,
            sent_at: Utc::now(),
        };
        ctx.relay(&room, EventFrame::from_payload(MESSAGE_RECEIVE, &message)?);
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TypingParams {
    conversation_id: String,
    #[serde(default)]
    is_typing: bool,
}

/// `chat:typing {conversationId, isTyping}`
pub struct TypingHandler {
    kind: ChatKind,
}

#[async_trait]
impl EventHandler for TypingHandler {
    async fn handle(&self, ctx: &EventContext<'_>, data: serde_json::Value) -> Result<()> {
        let params: TypingParams = parse_params(data)?;
        require_id("conversationId", &params.conversation_id)?;
        let Some(user_id) = acting_user(ctx, TYPING) else {
            return Ok(());
        };

        let room = chat_room(self.kind, &params.conversation_id);
        ctx.relay(
            &room,
            EventFrame::new(
                TYPING,
                serde_json::json!({
                    "conversationId": params.conversation_id,
                    "userId": user_id,
                    "isTyping": params.is_typing,
                }),
            ),
        );
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReceiptParams {
    conversation_id: String,
    message_id: String,
}

/// `chat:delivered` / `chat:seen {conversationId, messageId}`
pub struct ReceiptHandler {
    kind: ChatKind,
    event: &'static str,
}

#[async_trait]
impl EventHandler for ReceiptHandler {
    async fn handle(&self, ctx: &EventContext<'_>, data: serde_json::Value) -> Result<()> {
        let params: ReceiptParams = parse_params(data)?;
        require_id("conversationId", &params.conversation_id)?;
        require_id("messageId", &params.message_id)?;
        let Some(user_id) = acting_user(ctx, self.event) else {
            return Ok(());
        };

        let room = chat_room(self.kind, &params.conversation_id);
        ctx.relay(
            &room,
            EventFrame::new(
                self.event,
                serde_json::json!({
                    "conversationId": params.conversation_id,
                    "messageId": params.message_id,
                    "userId": user_id,
                    "at": Utc::now(),
                }),
            ),
        );
        Ok(())
    }
}
