//! Call signaling layered on a chat namespace.
//!
//! The gateway relays call events between the two parties and keeps just
//! enough state to know who the other party is. It never checks whether a
//! transition is legal for the current phase; clients own that.

use super::{acting_user, parse_params, require_id};
use crate::error::GatewayError;
use crate::events::{EventContext, EventHandler, EventRegistry};
use crate::frame::EventFrame;
use crate::rooms::user_room;
use crate::Result;
use async_trait::async_trait;
use courier_core::CallId;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

pub const CALL_INITIATE: &str = "call:initiate";
pub const CALL_INCOMING: &str = "call:incoming";
pub const CALL_RINGING: &str = "call:ringing";
pub const CALL_ANSWER: &str = "call:answer";
pub const CALL_STATUS_ACTIVE: &str = "call:status:active";
pub const CALL_REJECT: &str = "call:reject";
pub const CALL_REJECTED: &str = "call:rejected";
pub const CALL_CANCEL: &str = "call:cancel";
pub const CALL_CANCELLED: &str = "call:cancelled";
pub const CALL_END: &str = "call:end";
pub const CALL_ENDED: &str = "call:ended";
pub const CALL_OFFER: &str = "call:offer";
pub const CALL_ANSWER_SDP: &str = "call:answer:sdp";
pub const CALL_ICE_CANDIDATE: &str = "call:ice:candidate";

/// Lifecycle phase of a call as last observed by the relay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallPhase {
    Idle,
    Ringing,
    Active,
    Ended,
}

#[derive(Debug, Clone)]
struct CallSession {
    caller_id: String,
    callee_id: String,
    phase: CallPhase,
    started_at: Instant,
}

/// Routing table for calls in flight on one namespace.
pub struct CallRegistry {
    calls: DashMap<CallId, CallSession>,
    ttl: Duration,
}

impl CallRegistry {
    pub fn new(ttl: Duration) -> Self {
        Self {
            calls: DashMap::new(),
            ttl,
        }
    }

    /// Record a new call in the ringing phase.
    ///
    /// Returns false, leaving the existing entry untouched, when the id is taken.
    pub fn begin(&self, call_id: CallId, caller_id: &str, callee_id: &str) -> bool {
        match self.calls.entry(call_id) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(CallSession {
                    caller_id: caller_id.to_string(),
                    callee_id: callee_id.to_string(),
                    phase: CallPhase::Ringing,
                    started_at: Instant::now(),
                });
                true
            }
        }
    }

    pub fn contains(&self, call_id: &CallId) -> bool {
        self.calls.contains_key(call_id)
    }

    /// The party on the other side from `user_id`.
    ///
    /// `None` for unknown calls and for users who are not part of the call.
    pub fn peer_of(&self, call_id: &CallId, user_id: &str) -> Option<String> {
        let call = self.calls.get(call_id)?;
        if call.caller_id == user_id {
            Some(call.callee_id.clone())
        } else if call.callee_id == user_id {
            Some(call.caller_id.clone())
        } else {
            None
        }
    }

    pub fn phase(&self, call_id: &CallId) -> Option<CallPhase> {
        self.calls.get(call_id).map(|call| call.phase)
    }

    /// Record a phase change. Unknown calls are ignored.
    pub fn set_phase(&self, call_id: &CallId, phase: CallPhase) {
        if let Some(mut call) = self.calls.get_mut(call_id) {
            call.phase = phase;
        }
    }

    /// Forget a call.
    pub fn finish(&self, call_id: &CallId) -> bool {
        self.calls.remove(call_id).is_some()
    }

    /// Drop calls older than the TTL. Returns how many were dropped.
    pub fn prune(&self) -> usize {
        let before = self.calls.len();
        let ttl = self.ttl;
        self.calls.retain(|_, call| call.started_at.elapsed() < ttl);
        before.saturating_sub(self.calls.len())
    }

    pub fn len(&self) -> usize {
        self.calls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }
}

/// Registers the call events on a chat namespace.
pub struct CallSignaling {
    calls: Arc<CallRegistry>,
}

impl CallSignaling {
    pub fn new(ttl: Duration) -> Self {
        Self {
            calls: Arc::new(CallRegistry::new(ttl)),
        }
    }

    pub fn calls(&self) -> &Arc<CallRegistry> {
        &self.calls
    }

    pub fn register(&self, events: &EventRegistry) {
        events.register(
            CALL_INITIATE,
            Arc::new(InitiateHandler {
                calls: self.calls.clone(),
            }),
        );

        let transitions = [
            (CALL_ANSWER, CALL_STATUS_ACTIVE, Transition::Phase(CallPhase::Active)),
            (CALL_REJECT, CALL_REJECTED, Transition::Finish),
            (CALL_CANCEL, CALL_CANCELLED, Transition::Finish),
            (CALL_END, CALL_ENDED, Transition::Finish),
            (CALL_OFFER, CALL_OFFER, Transition::None),
            (CALL_ANSWER_SDP, CALL_ANSWER_SDP, Transition::None),
            (CALL_ICE_CANDIDATE, CALL_ICE_CANDIDATE, Transition::None),
        ];
        for (inbound, outbound, transition) in transitions {
            events.register(
                inbound,
                Arc::new(RelayHandler {
                    calls: self.calls.clone(),
                    inbound,
                    outbound,
                    transition,
                }),
            );
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InitiateParams {
    callee_id: String,
    #[serde(default)]
    call_id: Option<String>,
    /// Passed through to the callee (call type, conversation, ...).
    #[serde(flatten)]
    extra: serde_json::Map<String, serde_json::Value>,
}

/// `call:initiate {calleeId, callId?}`
pub struct InitiateHandler {
    calls: Arc<CallRegistry>,
}

#[async_trait]
impl EventHandler for InitiateHandler {
    async fn handle(&self, ctx: &EventContext<'_>, data: serde_json::Value) -> Result<()> {
        let params: InitiateParams = parse_params(data)?;
        require_id("calleeId", &params.callee_id)?;
        let Some(caller_id) = acting_user(ctx, CALL_INITIATE) else {
            return Ok(());
        };

        let pruned = self.calls.prune();
        if pruned > 0 {
            debug!(namespace = %ctx.namespace, pruned, "Pruned stale calls");
        }

        let call_id = params
            .call_id
            .filter(|id| !id.trim().is_empty())
            .map(CallId::new)
            .unwrap_or_else(CallId::generate);
        if !self.calls.begin(call_id.clone(), caller_id, &params.callee_id) {
            return Err(GatewayError::InvalidParams(format!(
                "callId {} is already in use",
                call_id
            )));
        }

        let mut incoming = params.extra;
        incoming.insert("callId".into(), call_id.as_str().into());
        incoming.insert("callerId".into(), caller_id.into());
        incoming.insert("from".into(), caller_id.into());
        let delivered = ctx.relay(
            &user_room(&params.callee_id),
            EventFrame::new(CALL_INCOMING, serde_json::Value::Object(incoming)),
        );
        if delivered == 0 {
            debug!(call = %call_id, callee = %params.callee_id, "Callee offline, call:incoming dropped");
        }

        ctx.reply(EventFrame::new(
            CALL_RINGING,
            serde_json::json!({
                "callId": call_id,
                "calleeId": params.callee_id,
                "from": caller_id,
            }),
        ));
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
enum Transition {
    None,
    Phase(CallPhase),
    Finish,
}

/// Relays one call event to the other party, recording the phase change.
pub struct RelayHandler {
    calls: Arc<CallRegistry>,
    inbound: &'static str,
    outbound: &'static str,
    transition: Transition,
}

#[async_trait]
impl EventHandler for RelayHandler {
    async fn handle(&self, ctx: &EventContext<'_>, data: serde_json::Value) -> Result<()> {
        let mut payload = match data {
            serde_json::Value::Object(map) => map,
            serde_json::Value::Null => serde_json::Map::new(),
            _ => {
                return Err(GatewayError::InvalidParams(
                    "payload must be an object".to_string(),
                ))
            }
        };
        let call_id = payload
            .get("callId")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string();
        require_id("callId", &call_id)?;
        let Some(user_id) = acting_user(ctx, self.inbound) else {
            return Ok(());
        };
        let call_id = CallId::new(call_id);

        let explicit_peer = payload
            .remove("peerId")
            .and_then(|v| v.as_str().map(str::to_string))
            .filter(|id| !id.trim().is_empty());
        let peer = if self.calls.contains(&call_id) {
            match self.calls.peer_of(&call_id, user_id) {
                Some(peer) => peer,
                None => {
                    debug!(call = %call_id, user = %user_id, event = %self.inbound, "Not a party to this call, dropping");
                    return Ok(());
                }
            }
        } else {
            match explicit_peer {
                Some(peer) => peer,
                None => {
                    debug!(call = %call_id, event = %self.inbound, "Unknown call and no peerId, dropping");
                    return Ok(());
                }
            }
        };

        match self.transition {
            Transition::None => {}
            Transition::Phase(phase) => self.calls.set_phase(&call_id, phase),
            Transition::Finish => {
                self.calls.finish(&call_id);
            }
        }

        payload.insert("from".into(), user_id.into());
        ctx.relay(
            &user_room(&peer),
            EventFrame::new(self.outbound, serde_json::Value::Object(payload)),
        );
        Ok(())
    }
}
