//! Inbound message routing.
//!
//! One text frame in, zero or more [`SessionEvent`]s out. Bad frames never
//! close the channel: they are logged and dropped, and the front end gets a
//! [`SessionEvent::ProtocolError`].

use boardsync_types::{InboundMessage, RoomId};
use tracing::{debug, info, warn};

use crate::actions::ActionHandlers;
use crate::events::SessionEvent;
use crate::session::{SessionLifecycle, SyncError, Synchronizer};

/// Routes inbound frames for one room.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    room_id: RoomId,
}

impl Dispatcher {
    /// A dispatcher for `room_id`.
    pub fn new(room_id: RoomId) -> Self {
        Self { room_id }
    }

    /// The room this dispatcher accepts messages for.
    pub fn room_id(&self) -> &RoomId {
        &self.room_id
    }

    /// Parse one frame and apply it.
    pub fn dispatch(
        &self,
        raw: &str,
        sync: &mut Synchronizer,
        actions: &mut ActionHandlers,
    ) -> Vec<SessionEvent> {
        let msg = match InboundMessage::parse(raw) {
            Ok(msg) => msg,
            Err(e) => {
                warn!(error = %e, "dropping invalid frame");
                return vec![SessionEvent::ProtocolError {
                    reason: e.to_string(),
                }];
            }
        };

        if let Some(room) = msg.room_id() {
            if room != &self.room_id {
                warn!(kind = msg.kind(), room = %room, expected = %self.room_id, "message for another room");
                return Vec::new();
            }
        }

        match msg {
            InboundMessage::GameState(state) => {
                let resync = sync.lifecycle() == SessionLifecycle::Live;
                match sync.apply_initial(&state) {
                    Ok(()) => vec![SessionEvent::StateSynced { resync }],
                    Err(e) => rejected("gameState", e),
                }
            }
            InboundMessage::GameUpdate(update) => match sync.apply_update(&update) {
                Ok(ply) => vec![SessionEvent::BoardUpdated { ply }],
                Err(e) => rejected("gameUpdate", e),
            },
            InboundMessage::Error(notice) => {
                info!(message = notice.message(), "authority notice");
                vec![SessionEvent::Notice {
                    message: notice.message().to_string(),
                }]
            }
            InboundMessage::GameEnd(end) => match sync.apply_end(&end) {
                Ok(()) => {
                    actions.clear_on_end();
                    vec![SessionEvent::GameEnded(end)]
                }
                Err(e) => rejected("gameEnd", e),
            },
            InboundMessage::DrawOffer(offer) => {
                if sync.lifecycle() != SessionLifecycle::Live {
                    debug!(lifecycle = %sync.lifecycle(), "draw offer outside live game");
                    return Vec::new();
                }
                actions
                    .on_draw_offer(&offer)
                    .map(SessionEvent::DrawOffered)
                    .into_iter()
                    .collect()
            }
            InboundMessage::DrawDeclined(declined) => vec![SessionEvent::DrawDeclined {
                offer_id: declined.offer_id,
            }],
            InboundMessage::Unknown(kind) => {
                debug!(kind = %kind, "ignoring unknown message type");
                Vec::new()
            }
        }
    }
}

/// Ordering drops are routine; only content problems are protocol errors.
fn rejected(kind: &str, error: SyncError) -> Vec<SessionEvent> {
    match error {
        SyncError::MalformedState(_) | SyncError::InvalidRoster => {
            warn!(kind, error = %error, "dropping message");
            vec![SessionEvent::ProtocolError {
                reason: format!("{}: {}", kind, error),
            }]
        }
        SyncError::SessionEnded
        | SyncError::NotReady { .. }
        | SyncError::ResyncPending
        | SyncError::Stale { .. } => {
            debug!(kind, error = %error, "dropping message");
            Vec::new()
        }
    }
}
