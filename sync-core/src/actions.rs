//! Outbound action sub-protocols: moves, resignation and draws.
//!
//! Handlers only build messages and track local confirmation and offer
//! state; the session client sends what they return. Nothing here touches
//! the board: a move is applied only when the authority pushes the result.

use boardsync_types::{
    DrawOffer, GameAction, GameActionKind, MoveRequest, OfferId, OutboundMessage, UserId,
};
use thiserror::Error;
use tracing::debug;

use crate::session::SessionLifecycle;

/// A destructive action waiting for the user to confirm it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PendingConfirmation {
    /// Resign the game.
    Resign,
    /// Offer a draw.
    DrawOffer,
}

/// A draw offer from the opponent awaiting an answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingOffer {
    /// Offer identifier, echoed back in the answer.
    pub offer_id: OfferId,
    /// Player who made the offer.
    pub player_id: UserId,
}

/// Session facts an action needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActionContext {
    /// Current lifecycle state.
    pub lifecycle: SessionLifecycle,
    /// Whether the channel is open.
    pub channel_open: bool,
}

/// Why an action was refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ActionError {
    /// Actions require a live session.
    #[error("session is {lifecycle}, not live")]
    NotLive {
        /// Lifecycle state at the time.
        lifecycle: SessionLifecycle,
    },

    /// The channel is not open.
    #[error("channel is not open")]
    ChannelClosed,

    /// `confirm` called with nothing armed.
    #[error("nothing to confirm")]
    NothingToConfirm,

    /// A move coordinate is off the board.
    #[error("move coordinates must be within 0..=7")]
    OffBoard,
}

/// Confirmation and draw-offer state for the local player.
#[derive(Debug, Clone)]
pub struct ActionHandlers {
    local_user: UserId,
    confirmation: Option<PendingConfirmation>,
    pending_offer: Option<PendingOffer>,
}

impl ActionHandlers {
    /// Handlers acting for `local_user`.
    pub fn new(local_user: UserId) -> Self {
        Self {
            local_user,
            confirmation: None,
            pending_offer: None,
        }
    }

    /// Build a move request. The move is not checked for legality.
    pub fn submit_move(
        &self,
        ctx: ActionContext,
        mv: MoveRequest,
    ) -> Result<OutboundMessage, ActionError> {
        ensure_sendable(ctx)?;
        if [mv.from_row, mv.from_col, mv.to_row, mv.to_col]
            .iter()
            .any(|&c| c > 7)
        {
            return Err(ActionError::OffBoard);
        }
        Ok(OutboundMessage::Move(mv))
    }

    /// Arm the resignation confirmation.
    pub fn request_resign(&mut self, ctx: ActionContext) -> Result<(), ActionError> {
        self.arm(ctx, PendingConfirmation::Resign)
    }

    /// Arm the draw-offer confirmation.
    pub fn request_draw_offer(&mut self, ctx: ActionContext) -> Result<(), ActionError> {
        self.arm(ctx, PendingConfirmation::DrawOffer)
    }

    fn arm(&mut self, ctx: ActionContext, what: PendingConfirmation) -> Result<(), ActionError> {
        ensure_live(ctx)?;
        if let Some(previous) = self.confirmation.replace(what) {
            debug!(?previous, replacement = ?what, "confirmation replaced");
        }
        Ok(())
    }

    /// Confirm the armed action and build its message.
    ///
    /// On failure the confirmation stays armed so it can be retried once the
    /// channel is back.
    pub fn confirm(&mut self, ctx: ActionContext) -> Result<OutboundMessage, ActionError> {
        let what = self.confirmation.ok_or(ActionError::NothingToConfirm)?;
        ensure_sendable(ctx)?;
        self.confirmation = None;
        let action = match what {
            PendingConfirmation::Resign => GameActionKind::Resign,
            PendingConfirmation::DrawOffer => GameActionKind::DrawOffer,
        };
        Ok(OutboundMessage::GameAction(GameAction {
            action,
            offer_id: None,
        }))
    }

    /// Disarm the confirmation, returning what was armed.
    pub fn dismiss(&mut self) -> Option<PendingConfirmation> {
        self.confirmation.take()
    }

    /// The armed confirmation, if any.
    pub fn pending_confirmation(&self) -> Option<PendingConfirmation> {
        self.confirmation
    }

    /// Record a draw offer notification.
    ///
    /// Offers made by the local user are not stored. A newer offer replaces
    /// an older one. Returns the stored offer.
    pub fn on_draw_offer(&mut self, offer: &DrawOffer) -> Option<PendingOffer> {
        if offer.player_id == self.local_user {
            debug!(offer_id = %offer.offer_id, "own draw offer echoed, ignoring");
            return None;
        }
        let pending = PendingOffer {
            offer_id: offer.offer_id.clone(),
            player_id: offer.player_id,
        };
        if let Some(old) = self.pending_offer.replace(pending.clone()) {
            debug!(old = %old.offer_id, new = %pending.offer_id, "draw offer superseded");
        }
        Some(pending)
    }

    /// The offer awaiting an answer, if any.
    pub fn pending_offer(&self) -> Option<&PendingOffer> {
        self.pending_offer.as_ref()
    }

    /// Accept the pending offer named by `offer_id`.
    ///
    /// Returns `Ok(None)` when no offer with that id is pending.
    pub fn accept_draw(
        &mut self,
        ctx: ActionContext,
        offer_id: &OfferId,
    ) -> Result<Option<OutboundMessage>, ActionError> {
        self.answer(ctx, offer_id, GameActionKind::DrawAccept)
    }

    /// Decline the pending offer named by `offer_id`.
    ///
    /// Returns `Ok(None)` when no offer with that id is pending.
    pub fn decline_draw(
        &mut self,
        ctx: ActionContext,
        offer_id: &OfferId,
    ) -> Result<Option<OutboundMessage>, ActionError> {
        self.answer(ctx, offer_id, GameActionKind::DrawDecline)
    }

    fn answer(
        &mut self,
        ctx: ActionContext,
        offer_id: &OfferId,
        action: GameActionKind,
    ) -> Result<Option<OutboundMessage>, ActionError> {
        match &self.pending_offer {
            Some(pending) if &pending.offer_id == offer_id => {}
            Some(pending) => {
                debug!(pending = %pending.offer_id, answered = %offer_id, "offer id mismatch");
                return Ok(None);
            }
            None => {
                debug!(answered = %offer_id, "no pending draw offer");
                return Ok(None);
            }
        }
        ensure_sendable(ctx)?;
        self.pending_offer = None;
        Ok(Some(OutboundMessage::GameAction(GameAction {
            action,
            offer_id: Some(offer_id.clone()),
        })))
    }

    /// Drop all local action state once the game is over.
    pub fn clear_on_end(&mut self) {
        self.confirmation = None;
        self.pending_offer = None;
    }
}

fn ensure_live(ctx: ActionContext) -> Result<(), ActionError> {
    if ctx.lifecycle == SessionLifecycle::Live {
        Ok(())
    } else {
        Err(ActionError::NotLive {
            lifecycle: ctx.lifecycle,
        })
    }
}

fn ensure_sendable(ctx: ActionContext) -> Result<(), ActionError> {
    ensure_live(ctx)?;
    if ctx.channel_open {
        Ok(())
    } else {
        Err(ActionError::ChannelClosed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ME: UserId = UserId::new(1);
    const THEM: UserId = UserId::new(2);

    fn ready() -> ActionContext {
        ActionContext {
            lifecycle: SessionLifecycle::Live,
            channel_open: true,
        }
    }

    fn offer(id: &str, from: UserId) -> DrawOffer {
        DrawOffer {
            offer_id: OfferId::text(id),
            player_id: from,
        }
    }

    fn e2e4() -> MoveRequest {
        MoveRequest {
            from_row: 1,
            from_col: 4,
            to_row: 3,
            to_col: 4,
            promotion: None,
        }
    }

    #[test]
    fn move_requires_live_and_open_channel() {
        let handlers = ActionHandlers::new(ME);

        assert_eq!(
            handlers.submit_move(ready(), e2e4()),
            Ok(OutboundMessage::Move(e2e4()))
        );
        assert_eq!(
            handlers.submit_move(
                ActionContext {
                    lifecycle: SessionLifecycle::AwaitingInitialState,
                    channel_open: true
                },
                e2e4()
            ),
            Err(ActionError::NotLive {
                lifecycle: SessionLifecycle::AwaitingInitialState
            })
        );
        assert_eq!(
            handlers.submit_move(
                ActionContext {
                    lifecycle: SessionLifecycle::Live,
                    channel_open: false
                },
                e2e4()
            ),
            Err(ActionError::ChannelClosed)
        );
    }

    #[test]
    fn move_off_board_is_refused() {
        let handlers = ActionHandlers::new(ME);
        let mut mv = e2e4();
        mv.to_col = 8;
        assert_eq!(handlers.submit_move(ready(), mv), Err(ActionError::OffBoard));
    }

    #[test]
    fn resign_needs_confirmation() {
        let mut handlers = ActionHandlers::new(ME);
        assert_eq!(handlers.confirm(ready()), Err(ActionError::NothingToConfirm));

        handlers.request_resign(ready()).unwrap();
        assert_eq!(
            handlers.pending_confirmation(),
            Some(PendingConfirmation::Resign)
        );

        let msg = handlers.confirm(ready()).unwrap();
        assert_eq!(
            msg,
            OutboundMessage::GameAction(GameAction {
                action: GameActionKind::Resign,
                offer_id: None
            })
        );
        assert_eq!(handlers.pending_confirmation(), None);
    }

    #[test]
    fn arming_replaces_previous_confirmation() {
        let mut handlers = ActionHandlers::new(ME);
        handlers.request_resign(ready()).unwrap();
        handlers.request_draw_offer(ready()).unwrap();

        match handlers.confirm(ready()).unwrap() {
            OutboundMessage::GameAction(action) => {
                assert_eq!(action.action, GameActionKind::DrawOffer)
            }
            other => panic!("Expected GameAction, got {:?}", other),
        }
    }

    #[test]
    fn dismiss_clears_confirmation() {
        let mut handlers = ActionHandlers::new(ME);
        handlers.request_draw_offer(ready()).unwrap();
        assert_eq!(handlers.dismiss(), Some(PendingConfirmation::DrawOffer));
        assert_eq!(handlers.confirm(ready()), Err(ActionError::NothingToConfirm));
    }

    #[test]
    fn failed_confirm_stays_armed() {
        let mut handlers = ActionHandlers::new(ME);
        handlers.request_resign(ready()).unwrap();

        let closed = ActionContext {
            lifecycle: SessionLifecycle::Live,
            channel_open: false,
        };
        assert_eq!(handlers.confirm(closed), Err(ActionError::ChannelClosed));
        assert!(handlers.confirm(ready()).is_ok());
    }

    #[test]
    fn cannot_arm_outside_live() {
        let mut handlers = ActionHandlers::new(ME);
        let ended = ActionContext {
            lifecycle: SessionLifecycle::Ended,
            channel_open: true,
        };
        assert!(matches!(
            handlers.request_resign(ended),
            Err(ActionError::NotLive { .. })
        ));
        assert_eq!(handlers.pending_confirmation(), None);
    }

    #[test]
    fn accept_matching_offer_clears_it() {
        let mut handlers = ActionHandlers::new(ME);
        handlers.on_draw_offer(&offer("o-1", THEM)).unwrap();

        let msg = handlers
            .accept_draw(ready(), &OfferId::text("o-1"))
            .unwrap()
            .unwrap();
        assert_eq!(
            msg,
            OutboundMessage::GameAction(GameAction {
                action: GameActionKind::DrawAccept,
                offer_id: Some(OfferId::text("o-1"))
            })
        );
        assert!(handlers.pending_offer().is_none());
    }

    #[test]
    fn mismatched_offer_is_a_no_op() {
        let mut handlers = ActionHandlers::new(ME);
        handlers.on_draw_offer(&offer("o-1", THEM)).unwrap();

        assert_eq!(
            handlers.decline_draw(ready(), &OfferId::text("o-2")),
            Ok(None)
        );
        assert!(handlers.pending_offer().is_some());
    }

    #[test]
    fn answer_without_offer_is_a_no_op() {
        let mut handlers = ActionHandlers::new(ME);
        assert_eq!(
            handlers.accept_draw(ready(), &OfferId::number(3)),
            Ok(None)
        );
    }

    #[test]
    fn decline_on_closed_channel_keeps_offer() {
        let mut handlers = ActionHandlers::new(ME);
        handlers.on_draw_offer(&offer("o-1", THEM)).unwrap();
        let closed = ActionContext {
            lifecycle: SessionLifecycle::Live,
            channel_open: false,
        };
        assert_eq!(
            handlers.decline_draw(closed, &OfferId::text("o-1")),
            Err(ActionError::ChannelClosed)
        );
        assert!(handlers.pending_offer().is_some());
    }

    #[test]
    fn at_most_one_pending_offer() {
        let mut handlers = ActionHandlers::new(ME);
        handlers.on_draw_offer(&offer("o-1", THEM)).unwrap();
        handlers.on_draw_offer(&offer("o-2", THEM)).unwrap();

        assert_eq!(
            handlers.pending_offer().map(|o| o.offer_id.clone()),
            Some(OfferId::text("o-2"))
        );
        assert_eq!(
            handlers.accept_draw(ready(), &OfferId::text("o-1")),
            Ok(None)
        );
    }

    #[test]
    fn own_offer_is_not_stored() {
        let mut handlers = ActionHandlers::new(ME);
        assert!(handlers.on_draw_offer(&offer("o-1", ME)).is_none());
        assert!(handlers.pending_offer().is_none());
    }

    #[test]
    fn end_clears_everything() {
        let mut handlers = ActionHandlers::new(ME);
        handlers.request_resign(ready()).unwrap();
        handlers.on_draw_offer(&offer("o-1", THEM)).unwrap();

        handlers.clear_on_end();
        assert!(handlers.pending_confirmation().is_none());
        assert!(handlers.pending_offer().is_none());
    }
}
