//! GameClient - the session connection manager.
//!
//! This module provides [`GameClient`], which owns the channel to the game
//! authority and everything that hangs off it for one room.
//!
//! # Architecture
//!
//! GameClient uses pure state machines (from boardsync-core) for protocol
//! logic and interprets their actions to perform actual I/O via the
//! Transport trait.
//!
//! ```text
//! Front end → GameClient → Transport → Network
//!                 ↓
//!       boardsync-core (channel state machine, dispatcher,
//!                       synchronizer, action handlers)
//! ```
//!
//! The client is a single writer: every method takes `&mut self` and no
//! state is shared behind locks. Every transition is recorded before the
//! first await: the reconnect deadline and emitted events land in `self`
//! at once, and I/O actions wait in a backlog that is only popped once
//! they finish. An interrupted [`GameClient::next_events`] call (for
//! example when a front end `select!`s it against user input) therefore
//! picks up where it left off. A cancelled close is not retried.
//!
//! # Example
//!
//! ```ignore
//! use boardsync_client::{GameClient, SessionConfig, WebSocketTransport};
//!
//! let config = SessionConfig::new("ws://localhost:3005/ws", "room-1", UserId::new(7), "alice");
//! let mut client = GameClient::new(config, WebSocketTransport::new());
//!
//! client.connect().await?;
//! loop {
//!     for event in client.next_events().await? {
//!         // render
//!     }
//! }
//! ```

use std::collections::VecDeque;
use std::time::Duration;

use boardsync_core::{
    Action, ActionContext, ActionError, ActionHandlers, ChannelEvent, ChannelState, DisplayClock,
    Dispatcher, Event, PendingConfirmation, PendingOffer, ReconnectPolicy, ReplayHistory,
    SessionEvent, SessionLifecycle, Synchronizer,
};
use boardsync_types::{JoinRoom, MoveRequest, OfferId, OutboundMessage, RoomId, UserId, WireError};
use thiserror::Error;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::transport::{Transport, TransportError};

/// Client errors.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Transport error.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// The action was refused locally.
    #[error("action refused: {0}")]
    Action(#[from] ActionError),

    /// A frame could not be serialized.
    #[error("wire error: {0}")]
    Wire(#[from] WireError),

    /// No channel and no reconnect in progress.
    #[error("not connected")]
    NotConnected,

    /// Reconnect budget spent; the session stays disconnected.
    #[error("gave up after {attempts} reconnect attempts")]
    ReconnectExhausted {
        /// Reconnect attempts made.
        attempts: u32,
    },
}

/// Everything needed to join one room.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Game server WebSocket URL.
    pub url: String,
    /// Room handed out by matchmaking.
    pub room_id: RoomId,
    /// Local user.
    pub user_id: UserId,
    /// Local display name.
    pub username: String,
    /// Reconnect backoff.
    pub reconnect: ReconnectPolicy,
}

impl SessionConfig {
    /// Configuration with the default reconnect policy.
    pub fn new(
        url: impl Into<String>,
        room_id: impl Into<RoomId>,
        user_id: UserId,
        username: impl Into<String>,
    ) -> Self {
        Self {
            url: url.into(),
            room_id: room_id.into(),
            user_id,
            username: username.into(),
            reconnect: ReconnectPolicy::default(),
        }
    }

    /// Set the reconnect policy.
    pub fn with_reconnect(mut self, policy: ReconnectPolicy) -> Self {
        self.reconnect = policy;
        self
    }
}

/// Client for one game session.
pub struct GameClient<T: Transport> {
    config: SessionConfig,
    transport: T,
    channel: ChannelState,
    dispatcher: Dispatcher,
    sync: Synchronizer,
    actions: ActionHandlers,
    pending: Vec<SessionEvent>,
    /// I/O actions not yet carried out, oldest first.
    backlog: VecDeque<Action>,
    reconnect_at: Option<Instant>,
    gave_up: Option<u32>,
    clock_stamp: Option<Instant>,
}

impl<T: Transport> GameClient<T> {
    /// Create a new client. Nothing happens until [`GameClient::connect`].
    pub fn new(config: SessionConfig, transport: T) -> Self {
        Self {
            dispatcher: Dispatcher::new(config.room_id.clone()),
            actions: ActionHandlers::new(config.user_id),
            config,
            transport,
            channel: ChannelState::new(),
            sync: Synchronizer::new(),
            pending: Vec::new(),
            backlog: VecDeque::new(),
            reconnect_at: None,
            gave_up: None,
            clock_stamp: None,
        }
    }

    /// Open the channel and send the join handshake.
    ///
    /// A failed first attempt is not an error: it is reported as a channel
    /// event and retried by [`GameClient::next_events`]. Only a spent
    /// reconnect budget is an error.
    pub async fn connect(&mut self) -> Result<Vec<SessionEvent>, ClientError> {
        self.drive(Event::ConnectRequested).await?;
        Ok(self.take_events())
    }

    /// Wait for the next batch of events.
    ///
    /// Reads one inbound frame when the channel is open, or performs the
    /// next reconnect step when it is not. The batch may be empty (for
    /// example, an ignored message type).
    pub async fn next_events(&mut self) -> Result<Vec<SessionEvent>, ClientError> {
        if !self.pending.is_empty() {
            return Ok(self.take_events());
        }
        if !self.backlog.is_empty() || self.gave_up.is_some() {
            self.resume().await?;
            return Ok(self.take_events());
        }

        match self.channel {
            ChannelState::Open => {
                match self.transport.recv().await {
                    Ok(frame) => {
                        let events =
                            self.dispatcher
                                .dispatch(&frame, &mut self.sync, &mut self.actions);
                        self.note_events(&events);
                        Ok(events)
                    }
                    Err(e) => {
                        warn!(error = %e, "channel lost");
                        self.drive(Event::ChannelLost {
                            reason: e.to_string(),
                        })
                        .await?;
                        Ok(self.take_events())
                    }
                }
            }
            ChannelState::Reconnecting { .. } => {
                if let Some(deadline) = self.reconnect_at {
                    tokio::time::sleep_until(deadline).await;
                }
                self.reconnect_at = None;
                self.drive(Event::ReconnectTimer).await?;
                Ok(self.take_events())
            }
            ChannelState::Connecting { .. } => {
                self.backlog.push_back(Action::Connect);
                self.resume().await?;
                Ok(self.take_events())
            }
            ChannelState::Disconnected => Err(ClientError::NotConnected),
        }
    }

    /// Feed one event to the channel state machine and carry out its
    /// actions, including any events those actions produce.
    async fn drive(&mut self, first: Event) -> Result<(), ClientError> {
        self.feed(first);
        self.resume().await
    }

    /// Apply one transition. Everything that needs no I/O happens here,
    /// synchronously; the rest is queued on the backlog.
    fn feed(&mut self, event: Event) {
        let (state, actions) =
            std::mem::take(&mut self.channel).on_event(event, &self.config.reconnect);
        self.channel = state;

        for action in actions {
            match action {
                Action::StartReconnectTimer { delay } => {
                    self.reconnect_at = Some(Instant::now() + delay);
                }
                Action::CancelReconnect => self.reconnect_at = None,
                Action::EmitEvent(event) => {
                    if let ChannelEvent::GaveUp { attempts } = event {
                        warn!(attempts, "reconnect budget spent");
                        self.gave_up = Some(attempts);
                    }
                    self.pending.push(SessionEvent::Channel(event));
                }
                Action::Connect | Action::SendJoin | Action::Close => {
                    self.backlog.push_back(action)
                }
            }
        }
    }

    /// Run the backlog to completion, feeding outcomes back in.
    async fn resume(&mut self) -> Result<(), ClientError> {
        while let Some(action) = self.backlog.front().cloned() {
            let outcome = match action {
                Action::Connect => Some(self.try_connect().await),
                Action::SendJoin => self.send_join().await.err().map(|e| Event::ChannelLost {
                    reason: e.to_string(),
                }),
                Action::Close => {
                    self.backlog.pop_front();
                    if let Err(e) = self.transport.close().await {
                        debug!(error = %e, "close failed");
                    }
                    continue;
                }
                _ => None,
            };
            self.backlog.pop_front();
            if let Some(event) = outcome {
                self.feed(event);
            }
        }

        match self.gave_up.take() {
            Some(attempts) => Err(ClientError::ReconnectExhausted { attempts }),
            None => Ok(()),
        }
    }

    async fn try_connect(&self) -> Event {
        match self.transport.connect(&self.config.url).await {
            Ok(()) => {
                info!(url = %self.config.url, room = %self.config.room_id, "channel open");
                Event::ConnectSucceeded
            }
            Err(e) => {
                warn!(url = %self.config.url, error = %e, "connect failed");
                Event::ConnectFailed {
                    error: e.to_string(),
                }
            }
        }
    }

    async fn send_join(&mut self) -> Result<(), ClientError> {
        let join = OutboundMessage::JoinRoom(JoinRoom {
            room_id: self.config.room_id.clone(),
            user_id: self.config.user_id,
            username: self.config.username.clone(),
        })
        .to_json()?;
        self.transport.send(&join).await?;
        self.sync.on_join_sent();
        Ok(())
    }

    fn note_events(&mut self, events: &[SessionEvent]) {
        for event in events {
            match event {
                SessionEvent::StateSynced { .. } | SessionEvent::BoardUpdated { .. } => {
                    self.clock_stamp = Some(Instant::now());
                }
                SessionEvent::GameEnded(_) => self.clock_stamp = None,
                _ => {}
            }
        }
    }

    fn take_events(&mut self) -> Vec<SessionEvent> {
        std::mem::take(&mut self.pending)
    }

    fn ctx(&self) -> ActionContext {
        ActionContext {
            lifecycle: self.sync.lifecycle(),
            channel_open: self.channel.is_open() && self.transport.is_connected(),
        }
    }

    async fn send(&mut self, msg: &OutboundMessage) -> Result<(), ClientError> {
        let frame = msg.to_json()?;
        if let Err(e) = self.transport.send(&frame).await {
            warn!(error = %e, "send failed, channel lost");
            // Events from the reconnect schedule surface on the next poll.
            self.drive(Event::ChannelLost {
                reason: e.to_string(),
            })
            .await?;
            return Err(e.into());
        }
        Ok(())
    }

    /// Send a move request. The board only changes when the authority
    /// pushes the result.
    pub async fn send_move(&mut self, mv: MoveRequest) -> Result<(), ClientError> {
        let msg = self.actions.submit_move(self.ctx(), mv)?;
        self.send(&msg).await
    }

    /// Arm the resignation confirmation.
    pub fn request_resign(&mut self) -> Result<(), ClientError> {
        let ctx = self.ctx();
        Ok(self.actions.request_resign(ctx)?)
    }

    /// Arm the draw-offer confirmation.
    pub fn request_draw_offer(&mut self) -> Result<(), ClientError> {
        let ctx = self.ctx();
        Ok(self.actions.request_draw_offer(ctx)?)
    }

    /// Send the armed resignation or draw offer.
    pub async fn confirm_action(&mut self) -> Result<(), ClientError> {
        let ctx = self.ctx();
        let msg = self.actions.confirm(ctx)?;
        self.send(&msg).await
    }

    /// Disarm the pending confirmation.
    pub fn dismiss_action(&mut self) -> Option<PendingConfirmation> {
        self.actions.dismiss()
    }

    /// Accept the draw offer `offer_id`. Returns `false` when no such offer
    /// is pending.
    pub async fn accept_draw(&mut self, offer_id: &OfferId) -> Result<bool, ClientError> {
        let ctx = self.ctx();
        match self.actions.accept_draw(ctx, offer_id)? {
            Some(msg) => self.send(&msg).await.map(|()| true),
            None => Ok(false),
        }
    }

    /// Decline the draw offer `offer_id`. Returns `false` when no such offer
    /// is pending.
    pub async fn decline_draw(&mut self, offer_id: &OfferId) -> Result<bool, ClientError> {
        let ctx = self.ctx();
        match self.actions.decline_draw(ctx, offer_id)? {
            Some(msg) => self.send(&msg).await.map(|()| true),
            None => Ok(false),
        }
    }

    /// Close the channel gracefully and stop reconnecting.
    pub async fn close(&mut self) -> Result<(), ClientError> {
        self.drive(Event::DisconnectRequested).await
    }

    /// The game state.
    pub fn session(&self) -> &Synchronizer {
        &self.sync
    }

    /// Current lifecycle state.
    pub fn lifecycle(&self) -> SessionLifecycle {
        self.sync.lifecycle()
    }

    /// Replay history for navigation. Navigating never sends anything.
    pub fn history_mut(&mut self) -> Option<&mut ReplayHistory> {
        self.sync.history_mut()
    }

    /// The opponent's draw offer awaiting an answer.
    pub fn pending_offer(&self) -> Option<&PendingOffer> {
        self.actions.pending_offer()
    }

    /// The armed confirmation, if any.
    pub fn pending_confirmation(&self) -> Option<PendingConfirmation> {
        self.actions.pending_confirmation()
    }

    /// Channel state.
    pub fn channel(&self) -> &ChannelState {
        &self.channel
    }

    /// Clocks for display, running the side to move since the last push.
    pub fn display_clock(&self) -> Option<DisplayClock> {
        let clocks = self.sync.clocks()?;
        let running = self.sync.lifecycle() == SessionLifecycle::Live;
        match (running, self.sync.board(), self.clock_stamp) {
            (true, Some(board), Some(stamp)) => {
                Some(clocks.interpolate(board.active_color(), stamp.elapsed()))
            }
            _ => Some(clocks.interpolate(boardsync_core::Color::White, Duration::ZERO)),
        }
    }

    /// Get a reference to the underlying transport (for testing).
    pub fn transport(&self) -> &T {
        &self.transport
    }
}

impl<T: Transport> Drop for GameClient<T> {
    fn drop(&mut self) {
        self.transport.abort();
    }
}
