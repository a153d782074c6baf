//! Events surfaced to the front end.

use std::time::Duration;

use boardsync_types::{GameEnd, OfferId};

use crate::actions::PendingOffer;

/// Channel connectivity changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelEvent {
    /// The channel is open and the join handshake has been sent.
    Connected,
    /// The first connection attempt failed.
    ConnectionFailed {
        /// Error message describing the failure.
        error: String,
    },
    /// An open channel went away.
    Disconnected {
        /// Reason for disconnection.
        reason: String,
    },
    /// A reconnect attempt is scheduled.
    Reconnecting {
        /// Which attempt this will be.
        attempt: u32,
        /// Delay before the attempt.
        delay: Duration,
    },
    /// A reconnect attempt failed.
    ReconnectFailed {
        /// Which attempt failed.
        attempt: u32,
        /// Error message describing the failure.
        error: String,
    },
    /// The reconnect budget is spent; the session stays disconnected.
    GaveUp {
        /// Reconnect attempts made.
        attempts: u32,
    },
}

/// Everything a front end may need to react to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// Connectivity changed.
    Channel(ChannelEvent),
    /// A full snapshot was applied.
    StateSynced {
        /// True when this rebuilt an already-live session after a reconnect.
        resync: bool,
    },
    /// An incremental snapshot was applied at this history index.
    BoardUpdated {
        /// History index of the new snapshot.
        ply: usize,
    },
    /// The game is over.
    GameEnded(GameEnd),
    /// Application-level notice from the authority, such as a rejected move.
    Notice {
        /// Text to show.
        message: String,
    },
    /// The opponent offers a draw.
    DrawOffered(PendingOffer),
    /// A draw offer was declined.
    DrawDeclined {
        /// The declined offer, when known.
        offer_id: Option<OfferId>,
    },
    /// An inbound message was dropped as invalid.
    ProtocolError {
        /// What was wrong.
        reason: String,
    },
}
