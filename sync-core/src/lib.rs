//! # boardsync-core
//!
//! Pure session logic for boardsync (no I/O, instant tests).
//!
//! This crate holds everything about a two-player board game session that
//! does not need a socket: the board codec, the game state synchronizer, the
//! replay history, message dispatch, the action sub-protocols and the
//! channel state machine.
//!
//! ## Design Philosophy
//!
//! All modules in this crate are **pure** - they take input and produce output
//! without side effects. This enables:
//! - Instant unit tests (no mocks, no async)
//! - Deterministic behavior (same input → same output)
//! - Easy reasoning about state transitions
//!
//! The actual I/O is performed by `boardsync-client`, which interprets the
//! actions produced by [`state::ChannelState`] and feeds inbound frames to
//! [`dispatch::Dispatcher`].

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod actions;
pub mod board;
pub mod clock;
pub mod codec;
pub mod dispatch;
pub mod events;
pub mod fen;
pub mod history;
pub mod roster;
pub mod session;
pub mod state;

pub use actions::{ActionContext, ActionError, ActionHandlers, PendingConfirmation, PendingOffer};
pub use board::{Bitboards, BoardState, CastlingRights, Color, Piece, PieceKind, Square};
pub use clock::{ClockState, DisplayClock};
pub use codec::{decode, encode, CodecError};
pub use dispatch::Dispatcher;
pub use events::{ChannelEvent, SessionEvent};
pub use fen::{FenError, STARTING_FEN};
pub use history::ReplayHistory;
pub use roster::{Roster, SessionPlayer};
pub use session::{SessionLifecycle, SyncError, Synchronizer};
pub use state::{Action, ChannelState, Event, ReconnectPolicy};
