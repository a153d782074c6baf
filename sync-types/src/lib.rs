//! # sync-types
//!
//! Wire format types for the boardsync game session protocol.
//!
//! This crate provides the foundational types used across all boardsync crates:
//! - [`RoomId`], [`UserId`], [`OfferId`], [`Color`] - Identity types
//! - [`InboundMessage`] - Messages pushed by the game authority
//! - [`OutboundMessage`] - Requests sent by the client
//! - [`WireError`] - Frame parsing and serialization errors
//!
//! Every frame is a single JSON object carrying a `type` discriminant.
//! Field names are camelCase on the wire.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod error;
mod ids;
mod messages;

pub use error::WireError;
pub use ids::{Color, OfferId, RoomId, UserId};
pub use messages::{
    DrawDeclined, DrawOffer, ErrorNotice, GameAction, GameActionKind, GameEnd, GameStateMessage,
    GameUpdateMessage, InboundMessage, JoinRoom, MoveHistoryEntry, MoveRequest, OutboundMessage,
    Promotion, WireClocks, WirePlayer,
};
