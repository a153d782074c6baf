//! # sync-client
//!
//! Client library for boardsync game sessions.
//!
//! This is the library a front end uses to play one game in one room.
//!
//! ## Features
//!
//! - **Authoritative sync**: the board only changes when the server pushes it
//! - **Automatic reconnect**: bounded exponential backoff, rejoin and resync
//! - **Transport Abstraction**: Pluggable transport layer (WebSocket, mock)
//! - **Pure State Machine**: Uses boardsync-core for side-effect-free logic
//!
//! ## Example
//!
//! ```ignore
//! use boardsync_client::{GameClient, SessionConfig, WebSocketTransport};
//!
//! let config = SessionConfig::new("ws://localhost:3005/ws", "room-1", UserId::new(7), "alice");
//! let mut client = GameClient::new(config, WebSocketTransport::new());
//!
//! client.connect().await?;
//! let events = client.next_events().await?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod client;
pub mod transport;

pub use client::{ClientError, GameClient, SessionConfig};
pub use transport::{MockTransport, Transport, TransportError, WebSocketTransport};
