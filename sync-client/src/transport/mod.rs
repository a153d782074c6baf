//! Transport abstraction for boardsync.
//!
//! This module provides a pluggable transport layer that abstracts the
//! underlying duplex channel (WebSocket, mock for testing).
//!
//! # Design
//!
//! The transport trait is async and connection-oriented:
//! - `connect()` establishes a connection
//! - `send()` transmits one JSON text frame
//! - `recv()` receives one JSON text frame
//! - `close()` gracefully terminates
//! - `abort()` drops the connection immediately, without awaiting anything
//!
//! # Example
//!
//! ```ignore
//! let transport = MockTransport::new();
//! transport.connect("ws://localhost:3005/ws").await?;
//! transport.send(r#"{"type":"joinRoom",...}"#).await?;
//! let frame = transport.recv().await?;
//! ```

mod mock;
mod websocket;

pub use mock::MockTransport;
pub use websocket::WebSocketTransport;

use async_trait::async_trait;
use thiserror::Error;

/// Transport errors.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Connection failed.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// Not connected.
    #[error("not connected")]
    NotConnected,

    /// Connection closed.
    #[error("connection closed")]
    ConnectionClosed,

    /// Send failed.
    #[error("send failed: {0}")]
    SendFailed(String),

    /// Receive failed.
    #[error("receive failed: {0}")]
    ReceiveFailed(String),
}

/// Transport trait for sending and receiving protocol frames.
///
/// Implementations handle the underlying connection mechanism
/// (WebSocket, mock, etc).
#[async_trait]
pub trait Transport: Send + Sync {
    /// Connect to the game server at `url`.
    async fn connect(&self, url: &str) -> Result<(), TransportError>;

    /// Send one text frame.
    async fn send(&self, frame: &str) -> Result<(), TransportError>;

    /// Receive one text frame.
    ///
    /// Blocks until a frame is available or the connection closes.
    async fn recv(&self) -> Result<String, TransportError>;

    /// Check if currently connected.
    fn is_connected(&self) -> bool;

    /// Close the connection gracefully.
    async fn close(&self) -> Result<(), TransportError>;

    /// Release the connection immediately. Safe to call from `Drop`.
    fn abort(&self);
}
