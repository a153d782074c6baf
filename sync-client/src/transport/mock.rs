//! Mock transport for testing.
//!
//! Allows queueing inbound frames (and channel drops), capturing sent frames
//! for verification, and forcing connect/send failures.

use super::{Transport, TransportError};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

/// Mock transport for testing.
///
/// Clones share state, so a test can keep one handle while the client owns
/// another.
#[derive(Debug, Default)]
pub struct MockTransport {
    inner: Arc<Mutex<MockTransportInner>>,
}

#[derive(Debug, Default)]
struct MockTransportInner {
    connected: bool,
    connected_url: Option<String>,
    connect_count: u32,
    close_count: u32,
    aborted: bool,
    sent_frames: Vec<String>,
    /// `None` entries simulate the peer dropping the channel.
    receive_queue: VecDeque<Option<String>>,
    connect_failures: VecDeque<String>,
    fail_next_send: Option<String>,
}

impl MockTransport {
    /// Create a new mock transport.
    pub fn new() -> Self {
        Self::default()
    }

    fn inner(&self) -> MutexGuard<'_, MockTransportInner> {
        // A panicking test thread must not cascade into unrelated assertions.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Queue a frame to be returned by a later `recv()` call.
    pub fn queue_frame(&self, frame: impl Into<String>) {
        self.inner().receive_queue.push_back(Some(frame.into()));
    }

    /// Queue a channel drop: the `recv()` that reaches it fails with
    /// `ConnectionClosed` and the transport disconnects.
    pub fn queue_disconnect(&self) {
        self.inner().receive_queue.push_back(None);
    }

    /// Get all frames that were sent.
    pub fn sent_frames(&self) -> Vec<String> {
        self.inner().sent_frames.clone()
    }

    /// Get the last frame that was sent.
    pub fn last_sent(&self) -> Option<String> {
        self.inner().sent_frames.last().cloned()
    }

    /// Get the URL that was connected to.
    pub fn connected_url(&self) -> Option<String> {
        self.inner().connected_url.clone()
    }

    /// Number of successful `connect()` calls.
    pub fn connect_count(&self) -> u32 {
        self.inner().connect_count
    }

    /// Number of `close()` calls.
    pub fn close_count(&self) -> u32 {
        self.inner().close_count
    }

    /// Whether `abort()` was called.
    pub fn was_aborted(&self) -> bool {
        self.inner().aborted
    }

    /// Cause the next connect() to fail with the given error. Calls stack:
    /// each queued failure is consumed by one attempt.
    pub fn fail_next_connect(&self, error: &str) {
        self.inner().connect_failures.push_back(error.to_string());
    }

    /// Cause the next send() to fail with the given error.
    pub fn fail_next_send(&self, error: &str) {
        self.inner().fail_next_send = Some(error.to_string());
    }
}

impl Clone for MockTransport {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn connect(&self, url: &str) -> Result<(), TransportError> {
        let mut inner = self.inner();

        // Check for forced failure
        if let Some(error) = inner.connect_failures.pop_front() {
            return Err(TransportError::ConnectionFailed(error));
        }

        inner.connected = true;
        inner.connected_url = Some(url.to_string());
        inner.connect_count += 1;
        Ok(())
    }

    async fn send(&self, frame: &str) -> Result<(), TransportError> {
        let mut inner = self.inner();

        if !inner.connected {
            return Err(TransportError::NotConnected);
        }

        // Check for forced failure
        if let Some(error) = inner.fail_next_send.take() {
            return Err(TransportError::SendFailed(error));
        }

        inner.sent_frames.push(frame.to_string());
        Ok(())
    }

    async fn recv(&self) -> Result<String, TransportError> {
        let mut inner = self.inner();

        if !inner.connected {
            return Err(TransportError::NotConnected);
        }

        match inner.receive_queue.pop_front() {
            Some(Some(frame)) => Ok(frame),
            Some(None) | None => {
                inner.connected = false;
                Err(TransportError::ConnectionClosed)
            }
        }
    }

    fn is_connected(&self) -> bool {
        self.inner().connected
    }

    async fn close(&self) -> Result<(), TransportError> {
        let mut inner = self.inner();
        inner.connected = false;
        inner.close_count += 1;
        Ok(())
    }

    fn abort(&self) {
        let mut inner = self.inner();
        inner.connected = false;
        inner.aborted = true;
    }
}
