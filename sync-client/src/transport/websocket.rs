//! WebSocket transport.
//!
//! One connection at a time. The socket is split into its sink and stream
//! halves so a send does not wait behind a pending receive.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

use super::{Transport, TransportError};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// WebSocket transport carrying JSON text frames.
#[derive(Default)]
pub struct WebSocketTransport {
    sink: Mutex<Option<SplitSink<WsStream, Message>>>,
    stream: Mutex<Option<SplitStream<WsStream>>>,
    connected: AtomicBool,
}

impl WebSocketTransport {
    /// Create a disconnected transport.
    pub fn new() -> Self {
        Self::default()
    }

    fn mark_closed(&self) {
        self.connected.store(false, Ordering::SeqCst);
    }
}

impl std::fmt::Debug for WebSocketTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebSocketTransport")
            .field("connected", &self.is_connected())
            .finish()
    }
}

#[async_trait]
impl Transport for WebSocketTransport {
    async fn connect(&self, url: &str) -> Result<(), TransportError> {
        info!(url = %url, "connecting to WebSocket server");

        let (ws_stream, _) = connect_async(url)
            .await
            .map_err(|e| TransportError::ConnectionFailed(e.to_string()))?;
        let (sink, stream) = ws_stream.split();

        *self.sink.lock().await = Some(sink);
        *self.stream.lock().await = Some(stream);
        self.connected.store(true, Ordering::SeqCst);

        info!(url = %url, "WebSocket connection established");
        Ok(())
    }

    async fn send(&self, frame: &str) -> Result<(), TransportError> {
        let mut guard = self.sink.lock().await;
        let sink = guard.as_mut().ok_or(TransportError::NotConnected)?;

        if let Err(e) = sink.send(Message::Text(frame.to_string())).await {
            self.mark_closed();
            return Err(TransportError::SendFailed(e.to_string()));
        }
        Ok(())
    }

    async fn recv(&self) -> Result<String, TransportError> {
        let mut guard = self.stream.lock().await;
        let stream = guard.as_mut().ok_or(TransportError::NotConnected)?;

        loop {
            match stream.next().await {
                Some(Ok(Message::Text(text))) => return Ok(text),
                Some(Ok(Message::Binary(data))) => match String::from_utf8(data) {
                    Ok(text) => return Ok(text),
                    Err(_) => warn!("dropping non-UTF-8 binary frame"),
                },
                Some(Ok(Message::Close(frame))) => {
                    debug!(?frame, "server closed connection");
                    self.mark_closed();
                    return Err(TransportError::ConnectionClosed);
                }
                Some(Ok(_)) => {
                    // Ping/pong are answered by tungstenite itself.
                }
                Some(Err(e)) => {
                    self.mark_closed();
                    return Err(TransportError::ReceiveFailed(e.to_string()));
                }
                None => {
                    self.mark_closed();
                    return Err(TransportError::ConnectionClosed);
                }
            }
        }
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn close(&self) -> Result<(), TransportError> {
        self.mark_closed();
        let sink = self.sink.lock().await.take();
        self.stream.lock().await.take();

        if let Some(mut sink) = sink {
            // Sends the close frame and flushes.
            sink.close()
                .await
                .map_err(|e| TransportError::SendFailed(e.to_string()))?;
        }
        Ok(())
    }

    fn abort(&self) {
        self.mark_closed();
        // Dropping both halves releases the socket. Uncontended whenever the
        // owner is being dropped.
        if let Ok(mut sink) = self.sink.try_lock() {
            sink.take();
        }
        if let Ok(mut stream) = self.stream.try_lock() {
            stream.take();
        }
    }
}
