//! WebSocket transport
//!
//! Each protocol message travels as one WebSocket text frame, so no extra
//! framing is needed. A [`WebSocketTransport`] splits the socket into two
//! background tasks:
//!
//! - a writer that drains an outbound channel into the socket sink, and
//! - a reader that forwards text frames into an inbound channel.
//!
//! `send()` pushes onto the bounded outbound channel without waiting. It fails
//! once the writer has exited (the socket is dead) or when the queue is full
//! because the peer stopped reading. `receive()` ends once the reader has
//! exited (the peer closed or the socket errored).

use std::pin::Pin;
use std::sync::Arc;

use futures::{SinkExt, Stream, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{connect_async, WebSocketStream};

use crate::error::{DocrelayError, Result};
use crate::transport::{Connector, Transport};

/// Frames that may wait for the socket before `send()` starts failing.
pub const OUTBOUND_CAPACITY: usize = 256;

/// A [`Transport`] over an established WebSocket stream.
#[derive(Debug)]
pub struct WebSocketTransport {
    /// Sender side of the writer task's queue; `send()` writes here.
    outbound_tx: mpsc::Sender<String>,
    /// Shared receiver for inbound text frames.
    inbound_rx: Arc<Mutex<mpsc::UnboundedReceiver<String>>>,
    /// Reader task; aborted on drop. The writer exits by itself once
    /// `outbound_tx` is dropped, after sending a close frame.
    reader: JoinHandle<()>,
}

impl WebSocketTransport {
    /// Open a client connection to `url` (`ws://` or `wss://`).
    ///
    /// # Errors
    ///
    /// Returns [`DocrelayError::WebSocket`] if the TCP connect or the
    /// WebSocket handshake fails.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use docrelay::transport::WebSocketTransport;
    ///
    /// # #[tokio::main]
    /// # async fn main() -> anyhow::Result<()> {
    /// let transport = WebSocketTransport::connect("ws://localhost:3000").await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn connect(url: &str) -> Result<Self> {
        let (stream, _response) = connect_async(url).await.map_err(DocrelayError::WebSocket)?;
        tracing::debug!("WebSocket handshake with {} complete", url);
        Ok(Self::from_stream(stream))
    }

    /// Wrap an already-handshaken WebSocket stream.
    ///
    /// The server uses this for sockets returned by `accept_async`.
    pub fn from_stream<S>(stream: WebSocketStream<S>) -> Self
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let (mut sink, mut source) = stream.split();
        let (outbound_tx, mut outbound_rx) = mpsc::channel::<String>(OUTBOUND_CAPACITY);
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel::<String>();

        tokio::spawn(async move {
            while let Some(text) = outbound_rx.recv().await {
                if let Err(e) = sink.send(WsMessage::Text(text)).await {
                    tracing::debug!("WebSocket write failed: {}", e);
                    return;
                }
            }
            // Outbound queue closed: the transport was dropped.
            let _ = sink.send(WsMessage::Close(None)).await;
        });

        let reader = tokio::spawn(async move {
            while let Some(frame) = source.next().await {
                let text = match frame {
                    Ok(WsMessage::Text(text)) => text,
                    Ok(WsMessage::Binary(bytes)) => match String::from_utf8(bytes) {
                        Ok(text) => text,
                        Err(_) => {
                            tracing::debug!("Dropping non-UTF-8 binary frame");
                            continue;
                        }
                    },
                    Ok(WsMessage::Close(_)) => break,
                    // Ping/Pong are answered by tungstenite itself.
                    Ok(_) => continue,
                    Err(e) => {
                        tracing::debug!("WebSocket read failed: {}", e);
                        break;
                    }
                };
                if inbound_tx.send(text).is_err() {
                    break;
                }
            }
        });

        Self {
            outbound_tx,
            inbound_rx: Arc::new(Mutex::new(inbound_rx)),
            reader,
        }
    }
}

impl Drop for WebSocketTransport {
    fn drop(&mut self) {
        self.reader.abort();
    }
}

#[async_trait::async_trait]
impl Transport for WebSocketTransport {
    async fn send(&self, message: String) -> Result<()> {
        self.outbound_tx.try_send(message).map_err(|e| {
            let reason = match e {
                TrySendError::Full(_) => "WebSocket outbound queue is full",
                TrySendError::Closed(_) => "WebSocket writer has exited",
            };
            DocrelayError::Transport(reason.to_string())
        })?;
        Ok(())
    }

    fn receive(&self) -> Pin<Box<dyn Stream<Item = String> + Send + '_>> {
        let rx = Arc::clone(&self.inbound_rx);
        Box::pin(futures::stream::unfold(rx, |rx| async move {
            let mut guard = rx.lock().await;
            let item = guard.recv().await?;
            drop(guard);
            Some((item, rx))
        }))
    }
}

/// [`Connector`] that opens a [`WebSocketTransport`] to a fixed URL.
#[derive(Debug, Clone)]
pub struct WebSocketConnector {
    url: String,
}

impl WebSocketConnector {
    /// Create a connector for `url`.
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

#[async_trait::async_trait]
impl Connector for WebSocketConnector {
    async fn connect(&self) -> Result<Arc<dyn Transport>> {
        let transport = WebSocketTransport::connect(&self.url).await?;
        Ok(Arc::new(transport))
    }

    fn endpoint(&self) -> String {
        self.url.clone()
    }
}
