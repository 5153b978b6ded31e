//! In-process fake transport for unit tests
//!
//! [`FakeTransport::new`] returns a `(FakeTransport, FakeTransportHandle)`
//! pair. The transport goes into the code under test; the handle stays with
//! the test, which uses it to:
//!
//! - read what the code under test sent: `handle.outbound_rx.recv().await`
//! - inject inbound messages: `handle.inject(json)` or `handle.inbound_tx`
//! - simulate a disconnect: `drop(handle)` ends the `receive()` stream and
//!   makes further `send()` calls fail
//!
//! ```text
//! transport send() --> outbound_tx --> outbound_rx (handle reads)
//! handle inbound_tx --> inbound_rx --> transport receive()
//! ```
//!
//! [`FakeConnector`] hands out a fresh pair on every `connect()` and passes
//! the handle to the test through a channel, which is how the reconnect
//! supervisor is exercised without sockets.

use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use futures::Stream;
use tokio::sync::{mpsc, Mutex};

use crate::error::{DocrelayError, Result};
use crate::transport::{Connector, Transport};

/// In-process fake transport.
#[derive(Debug)]
pub struct FakeTransport {
    outbound_tx: mpsc::UnboundedSender<String>,
    inbound_rx: Arc<Mutex<mpsc::UnboundedReceiver<String>>>,
}

impl FakeTransport {
    /// Create a new `(FakeTransport, FakeTransportHandle)` pair.
    pub fn new() -> (Self, FakeTransportHandle) {
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel::<String>();
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel::<String>();

        let transport = Self {
            outbound_tx,
            inbound_rx: Arc::new(Mutex::new(inbound_rx)),
        };
        let handle = FakeTransportHandle {
            outbound_rx,
            inbound_tx,
        };
        (transport, handle)
    }
}

/// The test-side handle for a [`FakeTransport`].
#[derive(Debug)]
pub struct FakeTransportHandle {
    /// Receives messages the code under test sent via [`Transport::send`].
    pub outbound_rx: mpsc::UnboundedReceiver<String>,
    /// Feeds the transport's [`Transport::receive`] stream.
    pub inbound_tx: mpsc::UnboundedSender<String>,
}

impl FakeTransportHandle {
    /// Serialize `value` and push it onto the inbound stream.
    ///
    /// # Panics
    ///
    /// Panics if the transport side has been dropped.
    pub fn inject(&self, value: serde_json::Value) {
        let serialized =
            serde_json::to_string(&value).expect("FakeTransport: failed to serialize value");
        self.inbound_tx
            .send(serialized)
            .expect("FakeTransport: inbound channel closed before inject");
    }

    /// Wait for the next outbound message and parse it as JSON.
    ///
    /// # Panics
    ///
    /// Panics if nothing is sent within two seconds or the message is not
    /// valid JSON.
    pub async fn next_sent(&mut self) -> serde_json::Value {
        let raw = tokio::time::timeout(std::time::Duration::from_secs(2), self.outbound_rx.recv())
            .await
            .expect("timed out waiting for outbound message")
            .expect("outbound channel closed");
        serde_json::from_str(&raw).expect("outbound message is not JSON")
    }
}

#[async_trait::async_trait]
impl Transport for FakeTransport {
    async fn send(&self, message: String) -> Result<()> {
        self.outbound_tx.send(message).map_err(|e| {
            DocrelayError::Transport(format!("FakeTransport outbound channel closed: {e}"))
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

/// [`Connector`] producing [`FakeTransport`]s.
///
/// The first `failures` calls to `connect()` fail; every later call succeeds
/// and sends the new handle on the channel returned by [`FakeConnector::new`].
#[derive(Debug)]
pub struct FakeConnector {
    handles_tx: mpsc::UnboundedSender<FakeTransportHandle>,
    failures: usize,
    attempts: Arc<AtomicUsize>,
}

impl FakeConnector {
    /// Create a connector whose first `failures` attempts fail.
    pub fn new(failures: usize) -> (Self, mpsc::UnboundedReceiver<FakeTransportHandle>) {
        let (handles_tx, handles_rx) = mpsc::unbounded_channel();
        let connector = Self {
            handles_tx,
            failures,
            attempts: Arc::new(AtomicUsize::new(0)),
        };
        (connector, handles_rx)
    }

    /// Shared counter of `connect()` calls made so far.
    pub fn attempts(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.attempts)
    }
}

#[async_trait::async_trait]
impl Connector for FakeConnector {
    async fn connect(&self) -> Result<Arc<dyn Transport>> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst);
        if attempt < self.failures {
            return Err(DocrelayError::Transport("connection refused".to_string()).into());
        }
        let (transport, handle) = FakeTransport::new();
        self.handles_tx
            .send(handle)
            .map_err(|_| DocrelayError::Transport("test dropped handle receiver".to_string()))?;
        Ok(Arc::new(transport))
    }

    fn endpoint(&self) -> String {
        "fake://".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use futures::StreamExt;

    #[tokio::test]
    async fn test_send_delivers_to_handle_outbound_rx() {
        let (transport, mut handle) = FakeTransport::new();

        transport.send(r#"{"type":"request"}"#.to_string()).await.unwrap();

        let sent = handle.next_sent().await;
        assert_eq!(sent["type"], "request");
    }

    #[tokio::test]
    async fn test_receive_yields_injected_messages_in_order() {
        let (transport, handle) = FakeTransport::new();

        for i in 0u32..3 {
            handle.inject(serde_json::json!({ "n": i }));
        }

        let mut stream = transport.receive();
        for i in 0u32..3 {
            let msg = tokio::time::timeout(Duration::from_secs(2), stream.next())
                .await
                .expect("timed out")
                .expect("stream ended");
            let val: serde_json::Value = serde_json::from_str(&msg).unwrap();
            assert_eq!(val["n"], i);
        }
    }

    #[tokio::test]
    async fn test_dropping_handle_ends_stream_and_fails_send() {
        let (transport, handle) = FakeTransport::new();
        drop(handle);

        let mut stream = transport.receive();
        assert!(stream.next().await.is_none());
        assert!(transport.send("x".to_string()).await.is_err());
    }

    #[tokio::test]
    async fn test_fake_connector_fails_then_succeeds() {
        let (connector, mut handles) = FakeConnector::new(1);

        assert!(connector.connect().await.is_err());
        let transport = connector.connect().await.unwrap();
        let mut handle = handles.recv().await.unwrap();

        transport.send("{}".to_string()).await.unwrap();
        assert_eq!(handle.next_sent().await, serde_json::json!({}));
        assert_eq!(connector.attempts().load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_fake_transport_is_object_safe() {
        let (transport, _handle) = FakeTransport::new();
        let _boxed: Box<dyn Transport> = Box::new(transport);
    }
}
