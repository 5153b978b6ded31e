//! Reconnect supervisor
//!
//! Owns the transport lifecycle of a [`ClientConnection`]:
//!
//! ```text
//! Disconnected -> Connecting -> Connected -> Disconnected -> ...
//!       ^             |
//!       +-- failed ---+
//! ```
//!
//! After every successful connect the supervisor attaches the transport,
//! fires an `initialize` request without waiting for it, and pumps inbound
//! messages into the connection until the stream ends. After every
//! disconnect or failed connect it waits a fixed delay and tries again,
//! forever, until cancelled.

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::client::connection::ClientConnection;
use crate::error::{DocrelayError, Result};
use crate::transport::Connector;

/// Default pause between connection attempts.
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Connection lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No transport; waiting to (re)connect.
    Disconnected,
    /// A connection attempt is in progress.
    Connecting,
    /// A transport is attached.
    Connected,
}

/// Keeps a [`ClientConnection`] connected.
pub struct ReconnectSupervisor {
    connector: Arc<dyn Connector>,
    connection: Arc<ClientConnection>,
    reconnect_delay: Duration,
    state: watch::Sender<ConnectionState>,
}

impl std::fmt::Debug for ReconnectSupervisor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReconnectSupervisor")
            .field("endpoint", &self.connector.endpoint())
            .field("reconnect_delay", &self.reconnect_delay)
            .field("state", &*self.state.borrow())
            .finish_non_exhaustive()
    }
}

impl ReconnectSupervisor {
    /// Create a supervisor; nothing happens until [`Self::spawn`] or
    /// [`Self::run`].
    pub fn new(
        connector: Arc<dyn Connector>,
        connection: Arc<ClientConnection>,
        reconnect_delay: Duration,
    ) -> Self {
        let (state, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            connector,
            connection,
            reconnect_delay,
            state,
        }
    }

    /// The supervised connection.
    pub fn connection(&self) -> Arc<ClientConnection> {
        Arc::clone(&self.connection)
    }

    /// Current state.
    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Watch state transitions.
    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    /// Wait until the state is [`ConnectionState::Connected`].
    ///
    /// # Errors
    ///
    /// Returns [`DocrelayError::NotConnected`] if `timeout` passes first.
    pub async fn wait_connected(&self, timeout: Duration) -> Result<()> {
        let mut rx = self.state.subscribe();
        let wait = rx.wait_for(|s| *s == ConnectionState::Connected);
        let connected = matches!(tokio::time::timeout(timeout, wait).await, Ok(Ok(_)));

        if connected {
            Ok(())
        } else {
            Err(DocrelayError::NotConnected.into())
        }
    }

    fn set_state(&self, state: ConnectionState) {
        self.state.send_replace(state);
    }

    /// Run the connect/pump/retry loop until `cancel` fires.
    pub async fn run(self: Arc<Self>, cancel: CancellationToken) {
        let endpoint = self.connector.endpoint();

        loop {
            self.set_state(ConnectionState::Connecting);
            let attempt = tokio::select! {
                _ = cancel.cancelled() => break,
                attempt = self.connector.connect() => attempt,
            };

            match attempt {
                Ok(transport) => {
                    self.connection.attach(Arc::clone(&transport)).await;
                    self.set_state(ConnectionState::Connected);
                    tracing::info!("Connected to {}", endpoint);

                    let connection = Arc::clone(&self.connection);
                    tokio::spawn(async move {
                        if let Err(e) = connection.initialize().await {
                            tracing::warn!("Initialize failed: {}", e);
                        }
                    });

                    let mut stopping = false;
                    {
                        let mut inbound = transport.receive();
                        loop {
                            tokio::select! {
                                _ = cancel.cancelled() => {
                                    stopping = true;
                                    break;
                                }
                                next = inbound.next() => match next {
                                    Some(text) => self.connection.handle_inbound(&text).await,
                                    None => break,
                                },
                            }
                        }
                    }

                    let failed = self.connection.detach().await;
                    self.set_state(ConnectionState::Disconnected);
                    tracing::info!(failed_requests = failed, "Disconnected from {}", endpoint);
                    if stopping {
                        break;
                    }
                }
                Err(e) => {
                    self.set_state(ConnectionState::Disconnected);
                    tracing::warn!("Failed to connect to {}: {}", endpoint, e);
                }
            }

            tracing::debug!(
                delay_ms = self.reconnect_delay.as_millis() as u64,
                "Scheduling reconnect"
            );
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(self.reconnect_delay) => {}
            }
        }

        self.set_state(ConnectionState::Disconnected);
        tracing::debug!("Supervisor stopped");
    }

    /// Run [`Self::run`] on a background task.
    pub fn spawn(self: &Arc<Self>, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(Arc::clone(self).run(cancel))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::connection::{ConnectionOptions, PendingPolicy};
    use crate::transport::fake::{FakeConnector, FakeTransportHandle};
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};

    const DELAY: Duration = Duration::from_millis(100);
    const WAIT: Duration = Duration::from_secs(5);

    fn supervisor(
        failures: usize,
        options: ConnectionOptions,
    ) -> (
        Arc<ReconnectSupervisor>,
        tokio::sync::mpsc::UnboundedReceiver<FakeTransportHandle>,
        Arc<AtomicUsize>,
    ) {
        let (connector, handles) = FakeConnector::new(failures);
        let attempts = connector.attempts();
        let connection = Arc::new(ClientConnection::new(options));
        let sup = Arc::new(ReconnectSupervisor::new(
            Arc::new(connector),
            connection,
            DELAY,
        ));
        (sup, handles, attempts)
    }

    async fn answer_initialize(handle: &mut FakeTransportHandle) -> u64 {
        let init = handle.next_sent().await;
        assert_eq!(init["method"], "initialize");
        let id = init["id"].as_u64().unwrap();
        let capabilities = json!({"tools": true, "resources": true, "notifications": true});
        let result = json!({"capabilities": capabilities});
        handle.inject(json!({"id": id, "type": "response", "result": result}));
        id
    }

    fn spawn_request(sup: &ReconnectSupervisor) -> JoinHandle<crate::error::Result<Value>> {
        let connection = sup.connection();
        tokio::spawn(async move { connection.request("listTools", json!({})).await })
    }

    #[tokio::test]
    async fn test_connects_and_initializes() {
        let (sup, mut handles, _attempts) = supervisor(0, ConnectionOptions::default());
        let cancel = CancellationToken::new();
        let task = sup.spawn(cancel.clone());

        let mut handle = handles.recv().await.unwrap();
        sup.wait_connected(WAIT).await.unwrap();
        assert_eq!(answer_initialize(&mut handle).await, 1);

        cancel.cancel();
        task.await.unwrap();
        assert_eq!(sup.state(), ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn test_wait_connected_times_out_when_never_connected() {
        let (sup, _handles, attempts) = supervisor(0, ConnectionOptions::default());

        let err = sup
            .wait_connected(Duration::from_millis(50))
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<DocrelayError>(),
            Some(DocrelayError::NotConnected)
        ));
        assert_eq!(attempts.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_retries_after_failed_connect() {
        let (sup, mut handles, attempts) = supervisor(2, ConnectionOptions::default());
        let cancel = CancellationToken::new();
        let _task = sup.spawn(cancel.clone());

        let _handle = tokio::time::timeout(WAIT, handles.recv())
            .await
            .expect("never connected")
            .unwrap();
        sup.wait_connected(WAIT).await.unwrap();
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
        cancel.cancel();
    }

    #[tokio::test]
    async fn test_pending_requests_survive_reconnect_when_retained() {
        let options = ConnectionOptions {
            request_timeout: None,
            pending_policy: PendingPolicy::Retain,
        };
        let (sup, mut handles, _attempts) = supervisor(0, options);
        let cancel = CancellationToken::new();
        let _task = sup.spawn(cancel.clone());

        let mut first = handles.recv().await.unwrap();
        sup.wait_connected(WAIT).await.unwrap();
        answer_initialize(&mut first).await;

        // Ids 2..=4 complete normally.
        for expected in 2..=4u64 {
            let call = spawn_request(&sup);
            let sent = first.next_sent().await;
            assert_eq!(sent["id"], expected);
            first.inject(json!({"id": expected, "type": "response", "result": {}}));
            call.await.unwrap().unwrap();
        }

        // Ids 5 and 6 never get a reply.
        let five = spawn_request(&sup);
        assert_eq!(first.next_sent().await["id"], 5);
        let six = spawn_request(&sup);
        assert_eq!(first.next_sent().await["id"], 6);

        drop(first);

        let mut second = tokio::time::timeout(WAIT, handles.recv())
            .await
            .expect("did not reconnect")
            .unwrap();
        assert_eq!(answer_initialize(&mut second).await, 7);
        sup.wait_connected(WAIT).await.unwrap();

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(sup.connection().pending_count().await, 2);
        assert!(!five.is_finished());
        assert!(!six.is_finished());
        cancel.cancel();
    }

    #[tokio::test]
    async fn test_pending_requests_fail_on_disconnect_by_default() {
        let (sup, mut handles, _attempts) = supervisor(0, ConnectionOptions::default());
        let cancel = CancellationToken::new();
        let _task = sup.spawn(cancel.clone());

        let mut first = handles.recv().await.unwrap();
        sup.wait_connected(WAIT).await.unwrap();
        answer_initialize(&mut first).await;

        let call = spawn_request(&sup);
        assert_eq!(first.next_sent().await["id"], 2);
        drop(first);

        let err = tokio::time::timeout(WAIT, call)
            .await
            .expect("request was not failed")
            .unwrap()
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<DocrelayError>(),
            Some(DocrelayError::ConnectionLost { id: 2 })
        ));

        let mut second = tokio::time::timeout(WAIT, handles.recv())
            .await
            .expect("did not reconnect")
            .unwrap();
        assert_eq!(answer_initialize(&mut second).await, 3);
        cancel.cancel();
    }
}
