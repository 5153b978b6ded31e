//! Client connection and pending-request table
//!
//! A [`ClientConnection`] outlives individual transports: the reconnect
//! supervisor attaches a fresh transport after every (re)connect and detaches
//! it when the socket closes. The correlation id counter and the pending
//! table belong to the connection, so ids keep increasing across reconnects
//! and never repeat.
//!
//! # Request lifecycle
//!
//! 1. Allocate the next id (starting at 1).
//! 2. Register a `oneshot` sender under that id, before anything is written.
//! 3. Encode and write the `Request`.
//! 4. Wait for the read loop to resolve the entry via [`ClientConnection::handle_inbound`].
//!
//! An entry is removed exactly once: when its `Response`/`Error` arrives, when
//! its timeout expires, when the write fails, or when the transport closes
//! under [`PendingPolicy::FailOnDisconnect`]. Replies with no entry are
//! dropped.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::{oneshot, Mutex, RwLock};

use crate::client::sink::NotificationSink;
use crate::error::{DocrelayError, Result};
use crate::protocol::{
    decode, encode, ExecuteToolParams, InitializeResult, Message, METHOD_EXECUTE_TOOL,
    METHOD_INITIALIZE, METHOD_LIST_TOOLS, NOTIF_UPDATE,
};
use crate::server::dispatcher::ListToolsResult;
use crate::server::registry::ToolDefinition;
use crate::server::tools::{TOOL_LATEST_UPDATES, TOOL_SEARCH_DOCS};
use crate::sources::{SearchResults, SourceKind, UpdateBatch};
use crate::transport::Transport;

/// Default deadline for a single request.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Maps request id to the sender that completes the waiting call.
type PendingMap = HashMap<u64, oneshot::Sender<std::result::Result<Value, String>>>;

/// What happens to in-flight requests when the transport closes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PendingPolicy {
    /// Reject every pending request with `ConnectionLost`.
    #[default]
    FailOnDisconnect,
    /// Keep pending requests; a reply on the next connection still resolves
    /// them, otherwise only their timeout does.
    Retain,
}

/// Tunables for a [`ClientConnection`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionOptions {
    /// Per-request deadline; `None` waits forever.
    pub request_timeout: Option<Duration>,
    /// Disconnect behaviour for pending requests.
    pub pending_policy: PendingPolicy,
}

impl Default for ConnectionOptions {
    fn default() -> Self {
        Self {
            request_timeout: Some(DEFAULT_REQUEST_TIMEOUT),
            pending_policy: PendingPolicy::default(),
        }
    }
}

/// Client side of the relay protocol.
///
/// # Examples
///
/// ```
/// use docrelay::client::{ClientConnection, ConnectionOptions};
///
/// # #[tokio::main]
/// # async fn main() {
/// let connection = ClientConnection::new(ConnectionOptions::default());
/// // No transport attached yet.
/// assert!(connection.list_tools().await.is_err());
/// # }
/// ```
pub struct ClientConnection {
    next_id: AtomicU64,
    pending: Mutex<PendingMap>,
    transport: RwLock<Option<Arc<dyn Transport>>>,
    sink: OnceLock<Arc<dyn NotificationSink>>,
    options: ConnectionOptions,
}

impl std::fmt::Debug for ClientConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConnection")
            .field("next_id", &self.next_id.load(Ordering::Relaxed))
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl ClientConnection {
    /// Create a detached connection.
    pub fn new(options: ConnectionOptions) -> Self {
        Self {
            next_id: AtomicU64::new(1),
            pending: Mutex::new(HashMap::new()),
            transport: RwLock::new(None),
            sink: OnceLock::new(),
            options,
        }
    }

    /// Connection tunables.
    pub fn options(&self) -> ConnectionOptions {
        self.options
    }

    /// Install the notification sink. Only the first call takes effect.
    ///
    /// # Errors
    ///
    /// Returns [`DocrelayError::Config`] if a sink is already installed.
    pub fn set_notification_sink(&self, sink: Arc<dyn NotificationSink>) -> Result<()> {
        self.sink
            .set(sink)
            .map_err(|_| DocrelayError::Config("notification sink already set".to_string()))?;
        Ok(())
    }

    /// Route future requests over `transport`.
    pub async fn attach(&self, transport: Arc<dyn Transport>) {
        *self.transport.write().await = Some(transport);
    }

    /// Stop using the current transport and apply the [`PendingPolicy`].
    ///
    /// Returns the number of pending requests that were failed.
    pub async fn detach(&self) -> usize {
        self.transport.write().await.take();
        match self.options.pending_policy {
            PendingPolicy::FailOnDisconnect => self.fail_all_pending().await,
            PendingPolicy::Retain => 0,
        }
    }

    /// Whether a transport is attached.
    pub async fn is_connected(&self) -> bool {
        self.transport.read().await.is_some()
    }

    /// Number of requests awaiting a reply.
    pub async fn pending_count(&self) -> usize {
        self.pending.lock().await.len()
    }

    /// Reject every pending request with `ConnectionLost`. Returns how many
    /// were pending.
    pub async fn fail_all_pending(&self) -> usize {
        let mut pending = self.pending.lock().await;
        let failed = pending.len();
        // Dropping the senders wakes each waiter with a receive error.
        pending.clear();
        if failed > 0 {
            tracing::debug!(failed, "Failed pending requests after disconnect");
        }
        failed
    }

    /// Send a request and wait for its result.
    ///
    /// # Errors
    ///
    /// - [`DocrelayError::NotConnected`] if no transport is attached.
    /// - [`DocrelayError::Transport`] if the write fails.
    /// - [`DocrelayError::RequestTimeout`] if the deadline passes.
    /// - [`DocrelayError::ConnectionLost`] if the transport closed first.
    /// - [`DocrelayError::Remote`] if the server replied with an `Error`.
    pub async fn request(&self, method: &str, params: Value) -> Result<Value> {
        let (transport, id, rx) = {
            // Held across the insert: a concurrent detach either runs first
            // and we fail here, or runs after and sees the entry.
            let attached = self.transport.read().await;
            let transport = attached.clone().ok_or(DocrelayError::NotConnected)?;
            let id = self.next_id.fetch_add(1, Ordering::SeqCst);
            let (tx, rx) = oneshot::channel();
            self.pending.lock().await.insert(id, tx);
            (transport, id, rx)
        };

        let sent = match encode(&Message::request(id, method, params)) {
            Ok(text) => transport.send(text).await,
            Err(e) => Err(e),
        };
        if let Err(e) = sent {
            self.pending.lock().await.remove(&id);
            return Err(e);
        }
        tracing::trace!(id, method, "Request sent");

        let outcome = match self.options.request_timeout {
            Some(deadline) => match tokio::time::timeout(deadline, rx).await {
                Ok(outcome) => outcome,
                Err(_) => {
                    self.pending.lock().await.remove(&id);
                    return Err(DocrelayError::RequestTimeout {
                        method: method.to_string(),
                        id,
                    }
                    .into());
                }
            },
            None => rx.await,
        };

        match outcome {
            Ok(Ok(result)) => Ok(result),
            Ok(Err(message)) => Err(DocrelayError::Remote(message).into()),
            Err(_) => Err(DocrelayError::ConnectionLost { id }.into()),
        }
    }

    async fn request_typed<R: DeserializeOwned>(&self, method: &str, params: Value) -> Result<R> {
        let value = self.request(method, params).await?;
        serde_json::from_value(value).map_err(|e| DocrelayError::Serialization(e).into())
    }

    /// Perform the `initialize` handshake.
    ///
    /// # Errors
    ///
    /// See [`Self::request`].
    pub async fn initialize(&self) -> Result<InitializeResult> {
        self.request_typed(METHOD_INITIALIZE, serde_json::json!({}))
            .await
    }

    /// Fetch the server's tool definitions.
    ///
    /// # Errors
    ///
    /// See [`Self::request`].
    pub async fn list_tools(&self) -> Result<Vec<ToolDefinition>> {
        let result: ListToolsResult = self
            .request_typed(METHOD_LIST_TOOLS, serde_json::json!({}))
            .await?;
        Ok(result.tools)
    }

    /// Run a tool and return its raw result.
    ///
    /// # Errors
    ///
    /// See [`Self::request`].
    pub async fn execute_tool(&self, tool: &str, parameters: Value) -> Result<Value> {
        let params = ExecuteToolParams {
            tool: tool.to_string(),
            parameters,
        };
        self.request(METHOD_EXECUTE_TOOL, serde_json::to_value(params)?)
            .await
    }

    /// Search one documentation source.
    ///
    /// # Errors
    ///
    /// See [`Self::request`].
    pub async fn search_docs(&self, query: &str, source: SourceKind) -> Result<SearchResults> {
        let value = self
            .execute_tool(
                TOOL_SEARCH_DOCS,
                serde_json::json!({ "query": query, "source": source }),
            )
            .await?;
        Ok(serde_json::from_value(value)?)
    }

    /// Fetch one source's recent activity.
    ///
    /// # Errors
    ///
    /// See [`Self::request`].
    pub async fn latest_updates(&self, source: SourceKind) -> Result<UpdateBatch> {
        let value = self
            .execute_tool(TOOL_LATEST_UPDATES, serde_json::json!({ "source": source }))
            .await?;
        Ok(serde_json::from_value(value)?)
    }

    /// Process one raw message from the server.
    pub async fn handle_inbound(&self, raw: &str) {
        let message = match decode(raw) {
            Ok(message) => message,
            Err(e) => {
                tracing::debug!("Dropping undecodable server message: {}", e);
                return;
            }
        };

        match message {
            Message::Response { id, result } => self.resolve(id, Ok(result)).await,
            Message::Error {
                id: Some(id),
                error,
            } => self.resolve(id, Err(error.message)).await,
            Message::Error { id: None, error } => {
                tracing::warn!("Server rejected a message: {}", error.message);
            }
            Message::Notification { method, params } => {
                if method != NOTIF_UPDATE {
                    tracing::debug!(method = %method, "Ignoring unknown notification");
                    return;
                }
                if let Some(sink) = self.sink.get() {
                    sink.on_update(params);
                }
            }
            Message::Request { id, method, .. } => {
                tracing::debug!(id, method = %method, "Ignoring server-initiated request");
            }
        }
    }

    async fn resolve(&self, id: u64, outcome: std::result::Result<Value, String>) {
        let sender = self.pending.lock().await.remove(&id);
        match sender {
            Some(tx) => {
                // The waiter may already have given up.
                let _ = tx.send(outcome);
            }
            None => tracing::debug!(id, "Dropping reply with no pending request"),
        }
    }
}
