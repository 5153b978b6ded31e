//! Documentation relay server
//!
//! A [`Server`] owns the tool registry (through its [`Dispatcher`]) and the
//! set of connected clients (its [`BroadcastHub`]). Every accepted WebSocket
//! connection gets its own task; every inbound message on it is dispatched on
//! a further task, so a slow tool never holds up other requests.

pub mod dispatcher;
pub mod hub;
pub mod registry;
pub mod tools;
pub mod updates;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;

use crate::config::ServerConfig;
use crate::error::{DocrelayError, Result};
use crate::protocol::encode;
use crate::sources::Sources;
use crate::transport::{Transport, WebSocketTransport};

pub use dispatcher::Dispatcher;
pub use hub::{BroadcastHub, ConnectionId};
pub use registry::{ToolDescriptor, ToolHandler, ToolRegistry};
pub use tools::default_registry;
pub use updates::{UpdateChecker, UpdateSnapshot};

/// WebSocket server for the relay protocol.
#[derive(Debug, Clone)]
pub struct Server {
    dispatcher: Dispatcher,
    hub: BroadcastHub,
}

impl Server {
    /// Create a server exposing the tools in `registry`.
    pub fn new(registry: ToolRegistry) -> Self {
        Self {
            dispatcher: Dispatcher::new(Arc::new(registry)),
            hub: BroadcastHub::new(),
        }
    }

    /// The set of connected clients.
    pub fn hub(&self) -> &BroadcastHub {
        &self.hub
    }

    /// The request dispatcher.
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Accept connections on `listener` until `cancel` fires.
    ///
    /// A failed accept (descriptor exhaustion, a connection reset before it
    /// was taken) is logged and retried after [`ACCEPT_BACKOFF`].
    ///
    /// # Errors
    ///
    /// Currently always returns `Ok(())` once cancelled.
    pub async fn serve(&self, listener: TcpListener, cancel: CancellationToken) -> Result<()> {
        if let Ok(addr) = listener.local_addr() {
            tracing::info!("Docs relay server listening on {}", addr);
        }

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Server shutting down");
                    return Ok(());
                }
                accepted = listener.accept() => {
                    let Some((tcp, peer)) = accept_or_back_off(accepted).await else {
                        continue;
                    };
                    let server = self.clone();
                    let cancel = cancel.child_token();
                    tokio::spawn(async move {
                        server.handle_connection(tcp, peer, cancel).await;
                    });
                }
            }
        }
    }

    async fn handle_connection(
        &self,
        tcp: TcpStream,
        peer: SocketAddr,
        cancel: CancellationToken,
    ) {
        let ws = match tokio_tungstenite::accept_async(tcp).await {
            Ok(ws) => ws,
            Err(e) => {
                tracing::warn!("WebSocket handshake with {} failed: {}", peer, e);
                return;
            }
        };

        let transport: Arc<dyn Transport> = Arc::new(WebSocketTransport::from_stream(ws));
        let id = self.hub.join(Arc::clone(&transport)).await;
        tracing::debug!(connection = %id, %peer, "Connection accepted");

        let mut inbound = transport.receive();
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                next = inbound.next() => match next {
                    Some(text) => self.spawn_dispatch(text, Arc::clone(&transport)),
                    None => break,
                },
            }
        }

        self.hub.leave(id).await;
    }

    fn spawn_dispatch(&self, text: String, transport: Arc<dyn Transport>) {
        let dispatcher = self.dispatcher.clone();
        tokio::spawn(async move {
            let Some(reply) = dispatcher.handle(&text).await else {
                return;
            };
            match encode(&reply) {
                Ok(encoded) => {
                    if let Err(e) = transport.send(encoded).await {
                        tracing::debug!("Reply not delivered: {}", e);
                    }
                }
                Err(e) => tracing::warn!("Failed to encode reply: {}", e),
            }
        });
    }
}

/// Pause after a failed accept before trying again.
pub const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

async fn accept_or_back_off(
    accepted: std::io::Result<(TcpStream, SocketAddr)>,
) -> Option<(TcpStream, SocketAddr)> {
    match accepted {
        Ok(pair) => Some(pair),
        Err(e) => {
            tracing::warn!("Failed to accept connection: {}", e);
            tokio::time::sleep(ACCEPT_BACKOFF).await;
            None
        }
    }
}

/// Bind the configured address, start the periodic update check, and serve
/// the default tools until `cancel` fires.
///
/// # Errors
///
/// Returns an error if the address cannot be bound or accepting fails.
pub async fn run(config: &ServerConfig, sources: Sources, cancel: CancellationToken) -> Result<()> {
    let addr = format!("{}:{}", config.host, config.port);
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| DocrelayError::Config(format!("Cannot listen on {addr}: {e}")))?;

    let server = Server::new(default_registry(sources.clone()));
    let checker = UpdateChecker::new(
        sources,
        server.hub().clone(),
        Duration::from_secs(config.update_interval_secs),
    );
    let updates = checker.spawn(cancel.clone());

    let result = server.serve(listener, cancel.clone()).await;
    cancel.cancel();
    let _ = updates.await;
    result
}
