//! Broadcast hub
//!
//! Tracks the transports of every connected client and fans `update`
//! notifications out to all of them. Delivery is best effort: a transport
//! whose write fails is dropped from the set and the remaining transports
//! still receive the message.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::Result;
use crate::protocol::{encode, Message};
use crate::transport::Transport;

/// Identifies one accepted connection.
pub type ConnectionId = Uuid;

/// The set of currently connected transports.
#[derive(Debug, Clone, Default)]
pub struct BroadcastHub {
    connections: Arc<RwLock<HashMap<ConnectionId, Arc<dyn Transport>>>>,
}

impl BroadcastHub {
    /// Create an empty hub.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a transport and return the id it is tracked under.
    pub async fn join(&self, transport: Arc<dyn Transport>) -> ConnectionId {
        let id = Uuid::new_v4();
        let mut connections = self.connections.write().await;
        connections.insert(id, transport);
        tracing::info!(connection = %id, total = connections.len(), "Client joined");
        id
    }

    /// Remove a transport. Returns `false` if it was not present.
    pub async fn leave(&self, id: ConnectionId) -> bool {
        let mut connections = self.connections.write().await;
        let removed = connections.remove(&id).is_some();
        if removed {
            tracing::info!(connection = %id, total = connections.len(), "Client left");
        }
        removed
    }

    /// Number of connected transports.
    pub async fn len(&self) -> usize {
        self.connections.read().await.len()
    }

    /// Whether no transports are connected.
    pub async fn is_empty(&self) -> bool {
        self.connections.read().await.is_empty()
    }

    /// Send `Notification{method: "update", params: payload}` to every
    /// connected transport.
    ///
    /// Returns the number of transports the message was written to. Transports
    /// that fail the write are removed.
    ///
    /// # Errors
    ///
    /// Returns an error only if the notification cannot be encoded.
    pub async fn broadcast(&self, payload: Value) -> Result<usize> {
        let text = encode(&Message::update(payload))?;

        // Write outside the lock so joins and leaves are never held up by a
        // slow socket.
        let targets: Vec<(ConnectionId, Arc<dyn Transport>)> = self
            .connections
            .read()
            .await
            .iter()
            .map(|(id, transport)| (*id, Arc::clone(transport)))
            .collect();

        let outcomes = futures::future::join_all(targets.into_iter().map(|(id, transport)| {
            let text = text.clone();
            async move { (id, transport.send(text).await) }
        }))
        .await;

        let mut delivered = 0;
        for (id, outcome) in outcomes {
            match outcome {
                Ok(()) => delivered += 1,
                Err(e) => {
                    tracing::warn!(connection = %id, "Dropping client after failed write: {}", e);
                    self.leave(id).await;
                }
            }
        }

        tracing::debug!(delivered, "Broadcast update");
        Ok(delivered)
    }
}
