//! Transport abstraction and implementations
//!
//! This module defines the [`Transport`] trait that every connection
//! satisfies, on both sides of the protocol, and the [`Connector`] trait the
//! client supervisor uses to open fresh transports. Concrete implementations
//! live in submodules:
//!
//! - [`websocket::WebSocketTransport`] -- one WebSocket text frame per
//!   message, used by the server for accepted sockets and by the client for
//!   outgoing connections.
//! - [`fake::FakeTransport`] -- in-process fake used in tests (cfg(test)
//!   only).
//!
//! # Design
//!
//! Callers `send` a serialized message string and `receive` a stream of
//! serialized message strings (one per logical message). The stream ends when
//! the peer disconnects; a failed `send` means the connection is dead.

use std::pin::Pin;
use std::sync::Arc;

use futures::Stream;

use crate::error::Result;

/// A bidirectional, message-oriented connection to one peer.
///
/// Used polymorphically through `Arc<dyn Transport>` so that the broadcast
/// hub, the dispatcher tasks, and the client can share a connection.
#[async_trait::async_trait]
pub trait Transport: Send + Sync + std::fmt::Debug {
    /// Send one complete serialized message to the peer.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::DocrelayError::Transport`] if the connection
    /// is no longer writable.
    async fn send(&self, message: String) -> Result<()>;

    /// Returns a stream of inbound serialized messages.
    ///
    /// The stream ends when the transport is closed or the remote peer
    /// disconnects.
    fn receive(&self) -> Pin<Box<dyn Stream<Item = String> + Send + '_>>;
}

/// Opens new transports to a fixed endpoint.
///
/// The reconnect supervisor calls [`Connector::connect`] once per connection
/// attempt.
#[async_trait::async_trait]
pub trait Connector: Send + Sync {
    /// Open a new connection.
    ///
    /// # Errors
    ///
    /// Returns an error if the endpoint is unreachable or the handshake fails.
    async fn connect(&self) -> Result<Arc<dyn Transport>>;

    /// Human-readable endpoint description for logs.
    fn endpoint(&self) -> String;
}

pub mod websocket;

#[cfg(test)]
pub mod fake;

pub use websocket::{WebSocketConnector, WebSocketTransport};
