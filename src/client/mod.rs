//! Relay client
//!
//! - [`ClientConnection`] issues requests, tracks them until their replies
//!   arrive, and forwards `update` notifications to a [`NotificationSink`].
//! - [`ReconnectSupervisor`] keeps the connection attached to a live
//!   transport, re-initializing after every reconnect.
//! - [`format`] renders results for people.

pub mod connection;
pub mod format;
pub mod sink;
pub mod supervisor;

use std::sync::Arc;
use std::time::Duration;

use crate::config::ClientConfig;
use crate::transport::WebSocketConnector;

pub use connection::{ClientConnection, ConnectionOptions, PendingPolicy};
pub use sink::{CollectingSink, ConsoleSink, NotificationSink};
pub use supervisor::{ConnectionState, ReconnectSupervisor};

/// Build a WebSocket-backed supervisor from configuration.
pub fn supervisor_from_config(config: &ClientConfig) -> Arc<ReconnectSupervisor> {
    let connection = Arc::new(ClientConnection::new(ConnectionOptions {
        request_timeout: config.request_timeout(),
        pending_policy: config.pending_policy,
    }));
    Arc::new(ReconnectSupervisor::new(
        Arc::new(WebSocketConnector::new(config.url.clone())),
        connection,
        Duration::from_secs(config.reconnect_delay_secs),
    ))
}
