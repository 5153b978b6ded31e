//! docrelay - documentation search and update relay
//!
//! This library relays documentation-search requests and update
//! notifications between front-end clients and a server that queries
//! documentation sources, over a small request/response/notification
//! protocol carried on WebSocket text frames.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//!
//! - `protocol`: Message shapes, method names, and the codec
//! - `transport`: Transport and connector traits, WebSocket implementation
//! - `server`: Tool registry, dispatcher, broadcast hub, periodic update check
//! - `client`: Pending-request table, reconnect supervisor, result formatting
//! - `sources`: Documentation source providers (GitHub, docs site)
//! - `config`: Configuration management and validation
//! - `logging`: Tracing subscriber setup
//! - `error`: Error types and result aliases
//! - `cli` / `commands`: Command-line interface and handlers
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use docrelay::client::{ClientConnection, ConnectionOptions, ReconnectSupervisor};
//! use docrelay::sources::SourceKind;
//! use docrelay::transport::WebSocketConnector;
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let connection = Arc::new(ClientConnection::new(ConnectionOptions::default()));
//!     let supervisor = Arc::new(ReconnectSupervisor::new(
//!         Arc::new(WebSocketConnector::new("ws://localhost:3000")),
//!         Arc::clone(&connection),
//!         std::time::Duration::from_secs(5),
//!     ));
//!     let _task = supervisor.spawn(CancellationToken::new());
//!     supervisor.wait_connected(std::time::Duration::from_secs(10)).await?;
//!
//!     let results = connection.search_docs("account", SourceKind::Github).await?;
//!     println!("{} matching files", results.docs.len());
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod client;
pub mod commands;
pub mod config;
pub mod error;
pub mod logging;
pub mod protocol;
pub mod server;
pub mod sources;
pub mod transport;

pub use config::Config;
pub use error::{DocrelayError, Result};
