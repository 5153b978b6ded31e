//! Error types for docrelay
//!
//! This module defines the error taxonomy shared by the server, the client,
//! and the documentation sources, using `thiserror` for ergonomic error
//! handling.

use thiserror::Error;

use crate::protocol::DecodeError;

/// Main error type for docrelay operations
///
/// Protocol-level failures never escalate to process termination: the
/// dispatcher converts them into `Error` messages and the client converts
/// them into rejected requests.
///
/// Variants built with `#[from]` already include their source in the message,
/// so log them with `{}` rather than the alternate `{:#}` chain form.
#[derive(Error, Debug)]
pub enum DocrelayError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Inbound message could not be decoded
    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    /// Transport-level failure (write to a dead socket, closed channel, etc.)
    #[error("Transport error: {0}")]
    Transport(String),

    /// A request was issued while no transport was attached
    #[error("Not connected to server")]
    NotConnected,

    /// No response arrived for a request within its deadline
    #[error("Request timed out: method={method}, id={id}")]
    RequestTimeout {
        /// Method of the request that timed out
        method: String,
        /// Correlation id of the request
        id: u64,
    },

    /// The connection dropped while the request was still pending
    #[error("Connection lost before response to request {id}")]
    ConnectionLost {
        /// Correlation id of the abandoned request
        id: u64,
    },

    /// The server answered a request with an `Error` message
    #[error("Server error: {0}")]
    Remote(String),

    /// Tool parameters are missing or have the wrong type
    #[error("Invalid parameters: {0}")]
    InvalidParams(String),

    /// Unknown documentation source name
    #[error("Invalid source: {0}")]
    InvalidSource(String),

    /// Documentation source failures (API errors, unexpected payloads)
    #[error("Source error: {0}")]
    Source(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// HTTP request errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// WebSocket protocol errors
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
}

/// Result type alias for docrelay operations
///
/// Uses `anyhow::Error` as the error type so call sites can attach context
/// and propagate with `?`; concrete failures are `DocrelayError` values that
/// can be recovered with `downcast_ref`.
pub type Result<T> = anyhow::Result<T>;
