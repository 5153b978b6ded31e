//! Wire protocol types
//!
//! Four message shapes travel over every connection, discriminated by the
//! `type` field:
//!
//! ```text
//! { "id": 1,    "type": "request",      "method": "...", "params": {...} }
//! { "id": 1,    "type": "response",     "result": ... }
//! { "id": null, "type": "error",        "error": { "message": "..." } }
//! {             "type": "notification", "method": "update", "params": {...} }
//! ```
//!
//! Requests carry a per-connection correlation id; responses and errors echo
//! it. Notifications are unsolicited server pushes and carry no id.

pub mod codec;

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub use codec::{decode, encode, DecodeError};

// ---------------------------------------------------------------------------
// Method and error-text constants
// ---------------------------------------------------------------------------

/// Handshake issued by the client after every (re)connect.
pub const METHOD_INITIALIZE: &str = "initialize";
/// Enumerate the server's registered tools.
pub const METHOD_LIST_TOOLS: &str = "listTools";
/// Invoke a named tool.
pub const METHOD_EXECUTE_TOOL: &str = "executeTool";
/// Method carried by every server-pushed update notification.
pub const NOTIF_UPDATE: &str = "update";

/// Error text sent (with a null id) when an inbound message cannot be decoded.
pub const ERR_INVALID_MESSAGE: &str = "Invalid message format";
/// Error text sent when `executeTool` names an unregistered tool.
pub const ERR_TOOL_NOT_FOUND: &str = "Tool not found";
/// Error text sent for any method outside [`Method`].
pub const ERR_METHOD_NOT_FOUND: &str = "Method not found";

// ---------------------------------------------------------------------------
// Messages
// ---------------------------------------------------------------------------

/// Body of an `error` message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Human-readable failure reason.
    pub message: String,
}

/// A single protocol message.
///
/// # Examples
///
/// ```
/// use docrelay::protocol::Message;
///
/// let msg = Message::request(1, "listTools", serde_json::json!({}));
/// assert_eq!(msg.id(), Some(1));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Message {
    /// Client-originated call awaiting exactly one `Response` or `Error`.
    Request {
        /// Correlation id, unique and increasing per client connection.
        id: u64,
        /// Method name; see [`Method`].
        method: String,
        /// Method parameters.
        #[serde(default)]
        params: Value,
    },
    /// Successful reply to the request with the same id.
    Response {
        /// Correlation id echoed from the request.
        id: u64,
        /// Method result.
        #[serde(default)]
        result: Value,
    },
    /// Failed reply. `id` is `None` when the request could not be decoded.
    Error {
        /// Correlation id echoed from the request, if known.
        id: Option<u64>,
        /// Failure detail.
        error: ErrorBody,
    },
    /// Unsolicited server push.
    Notification {
        /// Notification method; currently always [`NOTIF_UPDATE`].
        method: String,
        /// Notification payload.
        #[serde(default)]
        params: Value,
    },
}

impl Message {
    /// Build a `Request` message.
    pub fn request(id: u64, method: impl Into<String>, params: Value) -> Self {
        Self::Request {
            id,
            method: method.into(),
            params,
        }
    }

    /// Build a `Response` message.
    pub fn response(id: u64, result: Value) -> Self {
        Self::Response { id, result }
    }

    /// Build an `Error` message.
    pub fn error(id: Option<u64>, message: impl Into<String>) -> Self {
        Self::Error {
            id,
            error: ErrorBody {
                message: message.into(),
            },
        }
    }

    /// Build an `update` notification carrying `params`.
    pub fn update(params: Value) -> Self {
        Self::Notification {
            method: NOTIF_UPDATE.to_string(),
            params,
        }
    }

    /// Correlation id of the message, if it has one.
    pub fn id(&self) -> Option<u64> {
        match self {
            Self::Request { id, .. } | Self::Response { id, .. } => Some(*id),
            Self::Error { id, .. } => *id,
            Self::Notification { .. } => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Methods
// ---------------------------------------------------------------------------

/// Methods the server dispatches.
///
/// Anything else is answered with [`ERR_METHOD_NOT_FOUND`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    /// `initialize`
    Initialize,
    /// `listTools`
    ListTools,
    /// `executeTool`
    ExecuteTool,
}

impl Method {
    /// Map a wire method name to a [`Method`].
    ///
    /// # Examples
    ///
    /// ```
    /// use docrelay::protocol::Method;
    ///
    /// assert_eq!(Method::parse("listTools"), Some(Method::ListTools));
    /// assert_eq!(Method::parse("tools/list"), None);
    /// ```
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            METHOD_INITIALIZE => Some(Self::Initialize),
            METHOD_LIST_TOOLS => Some(Self::ListTools),
            METHOD_EXECUTE_TOOL => Some(Self::ExecuteTool),
            _ => None,
        }
    }

    /// Wire name of the method.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Initialize => METHOD_INITIALIZE,
            Self::ListTools => METHOD_LIST_TOOLS,
            Self::ExecuteTool => METHOD_EXECUTE_TOOL,
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Typed params and results
// ---------------------------------------------------------------------------

/// Parameters of an `executeTool` request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecuteToolParams {
    /// Registered tool name.
    pub tool: String,
    /// Arguments handed to the tool handler.
    #[serde(default)]
    pub parameters: Value,
}

/// Capabilities advertised in the `initialize` response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capabilities {
    /// Server exposes tools.
    pub tools: bool,
    /// Server exposes resources.
    pub resources: bool,
    /// Server pushes notifications.
    pub notifications: bool,
}

impl Default for Capabilities {
    fn default() -> Self {
        Self {
            tools: true,
            resources: true,
            notifications: true,
        }
    }
}

/// Result of the `initialize` handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct InitializeResult {
    /// Fixed capability descriptor.
    pub capabilities: Capabilities,
}
