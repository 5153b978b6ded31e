//! Request dispatcher
//!
//! Turns one inbound message into at most one reply:
//!
//! 1. Undecodable input gets `Error{id: null, "Invalid message format"}`.
//! 2. A `request` is routed on its method:
//!    - `initialize` returns the fixed capability descriptor,
//!    - `listTools` returns the registry's definitions,
//!    - `executeTool` runs the named tool and returns its result or failure
//!      text, or `"Tool not found"`,
//!    - anything else gets `"Method not found"`.
//! 3. Other decodable messages (responses, notifications) are ignored.
//!
//! The dispatcher holds no per-connection state, so one instance serves every
//! connection and concurrent calls never block each other.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::protocol::{
    decode, ExecuteToolParams, InitializeResult, Message, Method, ERR_INVALID_MESSAGE,
    ERR_METHOD_NOT_FOUND, ERR_TOOL_NOT_FOUND,
};
use crate::server::registry::{ToolDefinition, ToolRegistry};

/// Result of `listTools`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListToolsResult {
    /// Registered tools in registration order.
    pub tools: Vec<ToolDefinition>,
}

/// Routes decoded requests to protocol methods and tools.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    registry: Arc<ToolRegistry>,
}

impl Dispatcher {
    /// Create a dispatcher over `registry`.
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self { registry }
    }

    /// The registry this dispatcher serves.
    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Handle one raw inbound message, returning the reply to send, if any.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::sync::Arc;
    /// use docrelay::protocol::Message;
    /// use docrelay::server::dispatcher::Dispatcher;
    /// use docrelay::server::registry::ToolRegistry;
    ///
    /// # #[tokio::main]
    /// # async fn main() {
    /// let dispatcher = Dispatcher::new(Arc::new(ToolRegistry::new()));
    /// let reply = dispatcher.handle("not json").await;
    /// assert_eq!(reply, Some(Message::error(None, "Invalid message format")));
    /// # }
    /// ```
    pub async fn handle(&self, raw: &str) -> Option<Message> {
        let message = match decode(raw) {
            Ok(message) => message,
            Err(e) => {
                tracing::debug!("Rejecting inbound message: {}", e);
                return Some(Message::error(None, ERR_INVALID_MESSAGE));
            }
        };

        match message {
            Message::Request { id, method, params } => {
                Some(self.dispatch(id, &method, params).await)
            }
            other => {
                tracing::debug!("Ignoring non-request message: {:?}", other);
                None
            }
        }
    }

    async fn dispatch(&self, id: u64, method: &str, params: Value) -> Message {
        let Some(method) = Method::parse(method) else {
            tracing::debug!(id, method, "Unknown method");
            return Message::error(Some(id), ERR_METHOD_NOT_FOUND);
        };

        tracing::trace!(id, %method, "Dispatching request");
        match method {
            Method::Initialize => reply(id, &InitializeResult::default()),
            Method::ListTools => reply(
                id,
                &ListToolsResult {
                    tools: self.registry.definitions(),
                },
            ),
            Method::ExecuteTool => self.execute_tool(id, params).await,
        }
    }

    async fn execute_tool(&self, id: u64, params: Value) -> Message {
        // A missing or non-string `tool` cannot name a registered tool.
        let params: ExecuteToolParams = match serde_json::from_value(params) {
            Ok(params) => params,
            Err(_) => return Message::error(Some(id), ERR_TOOL_NOT_FOUND),
        };

        let Some(tool) = self.registry.lookup(&params.tool) else {
            tracing::debug!(id, tool = %params.tool, "Tool not found");
            return Message::error(Some(id), ERR_TOOL_NOT_FOUND);
        };

        let handler = tool.handler();
        match handler.call(params.parameters).await {
            Ok(result) => Message::response(id, result),
            Err(e) => {
                tracing::warn!(id, tool = %params.tool, "Tool execution failed: {}", e);
                Message::error(Some(id), e.to_string())
            }
        }
    }
}

fn reply<T: Serialize>(id: u64, result: &T) -> Message {
    match serde_json::to_value(result) {
        Ok(value) => Message::response(id, value),
        Err(e) => Message::error(Some(id), e.to_string()),
    }
}
