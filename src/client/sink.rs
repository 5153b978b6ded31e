//! Notification sinks

use std::sync::Mutex;

use serde_json::Value;

use crate::client::format::{self, UpdateNotice};

/// Receives `update` notifications pushed by the server.
///
/// Called synchronously from the connection's read loop, so implementations
/// should hand slow work off to a task. Implementations must not panic.
pub trait NotificationSink: Send + Sync {
    /// Handle one update payload.
    fn on_update(&self, update: Value);
}

/// Prints every update to stdout.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleSink;

impl NotificationSink for ConsoleSink {
    fn on_update(&self, update: Value) {
        match serde_json::from_value::<UpdateNotice>(update) {
            Ok(notice) => println!("{}\n", format::update_notification(&notice)),
            Err(e) => tracing::warn!("Ignoring malformed update notification: {}", e),
        }
    }
}

/// Stores every update it receives. Useful in tests and embedding.
#[derive(Debug, Default)]
pub struct CollectingSink {
    updates: Mutex<Vec<Value>>,
}

impl CollectingSink {
    /// Create an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Updates received so far.
    pub fn updates(&self) -> Vec<Value> {
        self.updates
            .lock()
            .map(|u| u.clone())
            .unwrap_or_default()
    }
}

impl NotificationSink for CollectingSink {
    fn on_update(&self, update: Value) {
        if let Ok(mut updates) = self.updates.lock() {
            updates.push(update);
        }
    }
}
