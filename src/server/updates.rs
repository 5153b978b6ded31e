//! Periodic update check
//!
//! On a fixed interval the server asks every source for its latest activity
//! and pushes the combined snapshot to all connected clients. A failed check
//! is logged and skipped; the next tick tries again.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::error::Result;
use crate::server::hub::BroadcastHub;
use crate::sources::{SourceKind, Sources, UpdateBatch};

/// Payload of every `update` notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSnapshot {
    /// Latest activity of the GitHub source.
    pub github: UpdateBatch,
    /// Latest activity of the docs source.
    pub docs: UpdateBatch,
    /// When the sources were queried.
    pub checked_at: DateTime<Utc>,
}

/// Queries sources and broadcasts the result.
#[derive(Debug, Clone)]
pub struct UpdateChecker {
    sources: Sources,
    hub: BroadcastHub,
    interval: Duration,
}

impl UpdateChecker {
    /// Create a checker that runs every `interval`.
    pub fn new(sources: Sources, hub: BroadcastHub, interval: Duration) -> Self {
        Self {
            sources,
            hub,
            interval,
        }
    }

    /// Query every source concurrently.
    ///
    /// # Errors
    ///
    /// Returns the first source failure.
    pub async fn snapshot(&self) -> Result<UpdateSnapshot> {
        let github = self.sources.get(SourceKind::Github);
        let docs = self.sources.get(SourceKind::Docs);
        let (github, docs) = futures::try_join!(github.latest_updates(), docs.latest_updates())?;
        Ok(UpdateSnapshot {
            github,
            docs,
            checked_at: Utc::now(),
        })
    }

    /// Take one snapshot and broadcast it. Returns the number of clients
    /// reached.
    ///
    /// # Errors
    ///
    /// Returns an error if a source fails or the snapshot cannot be encoded.
    pub async fn check_once(&self) -> Result<usize> {
        let snapshot = self.snapshot().await?;
        self.hub.broadcast(serde_json::to_value(&snapshot)?).await
    }

    /// Check every interval until `cancel` fires. The first check happens one
    /// interval after the call.
    pub async fn run(self, cancel: CancellationToken) {
        let mut ticker = interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tracing::info!(interval_secs = self.interval.as_secs(), "Update checks scheduled");

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    match self.check_once().await {
                        Ok(delivered) => tracing::debug!(delivered, "Update check complete"),
                        Err(e) => tracing::warn!("Error fetching updates: {}", e),
                    }
                }
            }
        }
        tracing::debug!("Update checks stopped");
    }

    /// Run [`Self::run`] on a background task.
    pub fn spawn(self, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(self.run(cancel))
    }
}
