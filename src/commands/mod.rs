/*!
Command handlers for the CLI

This module provides command handlers invoked by the CLI entrypoint.

- `serve`  runs the relay server
- `client` runs the one-shot client commands (`search`, `updates`, `tools`)
  and the long-running `watch`
*/

use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::error::Result;

/// How long one-shot client commands wait for the first connection.
const CONNECT_WAIT: Duration = Duration::from_secs(10);

/// Cancel `cancel` when Ctrl-C is pressed.
fn cancel_on_ctrl_c(cancel: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupt received, shutting down");
        }
        cancel.cancel();
    });
}

// Server command handler
pub mod serve {
    //! `docrelay serve`

    use super::*;
    use crate::sources::Sources;

    /// Run the server until Ctrl-C.
    ///
    /// # Errors
    ///
    /// Returns an error if the sources cannot be built or the port cannot be
    /// bound.
    pub async fn run_serve(config: Config) -> Result<()> {
        let sources = Sources::from_config(&config.github)?;
        if config.github.token.is_none() {
            tracing::warn!("GITHUB_TOKEN not set; GitHub requests are unauthenticated");
        }

        let cancel = CancellationToken::new();
        cancel_on_ctrl_c(cancel.clone());
        crate::server::run(&config.server, sources, cancel).await
    }
}

// Client command handlers
pub mod client {
    //! `docrelay search | updates | tools | watch`

    use std::sync::Arc;

    use super::*;
    use crate::client::{format, supervisor_from_config, ClientConnection, ConsoleSink};
    use crate::sources::SourceKind;

    /// One-shot request against the server.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum Query {
        /// Search a source.
        Search {
            /// Search text
            query: String,
            /// Source to search
            source: SourceKind,
        },
        /// Recent activity of a source.
        Updates {
            /// Source to query
            source: SourceKind,
        },
        /// Registered tools.
        Tools,
    }

    async fn perform(connection: &ClientConnection, query: &Query) -> Result<String> {
        Ok(match query {
            Query::Search { query, source } => {
                format::search_results(&connection.search_docs(query, *source).await?)
            }
            Query::Updates { source } => {
                format::latest_updates(&connection.latest_updates(*source).await?)
            }
            Query::Tools => connection
                .list_tools()
                .await?
                .iter()
                .map(|t| format!("{}: {}", t.name, t.description))
                .collect::<Vec<_>>()
                .join("\n"),
        })
    }

    /// Connect, run `query`, print the result, and disconnect.
    ///
    /// # Errors
    ///
    /// Returns an error if the server is unreachable or the request fails.
    pub async fn run_query(config: Config, query: Query) -> Result<()> {
        let supervisor = supervisor_from_config(&config.client);
        let cancel = CancellationToken::new();
        let task = supervisor.spawn(cancel.clone());

        let outcome = match supervisor.wait_connected(CONNECT_WAIT).await {
            Ok(()) => perform(&supervisor.connection(), &query).await,
            Err(e) => Err(e),
        };

        cancel.cancel();
        let _ = task.await;

        println!("{}", outcome?);
        Ok(())
    }

    /// Stay connected and print updates until Ctrl-C.
    ///
    /// # Errors
    ///
    /// Returns an error if the notification sink cannot be installed.
    pub async fn run_watch(config: Config) -> Result<()> {
        let supervisor = supervisor_from_config(&config.client);
        supervisor
            .connection()
            .set_notification_sink(Arc::new(ConsoleSink))?;

        let cancel = CancellationToken::new();
        cancel_on_ctrl_c(cancel.clone());
        tracing::info!("Watching {} for updates", config.client.url);

        let task = supervisor.spawn(cancel);
        let _ = task.await;
        Ok(())
    }
}
