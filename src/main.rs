//! docrelay - documentation search and update relay
//!
#![doc = "docrelay - documentation search and update relay"]
#![doc = "Main entry point for the docrelay application."]

use anyhow::Result;

use docrelay::cli::{Cli, Commands};
use docrelay::commands::{self, client::Query};
use docrelay::config::Config;
use docrelay::logging::{bootstrap_subscriber, init_logging};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let cli = Cli::parse_args();

    // Load and validate configuration; load warnings go through a scoped
    // subscriber until the configured one is installed
    let bootstrap = bootstrap_subscriber(cli.verbose, cli.json_logs)?;
    let config =
        tracing::subscriber::with_default(bootstrap, || Config::load(cli.config_path(), &cli))?;
    config.validate()?;

    // Initialize logging
    init_logging(&config.logging)?;

    // Execute command
    match cli.command {
        Commands::Serve { .. } => {
            tracing::info!("Starting relay server");
            commands::serve::run_serve(config).await
        }
        Commands::Search { query, source } => {
            tracing::debug!("Searching {} for {:?}", source, query);
            commands::client::run_query(config, Query::Search { query, source }).await
        }
        Commands::Updates { source } => {
            commands::client::run_query(config, Query::Updates { source }).await
        }
        Commands::Tools => commands::client::run_query(config, Query::Tools).await,
        Commands::Watch => {
            tracing::info!("Starting watch mode");
            commands::client::run_watch(config).await
        }
    }
}
