//! Command-line interface definition for docrelay
//!
//! This module defines the CLI structure using clap's derive API,
//! providing commands for running the relay server and for talking to it.

use clap::{Parser, Subcommand};

use crate::config::DEFAULT_CONFIG_PATH;
use crate::sources::SourceKind;

/// docrelay - documentation search and update relay
///
/// Serves documentation search tools and pushes update notifications over
/// WebSocket, or connects to such a server as a client.
#[derive(Parser, Debug, Clone)]
#[command(name = "docrelay")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Server URL for client commands (ws:// or wss://)
    #[arg(long, global = true)]
    pub url: Option<String>,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub json_logs: bool,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands for docrelay
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Run the relay server
    Serve {
        /// Port to listen on (overrides config and PORT)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Search documentation through a running server
    Search {
        /// Search query
        query: String,

        /// Documentation source
        #[arg(short, long, default_value = "github", value_parser = parse_source)]
        source: SourceKind,
    },

    /// Show recent documentation changes and discussions
    Updates {
        /// Documentation source
        #[arg(short, long, default_value = "github", value_parser = parse_source)]
        source: SourceKind,
    },

    /// List the tools a running server exposes
    Tools,

    /// Stay connected and print every update notification
    Watch,
}

fn parse_source(s: &str) -> std::result::Result<SourceKind, String> {
    s.parse::<SourceKind>().map_err(|e| e.to_string())
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Configuration file to load.
    pub fn config_path(&self) -> &str {
        self.config.as_deref().unwrap_or(DEFAULT_CONFIG_PATH)
    }
}
