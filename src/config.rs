//! Configuration management for docrelay
//!
//! This module handles loading, parsing, validating, and managing
//! configuration from files, environment variables, and CLI overrides.
//! Precedence, lowest to highest: built-in defaults, YAML file, environment,
//! command line.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::cli::{Cli, Commands};
use crate::client::connection::DEFAULT_REQUEST_TIMEOUT;
use crate::client::supervisor::DEFAULT_RECONNECT_DELAY;
use crate::client::PendingPolicy;
use crate::error::{DocrelayError, Result};

/// Configuration file used when `--config` is not given.
pub const DEFAULT_CONFIG_PATH: &str = "config/docrelay.yaml";

/// Main configuration structure for docrelay
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Server settings
    #[serde(default)]
    pub server: ServerConfig,
    /// Client settings
    #[serde(default)]
    pub client: ClientConfig,
    /// GitHub source settings
    #[serde(default)]
    pub github: GithubConfig,
    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address to bind
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Seconds between periodic update checks
    #[serde(default = "default_update_interval")]
    pub update_interval_secs: u64,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_update_interval() -> u64 {
    300
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            update_interval_secs: default_update_interval(),
        }
    }
}

/// Client configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Server URL (`ws://` or `wss://`)
    #[serde(default = "default_url")]
    pub url: String,

    /// Seconds to wait before reconnecting
    #[serde(default = "default_reconnect_delay")]
    pub reconnect_delay_secs: u64,

    /// Per-request deadline in seconds; `0` waits forever
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// What happens to in-flight requests on disconnect
    #[serde(default)]
    pub pending_policy: PendingPolicy,
}

fn default_url() -> String {
    "ws://localhost:3000".to_string()
}

fn default_reconnect_delay() -> u64 {
    DEFAULT_RECONNECT_DELAY.as_secs()
}

fn default_request_timeout() -> u64 {
    DEFAULT_REQUEST_TIMEOUT.as_secs()
}

impl ClientConfig {
    /// Request deadline, or `None` when disabled.
    pub fn request_timeout(&self) -> Option<Duration> {
        (self.request_timeout_secs > 0).then(|| Duration::from_secs(self.request_timeout_secs))
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            reconnect_delay_secs: default_reconnect_delay(),
            request_timeout_secs: default_request_timeout(),
            pending_policy: PendingPolicy::default(),
        }
    }
}

/// GitHub source configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GithubConfig {
    /// REST/GraphQL API base URL (overridable for tests and GitHub Enterprise)
    #[serde(default = "default_github_api")]
    pub api_base: String,

    /// Repository owner
    #[serde(default = "default_github_owner")]
    pub owner: String,

    /// Repository name
    #[serde(default = "default_github_repo")]
    pub repo: String,

    /// API token; unauthenticated requests are heavily rate limited
    #[serde(default, skip_serializing)]
    pub token: Option<String>,
}

fn default_github_api() -> String {
    "https://api.github.com".to_string()
}

fn default_github_owner() -> String {
    "algorandfoundation".to_string()
}

fn default_github_repo() -> String {
    "docs".to_string()
}

impl Default for GithubConfig {
    fn default() -> Self {
        Self {
            api_base: default_github_api(),
            owner: default_github_owner(),
            repo: default_github_repo(),
            token: None,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level or filter directive (`RUST_LOG` takes precedence)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable text
    #[serde(default)]
    pub json_format: bool,

    /// Also append logs to this file
    #[serde(default)]
    pub file_path: Option<PathBuf>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json_format: false,
            file_path: None,
        }
    }
}

fn env_parsed<T: std::str::FromStr>(name: &str) -> Option<T> {
    let raw = std::env::var(name).ok()?;
    match raw.parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!("Invalid {}: {}", name, raw);
            None
        }
    }
}

fn env_flag(name: &str) -> Option<bool> {
    let raw = std::env::var(name).ok()?;
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => {
            tracing::warn!("Invalid {}: {}", name, raw);
            None
        }
    }
}

impl Config {
    /// Load configuration from file with environment and CLI overrides
    ///
    /// A missing file is not an error: defaults are used and a warning is
    /// logged.
    ///
    /// # Errors
    ///
    /// Returns error if the file exists but cannot be read or parsed
    pub fn load(path: &str, cli: &Cli) -> Result<Self> {
        let mut config = if Path::new(path).exists() {
            Self::from_file(path)?
        } else {
            tracing::warn!("Config file not found at {}, using defaults", path);
            Self::default()
        };

        config.apply_env_vars();
        config.apply_cli_overrides(cli);

        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| DocrelayError::Config(format!("Failed to read config file: {}", e)))?;
        serde_yaml::from_str(&contents)
            .map_err(|e| DocrelayError::Config(format!("Failed to parse config: {}", e)).into())
    }

    fn apply_env_vars(&mut self) {
        // Server overrides. DOCRELAY_PORT wins over the conventional PORT.
        if let Some(port) = env_parsed("PORT") {
            self.server.port = port;
        }
        if let Some(port) = env_parsed("DOCRELAY_PORT") {
            self.server.port = port;
        }
        if let Ok(host) = std::env::var("DOCRELAY_HOST") {
            self.server.host = host;
        }
        if let Some(secs) = env_parsed("DOCRELAY_UPDATE_INTERVAL_SECS") {
            self.server.update_interval_secs = secs;
        }

        // Client overrides
        if let Ok(url) = std::env::var("DOCRELAY_URL") {
            self.client.url = url;
        }
        if let Some(secs) = env_parsed("DOCRELAY_RECONNECT_DELAY_SECS") {
            self.client.reconnect_delay_secs = secs;
        }
        if let Some(secs) = env_parsed("DOCRELAY_REQUEST_TIMEOUT_SECS") {
            self.client.request_timeout_secs = secs;
        }

        // GitHub overrides
        if let Ok(token) = std::env::var("GITHUB_TOKEN") {
            if !token.is_empty() {
                self.github.token = Some(token);
            }
        }
        if let Ok(api) = std::env::var("DOCRELAY_GITHUB_API") {
            self.github.api_base = api;
        }
        if let Ok(owner) = std::env::var("DOCRELAY_GITHUB_OWNER") {
            self.github.owner = owner;
        }
        if let Ok(repo) = std::env::var("DOCRELAY_GITHUB_REPO") {
            self.github.repo = repo;
        }

        // Logging overrides
        if let Ok(level) = std::env::var("DOCRELAY_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(json) = env_flag("DOCRELAY_JSON_LOGS") {
            self.logging.json_format = json;
        }
    }

    fn apply_cli_overrides(&mut self, cli: &Cli) {
        if let Commands::Serve { port: Some(port) } = &cli.command {
            self.server.port = *port;
        }
        if let Some(url) = &cli.url {
            self.client.url = url.clone();
        }
        if cli.json_logs {
            self.logging.json_format = true;
        }
        if cli.verbose {
            self.logging.level = "debug".to_string();
        }
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns error if any validation check fails
    pub fn validate(&self) -> Result<()> {
        if self.server.update_interval_secs == 0 {
            return Err(DocrelayError::Config(
                "server.update_interval_secs must be greater than 0".to_string(),
            )
            .into());
        }

        if self.client.reconnect_delay_secs == 0 {
            return Err(DocrelayError::Config(
                "client.reconnect_delay_secs must be greater than 0".to_string(),
            )
            .into());
        }

        let url = url::Url::parse(&self.client.url).map_err(|e| {
            DocrelayError::Config(format!("Invalid client.url {}: {}", self.client.url, e))
        })?;
        if !matches!(url.scheme(), "ws" | "wss") {
            return Err(DocrelayError::Config(format!(
                "client.url must use ws:// or wss://, got {}",
                self.client.url
            ))
            .into());
        }

        if self.github.owner.trim().is_empty() || self.github.repo.trim().is_empty() {
            return Err(
                DocrelayError::Config("github.owner and github.repo are required".to_string())
                    .into(),
            );
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn cli(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("docrelay").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.server.update_interval_secs, 300);
        assert_eq!(config.client.url, "ws://localhost:3000");
        assert_eq!(config.client.reconnect_delay_secs, 5);
        assert_eq!(config.client.request_timeout(), Some(Duration::from_secs(30)));
        assert_eq!(config.client.pending_policy, PendingPolicy::FailOnDisconnect);
        assert_eq!(config.github.owner, "algorandfoundation");
        assert_eq!(config.github.repo, "docs");
        assert!(config.github.token.is_none());
        assert_eq!(config.logging.level, "info");
        assert!(!config.logging.json_format);
    }

    #[test]
    fn test_config_validation_success() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_config_validation_zero_interval() {
        let mut config = Config::default();
        config.server.update_interval_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_zero_reconnect_delay() {
        let mut config = Config::default();
        config.client.reconnect_delay_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_rejects_http_url() {
        let mut config = Config::default();
        config.client.url = "http://localhost:3000".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("ws://"));

        config.client.url = "not a url".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_empty_repo() {
        let mut config = Config::default();
        config.github.repo = " ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_request_timeout_disables_deadline() {
        let client = ClientConfig {
            request_timeout_secs: 0,
            ..ClientConfig::default()
        };
        assert_eq!(client.request_timeout(), None);
    }

    #[test]
    fn test_config_from_yaml() {
        let yaml = r#"
server:
  port: 4000
client:
  url: wss://relay.example.com
  pending_policy: retain
github:
  owner: acme
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.server.port, 4000);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.client.url, "wss://relay.example.com");
        assert_eq!(config.client.pending_policy, PendingPolicy::Retain);
        assert_eq!(config.github.owner, "acme");
        assert_eq!(config.github.repo, "docs");
        assert_eq!(config.logging, LoggingConfig::default());
    }

    #[test]
    fn test_token_is_not_serialized() {
        let mut config = Config::default();
        config.github.token = Some("secret".to_string());
        let yaml = serde_yaml::to_string(&config).unwrap();
        assert!(!yaml.contains("secret"));
    }

    #[test]
    fn test_cli_overrides() {
        let mut config = Config::default();
        config.apply_cli_overrides(&cli(&[
            "--url",
            "ws://10.0.0.1:9000",
            "--json-logs",
            "-v",
            "serve",
            "--port",
            "8080",
        ]));
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.client.url, "ws://10.0.0.1:9000");
        assert!(config.logging.json_format);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_load_nonexistent_file_uses_defaults() {
        let config = Config::load("nonexistent.yaml", &cli(&["tools"])).unwrap();
        assert_eq!(config.github.repo, "docs");
    }
}
