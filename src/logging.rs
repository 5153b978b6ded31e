//! Structured logging setup
//!
//! Provides JSON-formatted and human-readable logging with optional file
//! output, on top of the tracing ecosystem.

use std::fs::OpenOptions;
use std::sync::Arc;

use anyhow::Result;
use tracing_subscriber::fmt;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LoggingConfig;

/// Build the event filter: `RUST_LOG` when set, otherwise the configured
/// level applied to this crate.
///
/// A bare level such as `debug` becomes `docrelay=debug`; anything containing
/// a directive (`=` or `,`) is used as given.
pub fn build_filter(level: &str) -> Result<EnvFilter> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    let directive = if level.contains('=') || level.contains(',') {
        level.to_string()
    } else {
        format!("docrelay={}", level)
    };
    Ok(EnvFilter::try_new(directive)?)
}

/// Subscriber used while the configuration itself is being loaded.
///
/// Writes to stderr at `info` (`debug` when `verbose`), or as JSON when
/// `json` is set; `RUST_LOG` still wins. Install it with
/// [`tracing::subscriber::with_default`] so warnings raised by
/// [`crate::config::Config::load`] are not lost before [`init_logging`] runs.
///
/// # Errors
///
/// Returns an error if the filter cannot be built.
pub fn bootstrap_subscriber(
    verbose: bool,
    json: bool,
) -> Result<Box<dyn tracing::Subscriber + Send + Sync>> {
    let filter = build_filter(if verbose { "debug" } else { "info" })?;
    let builder = fmt().with_env_filter(filter).with_writer(std::io::stderr);

    Ok(if json {
        Box::new(builder.json().finish())
    } else {
        Box::new(builder.finish())
    })
}

/// Initialize logging based on configuration.
///
/// # Errors
///
/// Returns an error if the filter is invalid, the log file cannot be opened,
/// or a global subscriber is already installed.
///
/// # Examples
///
/// ```no_run
/// use docrelay::config::LoggingConfig;
/// use docrelay::logging::init_logging;
///
/// init_logging(&LoggingConfig::default()).unwrap();
/// ```
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    let env_filter = build_filter(&config.level)?;
    let registry = tracing_subscriber::registry().with(env_filter);

    let file = match &config.file_path {
        Some(path) => Some(Arc::new(
            OpenOptions::new().create(true).append(true).open(path)?,
        )),
        None => None,
    };

    if config.json_format {
        let console_layer = fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_writer(std::io::stderr);

        match file {
            Some(file) => {
                let file_layer = fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(true)
                    .with_writer(file);
                registry.with(console_layer).with(file_layer).try_init()?;
            }
            None => registry.with(console_layer).try_init()?,
        }
    } else {
        let console_layer = fmt::layer()
            .with_target(true)
            .with_level(true)
            .with_writer(std::io::stderr);

        match file {
            Some(file) => {
                let file_layer = fmt::layer()
                    .with_target(true)
                    .with_level(true)
                    .with_ansi(false)
                    .with_writer(file);
                registry.with(console_layer).with(file_layer).try_init()?;
            }
            None => registry.with(console_layer).try_init()?,
        }
    }

    Ok(())
}
