//! Logging setup
//!
//! Builds the `tracing` subscriber from [`LoggingConfig`]. `RUST_LOG` takes
//! precedence over the configured level. Logs go to stderr (or the configured
//! file) so command output on stdout stays clean.

use std::fs::OpenOptions;
use std::sync::Mutex;

use thiserror::Error;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LoggingConfig;

/// Errors raised while installing the subscriber
#[derive(Error, Debug)]
pub enum LoggingError {
    #[error("Cannot open log file {path}: {error}")]
    File { path: String, error: std::io::Error },

    #[error("Logging already initialized: {0}")]
    Init(String),
}

/// Filter directive used when `RUST_LOG` is not set
pub fn filter_directive(config: &LoggingConfig) -> String {
    format!("botwatch={}", config.level.trim().to_lowercase())
}

/// Install the global subscriber
pub fn init_logging(config: &LoggingConfig) -> Result<(), LoggingError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter_directive(config)));

    let writer = match &config.file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|error| LoggingError::File {
                    path: path.clone(),
                    error,
                })?;
            BoxMakeWriter::new(Mutex::new(file))
        }
        None => BoxMakeWriter::new(std::io::stderr),
    };

    let registry = tracing_subscriber::registry().with(filter);

    let result = match config.format.as_str() {
        "json" => registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(writer))
            .try_init(),
        _ => registry
            .with(tracing_subscriber::fmt::layer().with_writer(writer))
            .try_init(),
    };

    result.map_err(|e| LoggingError::Init(e.to_string()))
}
