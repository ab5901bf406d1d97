//! Structured logging setup.
//!
//! - `RUST_LOG` selects levels (default `info`).
//! - `LOG_FORMAT` is `pretty` (default) or `json`.
//!
//! Logs go to stderr so stdout stays free for the printed summaries.

use std::io;

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

impl LogFormat {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "json" => LogFormat::Json,
            _ => LogFormat::Pretty,
        }
    }

    pub fn from_env() -> Self {
        std::env::var("LOG_FORMAT")
            .map(|v| Self::parse(&v))
            .unwrap_or(LogFormat::Pretty)
    }
}

/// Installs the global subscriber. Safe to call more than once; later calls are no-ops.
pub fn init() {
    let format = LogFormat::from_env();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let installed = match format {
        LogFormat::Pretty => {
            let layer = fmt::layer()
                .with_writer(io::stderr)
                .with_target(false)
                .compact()
                .with_filter(filter);
            tracing_subscriber::registry().with(layer).try_init()
        }
        LogFormat::Json => {
            let layer = fmt::layer()
                .with_writer(io::stderr)
                .with_target(true)
                .json()
                .flatten_event(true)
                .with_filter(filter);
            tracing_subscriber::registry().with(layer).try_init()
        }
    };
    if installed.is_ok() {
        tracing::debug!(log_format = ?format, "logging initialized");
    }
}
