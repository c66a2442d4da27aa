//! Logging setup and configuration

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Setup tracing subscriber for the application
///
/// `RUST_LOG` takes precedence over `default_level`. Thread names are printed
/// so that records from the bus worker thread can be told apart.
pub fn setup_logging(default_level: &str) -> crate::Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => parse_filter(default_level)?,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_thread_names(true))
        .try_init()
        .map_err(|e| crate::Error::Config(format!("Logging already initialized: {}", e)))
}

/// Parse a filter directive such as `info` or `bus=debug,warn`
pub fn parse_filter(directives: &str) -> crate::Result<EnvFilter> {
    EnvFilter::try_new(directives)
        .map_err(|e| crate::Error::Config(format!("Invalid log filter '{}': {}", directives, e)))
}
