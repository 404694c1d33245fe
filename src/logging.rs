//! Structured logging.
//!
//! `RUST_LOG` takes precedence over the configured level. Secrets and message
//! text are never passed to log macros anywhere in the workspace.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::LoggingConfig;

/// Start-up failure.
pub type InitError = Box<dyn std::error::Error + Send + Sync>;

pub fn filter(config: &LoggingConfig) -> Result<EnvFilter, InitError> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => Ok(EnvFilter::try_new(&config.level)?),
    }
}

/// Install the global subscriber. Fails if one is already installed.
pub fn init(config: &LoggingConfig) -> Result<(), InitError> {
    let registry = tracing_subscriber::registry().with(filter(config)?);
    match config.format.as_str() {
        "pretty" => registry.with(fmt::layer().pretty()).try_init()?,
        _ => registry.with(fmt::layer().json()).try_init()?,
    }
    Ok(())
}
