//! Subscriber setup for binaries
//!
//! The library only emits `tracing` events; installing a subscriber is left to
//! whichever process embeds it.

use crate::config::{LogFormat, LoggingConfig};
use crate::error::{InsightError, Result};
use tracing_subscriber::EnvFilter;

/// Install the global subscriber described by `config`
///
/// `RUST_LOG` takes precedence over the configured level. Output goes to
/// stderr so stdout stays free for responses.
pub fn init(config: &LoggingConfig) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.level).map_err(|e| {
            InsightError::ConfigError(format!("invalid log level `{}`: {e}", config.level))
        })?,
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    let installed = match config.format {
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Json => builder.json().try_init(),
    };

    installed.map_err(|e| InsightError::ConfigError(format!("logging already initialised: {e}")))
}
