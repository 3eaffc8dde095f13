//! Structured logging.
//!
//! The filter comes from, in order: the `--log-level` flag, `RUST_LOG`, then the
//! built-in default. `LOG_FORMAT=json` switches to one JSON object per line.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{LogFormat, ObservabilityConfig};

#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("invalid log filter '{filter}': {source}")]
    InvalidFilter {
        filter: String,
        #[source]
        source: tracing_subscriber::filter::ParseError,
    },

    #[error("failed to install global subscriber: {0}")]
    Init(#[from] tracing_subscriber::util::TryInitError),
}

/// Install the global subscriber.
pub fn init_logging(
    config: &ObservabilityConfig,
    cli_filter: Option<&str>,
) -> Result<(), LoggingError> {
    let directive = cli_filter.unwrap_or(&config.log_filter);
    let filter = EnvFilter::try_new(directive).map_err(|source| LoggingError::InvalidFilter {
        filter: directive.to_string(),
        source,
    })?;

    let registry = tracing_subscriber::registry().with(filter);
    match config.log_format {
        LogFormat::Pretty => registry.with(fmt::layer()).try_init()?,
        LogFormat::Json => registry.with(fmt::layer().json()).try_init()?,
    }
    Ok(())
}
