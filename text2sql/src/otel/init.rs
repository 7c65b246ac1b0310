//! Subscriber setup.

use crate::config::LogFormat;
use crate::types::{Result, Text2SqlError};
use tracing_subscriber::EnvFilter;

/// Install the global tracing subscriber.
///
/// Filter comes from `RUST_LOG`, defaulting to `info`.
///
/// # Errors
///
/// Returns `Text2SqlError::ConfigError` if a global subscriber is already set
pub fn init_tracing(format: LogFormat) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    let installed = match format {
        LogFormat::Pretty => builder.try_init(),
        LogFormat::Json => builder.json().with_current_span(true).try_init(),
    };
    installed.map_err(|e| Text2SqlError::ConfigError(format!("tracing init failed: {}", e)))?;

    tracing::info!(format = ?format, "logging initialized");
    Ok(())
}
