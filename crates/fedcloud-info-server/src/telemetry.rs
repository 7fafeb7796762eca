// crates/fedcloud-info-server/src/telemetry.rs
// ============================================================================
// Module: Telemetry
// Description: Global tracing subscriber setup.
// Purpose: Route log events to stderr as text or JSON lines.
// Dependencies: fedcloud-info-config, tracing-subscriber
// ============================================================================

//! ## Overview
//! `RUST_LOG` takes precedence over the configured level.

use fedcloud_info_config::LogFormat;
use fedcloud_info_config::LoggingConfig;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::Registry;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;

use crate::error::ServerError;

/// Installs the global subscriber described by `config`.
///
/// # Errors
///
/// Returns [`ServerError::Init`] when the level is not a valid filter or a
/// global subscriber is already installed.
pub fn init_logging(config: &LoggingConfig) -> Result<(), ServerError> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(config.level.trim())
            .map_err(|err| ServerError::Init(format!("invalid log level: {err}")))?,
    };
    let registry = Registry::default().with(filter);
    let installed = match config.format {
        LogFormat::Text => tracing::subscriber::set_global_default(
            registry.with(fmt::layer().with_writer(std::io::stderr)),
        ),
        LogFormat::Json => tracing::subscriber::set_global_default(
            registry.with(fmt::layer().json().with_writer(std::io::stderr)),
        ),
    };
    installed.map_err(|err| ServerError::Init(err.to_string()))
}
