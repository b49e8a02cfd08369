//! Global `tracing` subscriber for the API server.
//!
//! Records go to standard error, filtered by the configured directive and
//! stamped with RFC 3339 UTC times. Dispatch, resource teardown, and
//! lifecycle events log under `quayd::dispatch`, `quayd::resources` and
//! `quayd::health`, so a directive can raise or silence any one of them.

use std::io::{self, IsTerminal};

use once_cell::sync::OnceCell;
use tracing::Subscriber;
use tracing::subscriber::SetGlobalDefaultError;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::time::UtcTime;

use quay_config::{Config, LogFormat};

static INSTALLED: OnceCell<()> = OnceCell::new();

/// Marker returned once the server's subscriber is in place.
#[derive(Debug, Default, Clone, Copy)]
pub struct TelemetryHandle;

/// Reasons the subscriber could not be installed.
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    /// `log_filter` is not a valid `EnvFilter` directive.
    #[error("invalid log filter: {0}")]
    Filter(String),
    /// Something else already owns the global default subscriber.
    #[error("failed to install telemetry subscriber: {0}")]
    Subscriber(SetGlobalDefaultError),
}

/// Installs the server's subscriber the first time it is called.
///
/// Connections and tests may bootstrap many times in one process; every
/// call after the first successful one is a no-op returning a handle.
///
/// ```rust
/// use quay_config::Config;
/// use quayd::telemetry;
///
/// # fn main() -> Result<(), quayd::telemetry::TelemetryError> {
/// let config = Config::default();
/// telemetry::initialise(&config)?;
/// telemetry::initialise(&config)?;
/// # Ok(())
/// # }
/// ```
///
/// # Errors
///
/// Fails when the filter is invalid or a foreign subscriber is installed.
pub fn initialise(config: &Config) -> Result<TelemetryHandle, TelemetryError> {
    INSTALLED
        .get_or_try_init(|| {
            let subscriber = build_subscriber(config)?;
            tracing::subscriber::set_global_default(subscriber)
                .map_err(TelemetryError::Subscriber)
        })
        .map(|_| TelemetryHandle)
}

fn build_subscriber(
    config: &Config,
) -> Result<Box<dyn Subscriber + Send + Sync>, TelemetryError> {
    let filter = EnvFilter::try_new(config.log_filter())
        .map_err(|error| TelemetryError::Filter(error.to_string()))?;
    let records = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_ansi(io::stderr().is_terminal())
        .with_target(true)
        .with_thread_names(false)
        .with_timer(UtcTime::rfc_3339());

    Ok(match config.log_format() {
        LogFormat::Json => Box::new(records.json().flatten_event(true).finish()),
        LogFormat::Compact => Box::new(records.compact().finish()),
    })
}
