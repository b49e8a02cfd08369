//! Shared configuration for the Quay API server.
//!
//! Configuration is layered by `ortho_config`: built-in defaults, then a
//! configuration file (located with `--config-path` or `QUAY_CONFIG_PATH`),
//! then `QUAY_*` environment variables, then command-line flags.

use camino::{Utf8Path, Utf8PathBuf};
use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};

mod defaults;
mod logging;
mod machine_id;

pub use defaults::{
    DEFAULT_DATA_DIR, DEFAULT_LOG_DIR, DEFAULT_LOG_FILTER, DEFAULT_MACHINE_ID,
    DEFAULT_SERVER_HOST, default_data_dir, default_log_dir, default_log_filter,
    default_log_format, default_machine_id, default_server_host,
};
pub use logging::{LogFormat, LogFormatParseError};

/// Resolved server configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, OrthoConfig)]
#[ortho_config(prefix = "QUAY")]
pub struct Config {
    /// `tracing` filter expression, for example `info,quayd::dispatch=debug`.
    #[serde(default = "defaults::default_log_filter_string")]
    pub log_filter: String,
    /// Output format for log records.
    #[serde(default = "defaults::default_log_format")]
    pub log_format: LogFormat,
    /// `host:port` clients connect to; recorded on every session.
    #[serde(default = "defaults::default_server_host")]
    pub server_host: String,
    /// Directory holding the controller agent's data.
    #[serde(default = "defaults::default_data_dir")]
    pub data_dir: Utf8PathBuf,
    /// Directory holding the controller agent's logs.
    #[serde(default = "defaults::default_log_dir")]
    pub log_dir: Utf8PathBuf,
    /// Identifier of the machine hosting this API server.
    #[serde(
        default = "defaults::default_machine_id",
        deserialize_with = "machine_id::deserialize"
    )]
    pub machine_id: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_filter: defaults::default_log_filter_string(),
            log_format: defaults::default_log_format(),
            server_host: defaults::default_server_host(),
            data_dir: defaults::default_data_dir(),
            log_dir: defaults::default_log_dir(),
            machine_id: defaults::default_machine_id(),
        }
    }
}

impl Config {
    /// Filter expression for the telemetry subscriber.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        self.log_filter.as_str()
    }

    /// Output format for the telemetry subscriber.
    #[must_use]
    pub const fn log_format(&self) -> LogFormat {
        self.log_format
    }

    /// Address clients use to reach this server.
    #[must_use]
    pub fn server_host(&self) -> &str {
        self.server_host.as_str()
    }

    /// Agent data directory.
    #[must_use]
    pub fn data_dir(&self) -> &Utf8Path {
        self.data_dir.as_path()
    }

    /// Agent log directory.
    #[must_use]
    pub fn log_dir(&self) -> &Utf8Path {
        self.log_dir.as_path()
    }

    /// Identifier of the hosting machine.
    #[must_use]
    pub fn machine_id(&self) -> &str {
        self.machine_id.as_str()
    }
}
