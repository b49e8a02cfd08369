use camino::Utf8PathBuf;

/// Default log filter expression used by the binaries.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Default address advertised to clients.
pub const DEFAULT_SERVER_HOST: &str = "localhost:17070";

/// Default agent data directory.
pub const DEFAULT_DATA_DIR: &str = "/var/lib/quay";

/// Default agent log directory.
pub const DEFAULT_LOG_DIR: &str = "/var/log/quay";

/// Default identifier of the machine hosting the server.
pub const DEFAULT_MACHINE_ID: &str = "0";

/// Default log filter expression used by the binaries.
#[must_use]
pub const fn default_log_filter() -> &'static str {
    DEFAULT_LOG_FILTER
}

/// Owned log filter value used where allocation is required (e.g. serde).
pub(crate) fn default_log_filter_string() -> String {
    DEFAULT_LOG_FILTER.to_owned()
}

/// Default logging format for the binaries.
#[must_use]
pub const fn default_log_format() -> crate::logging::LogFormat {
    crate::logging::LogFormat::Json
}

/// Default address advertised to clients.
#[must_use]
pub fn default_server_host() -> String {
    DEFAULT_SERVER_HOST.to_owned()
}

/// Default agent data directory.
#[must_use]
pub fn default_data_dir() -> Utf8PathBuf {
    Utf8PathBuf::from(DEFAULT_DATA_DIR)
}

/// Default agent log directory.
#[must_use]
pub fn default_log_dir() -> Utf8PathBuf {
    Utf8PathBuf::from(DEFAULT_LOG_DIR)
}

/// Default identifier of the hosting machine.
#[must_use]
pub fn default_machine_id() -> String {
    DEFAULT_MACHINE_ID.to_owned()
}
