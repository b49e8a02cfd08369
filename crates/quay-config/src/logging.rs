//! Output encodings for the API server's log records.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// How `quayd` renders each log record on standard error.
///
/// Parsed case-insensitively from `--log-format`, `QUAY_LOG_FORMAT`, or the
/// `log_format` key of the configuration file.
#[derive(
    Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq, EnumString, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum LogFormat {
    /// One JSON object per record, with event fields flattened to the top
    /// level for log shippers.
    #[default]
    Json,
    /// Terse text lines for operators watching a terminal.
    Compact,
}

/// Error returned when a [`LogFormat`] name is not recognised.
pub type LogFormatParseError = strum::ParseError;
