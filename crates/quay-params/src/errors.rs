//! Error codes surfaced to RPC clients.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Machine-readable classification attached to every error returned to a
/// client.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, Display,
)]
pub enum ErrorCode {
    /// The requested facade, version, or method does not exist.
    #[serde(rename = "not implemented")]
    #[strum(serialize = "not implemented")]
    NotImplemented,
    /// The client speaks a protocol version the server no longer accepts.
    #[serde(rename = "not supported")]
    #[strum(serialize = "not supported")]
    NotSupported,
    /// The authenticated entity may not perform the operation.
    #[serde(rename = "unauthorized access")]
    #[strum(serialize = "unauthorized access")]
    Unauthorized,
    /// The referenced entity does not exist.
    #[serde(rename = "not found")]
    #[strum(serialize = "not found")]
    NotFound,
    /// The request was well-routed but its contents were unusable.
    #[serde(rename = "bad request")]
    #[strum(serialize = "bad request")]
    BadRequest,
    /// The server failed for reasons unrelated to the request.
    #[serde(rename = "internal error")]
    #[strum(serialize = "internal error")]
    Internal,
}

/// Serializable error payload handed back to the transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResult {
    /// Human-readable description.
    pub message: String,
    /// Classification of the failure.
    pub code: ErrorCode,
}

impl ErrorResult {
    /// Builds an error payload.
    #[must_use]
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_codes_with_their_wire_names() {
        let result = ErrorResult::new(ErrorCode::Unauthorized, "permission denied");
        let json = serde_json::to_string(&result).expect("serialize");
        assert_eq!(
            json,
            r#"{"message":"permission denied","code":"unauthorized access"}"#
        );
    }
}
