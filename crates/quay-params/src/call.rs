//! Decoded call envelope handed from the transport to the server.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A single RPC call after the transport has decoded its frame.
///
/// `facade` and `version` select the registered facade, `id` selects the
/// object instance within the connection (usually empty), and `request` names
/// the method. `params` stays as loosely-typed JSON until the method handle
/// decodes it into the method's own parameter type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallRequest {
    /// Facade name.
    #[serde(rename = "type")]
    pub facade: String,
    /// Facade version.
    pub version: u32,
    /// Object identifier within the connection.
    #[serde(default)]
    pub id: String,
    /// Method name.
    pub request: String,
    /// Method parameters.
    #[serde(default)]
    pub params: Value,
}

impl CallRequest {
    /// Builds a call with null parameters and an empty object id.
    #[must_use]
    pub fn new(facade: impl Into<String>, version: u32, request: impl Into<String>) -> Self {
        Self {
            facade: facade.into(),
            version,
            id: String::new(),
            request: request.into(),
            params: Value::Null,
        }
    }

    /// Replaces the object identifier.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// Replaces the parameters.
    #[must_use]
    pub fn with_params(mut self, params: Value) -> Self {
        self.params = params;
        self
    }
}
