use serde::{Deserialize, Serialize};

/// A facade name together with every version the server can serve.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct FacadeVersions {
    /// Facade name, for example `Client` or `Storage`.
    pub name: String,
    /// Supported versions in ascending order.
    pub versions: Vec<u32>,
}
