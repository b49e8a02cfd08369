//! Enumeration of the facades a server offers.

use quay_params::FacadeVersions;

use crate::registry::FacadeRegistry;

/// Lists every registered facade with its versions.
///
/// Order follows the registry: names ascending, versions ascending.
#[must_use]
pub fn describe_facades(registry: &FacadeRegistry) -> Vec<FacadeVersions> {
    registry
        .list()
        .into_iter()
        .map(|description| FacadeVersions {
            name: description.name,
            versions: description.versions,
        })
        .collect()
}
