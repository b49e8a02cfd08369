//! Access levels granted to users on models and controllers.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Access a user holds on, or requests against, a model or controller.
///
/// Model targets use the `read < write < admin` lattice. Controller targets
/// use `login < add-model < superuser`. [`Access::NoAccess`] sits below both.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, EnumString, Display, Serialize, Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum Access {
    /// No access at all.
    #[default]
    #[serde(rename = "")]
    #[strum(serialize = "")]
    NoAccess,
    /// Read-only model access.
    #[strum(serialize = "read")]
    Read,
    /// Model access allowing changes.
    #[strum(serialize = "write")]
    Write,
    /// Full model administration.
    #[strum(serialize = "admin")]
    Admin,
    /// Permission to log in to the controller.
    #[strum(serialize = "login")]
    Login,
    /// Permission to create models on the controller.
    #[strum(serialize = "add-model")]
    AddModel,
    /// Full controller administration.
    #[strum(serialize = "superuser")]
    Superuser,
}

/// Errors encountered while parsing an [`Access`] from text.
pub type AccessParseError = strum::ParseError;

impl Access {
    /// Returns `true` when the level belongs to the model lattice.
    #[must_use]
    pub const fn is_model_access(self) -> bool {
        matches!(self, Self::Read | Self::Write | Self::Admin)
    }

    /// Returns `true` when the level belongs to the controller lattice.
    #[must_use]
    pub const fn is_controller_access(self) -> bool {
        matches!(self, Self::Login | Self::AddModel | Self::Superuser)
    }

    /// Returns `true` when `self` grants at least `requested` on a model.
    #[must_use]
    pub fn equal_or_greater_model_access_than(self, requested: Self) -> bool {
        match (model_rank(self), model_rank(requested)) {
            (Some(granted), Some(wanted)) => granted >= wanted,
            _ => false,
        }
    }

    /// Returns `true` when `self` grants at least `requested` on a controller.
    #[must_use]
    pub fn equal_or_greater_controller_access_than(self, requested: Self) -> bool {
        match (controller_rank(self), controller_rank(requested)) {
            (Some(granted), Some(wanted)) => granted >= wanted,
            _ => false,
        }
    }
}

const fn model_rank(access: Access) -> Option<u8> {
    match access {
        Access::NoAccess => Some(0),
        Access::Read => Some(1),
        Access::Write => Some(2),
        Access::Admin => Some(3),
        _ => None,
    }
}

const fn controller_rank(access: Access) -> Option<u8> {
    match access {
        Access::NoAccess => Some(0),
        Access::Login => Some(1),
        Access::AddModel => Some(2),
        Access::Superuser => Some(3),
        _ => None,
    }
}
