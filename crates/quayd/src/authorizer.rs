//! Authorization queries facades run against the connection's identity.

use quay_params::{Access, Tag};

use crate::entity::Entity;
use crate::errors::RpcError;
use crate::state::StoreError;

/// Identity and permission queries exposed to facades.
///
/// Kind checks answer `false`, never an error, when the connection has not
/// logged in.
pub trait Authorizer: Send + Sync {
    /// Returns `true` when the caller is a machine agent.
    fn auth_machine_agent(&self) -> bool;

    /// Returns `true` when the caller is a unit agent.
    fn auth_unit_agent(&self) -> bool;

    /// Returns `true` when the caller is a user.
    fn auth_client(&self) -> bool;

    /// Returns `true` when the caller's own tag is exactly `tag`.
    fn auth_owner(&self, tag: &Tag) -> bool;

    /// Returns `true` when the caller is a machine that manages its model.
    fn auth_model_manager(&self) -> bool;

    /// Tag of the authenticated entity.
    fn get_auth_tag(&self) -> Option<&Tag>;

    /// The authenticated entity.
    fn get_auth_entity(&self) -> Option<&Entity>;

    /// Model the connection is scoped to; empty for controller-root logins.
    fn connected_model(&self) -> &str;

    /// Returns whether the caller may perform `operation` on `target`.
    ///
    /// # Errors
    ///
    /// Propagates backing store failures.
    fn has_permission(&self, operation: Access, target: &Tag) -> Result<bool, StoreError>;

    /// Returns whether `user` may perform `operation` on `target`.
    ///
    /// # Errors
    ///
    /// Propagates backing store failures.
    fn user_has_permission(
        &self,
        user: &Tag,
        operation: Access,
        target: &Tag,
    ) -> Result<bool, StoreError>;

    /// Fails with [`RpcError::PermissionDenied`] unless the caller may
    /// perform `operation` on `target`.
    ///
    /// # Errors
    ///
    /// Returns [`RpcError::PermissionDenied`] or a store failure.
    fn ensure_permission(&self, operation: Access, target: &Tag) -> Result<(), RpcError> {
        if self.has_permission(operation, target)? {
            Ok(())
        } else {
            Err(RpcError::PermissionDenied)
        }
    }
}
