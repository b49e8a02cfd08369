//! Access checks against the backing store.

use quay_params::{Access, Tag, TagKind};

use crate::state::{StateBackend, StoreError};

/// Returns whether `subject` may perform `operation` on `target`.
///
/// Only model and controller targets carry grants, and the requested
/// operation must belong to the target's lattice; anything else is simply
/// not permitted. Non-user subjects hold no grants. A missing access record
/// means no access rather than an error.
///
/// # Errors
///
/// Propagates store failures other than [`StoreError::NotFound`].
pub fn has_permission(
    store: &dyn StateBackend,
    subject: &Tag,
    operation: Access,
    target: &Tag,
) -> Result<bool, StoreError> {
    let valid_operation = match target.kind() {
        TagKind::Model => operation.is_model_access(),
        TagKind::Controller => operation.is_controller_access(),
        _ => false,
    };
    if !valid_operation || subject.kind() != TagKind::User {
        return Ok(false);
    }

    let granted = match store.user_access(subject, target) {
        Ok(access) => access,
        Err(error) if error.is_not_found() => Access::NoAccess,
        Err(error) => return Err(error),
    };
    if granted == Access::NoAccess {
        return Ok(false);
    }

    Ok(match target.kind() {
        TagKind::Model => granted.equal_or_greater_model_access_than(operation),
        _ => granted.equal_or_greater_controller_access_than(operation),
    })
}
