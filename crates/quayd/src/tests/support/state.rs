//! In-memory backing store double.

use quay_params::{Access, Tag};

use crate::state::{StateBackend, StoreError};

/// Store answering access queries from a fixed list of grants.
#[derive(Debug, Default)]
pub struct GrantTable {
    grants: Vec<(Tag, Tag, Access)>,
}

impl GrantTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn grant(mut self, user: Tag, target: Tag, access: Access) -> Self {
        self.grants.push((user, target, access));
        self
    }
}

impl StateBackend for GrantTable {
    fn user_access(&self, user: &Tag, target: &Tag) -> Result<Access, StoreError> {
        self.grants
            .iter()
            .find(|(granted_user, granted_target, _)| {
                granted_user == user && granted_target == target
            })
            .map(|(_, _, access)| *access)
            .ok_or_else(|| StoreError::not_found(format!("access for {user} on {target}")))
    }
}
