//! Contract consumed from the backing store.
//!
//! The dispatch layer never talks to storage directly; it holds an
//! `Arc<dyn StateBackend>` per session and hands it to facade constructors.
//! The only query the core itself needs is the access level a user holds on
//! a model or controller.

use thiserror::Error;

use quay_params::{Access, Tag};

/// Errors reported by the backing store.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The requested record does not exist.
    #[error("{what} not found")]
    NotFound {
        /// Description of the missing record.
        what: String,
    },
    /// The store could not answer.
    #[error("backing store unavailable: {message}")]
    Unavailable {
        /// Description of the failure.
        message: String,
    },
}

impl StoreError {
    /// Creates a not-found error.
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound { what: what.into() }
    }

    /// Creates an unavailable error.
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }

    /// Returns `true` when the record was simply absent.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Handle to the controller's backing store.
#[cfg_attr(test, mockall::automock)]
pub trait StateBackend: Send + Sync {
    /// Returns the access `user` holds on `target`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] when the user has no access record
    /// for the target, or another [`StoreError`] when the lookup fails.
    fn user_access(&self, user: &Tag, target: &Tag) -> Result<Access, StoreError>;
}
