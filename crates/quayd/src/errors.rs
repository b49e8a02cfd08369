//! Errors surfaced while routing and executing RPC calls.
//!
//! Every failure the dispatch layer can report is a variant of [`RpcError`].
//! Each variant maps onto one client-visible [`ErrorCode`] so the transport
//! can encode it without inspecting the error further.

use std::fmt;

use thiserror::Error;

use quay_params::{ErrorCode, ErrorResult};

use crate::resources::ResourceError;
use crate::state::StoreError;

/// Identifies a call that no registered facade can answer.
///
/// A missing facade name, a missing version, and a missing method are all the
/// same kind of failure; `method` is only present when the facade itself was
/// found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallNotImplemented {
    /// Requested facade name.
    pub root: String,
    /// Requested facade version.
    pub version: u32,
    /// Requested method, when the facade resolved.
    pub method: Option<String>,
}

impl fmt::Display for CallNotImplemented {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.method {
            Some(method) => write!(
                formatter,
                "no such request - method {}({}).{} is not implemented",
                self.root, self.version, method
            ),
            None => write!(
                formatter,
                "unknown object type {:?} (version {})",
                self.root, self.version
            ),
        }
    }
}

/// Errors returned to the transport for a single call.
#[derive(Debug, Error)]
pub enum RpcError {
    /// No facade, version, or method matches the request.
    #[error("{0}")]
    CallNotImplemented(CallNotImplemented),

    /// The anonymous root has no admin implementation for the version.
    #[error("this server does not support login from old clients (Admin version {version})")]
    UnsupportedClientVersion {
        /// Admin version requested by the client.
        version: u32,
    },

    /// The authenticated entity may not perform the operation.
    #[error("permission denied")]
    PermissionDenied,

    /// The connection already completed a login.
    #[error("already logged in")]
    AlreadyLoggedIn,

    /// A referenced entity does not exist.
    #[error("{what} not found")]
    NotFound {
        /// Description of the missing entity.
        what: String,
    },

    /// Call parameters could not be decoded into the method's parameter type.
    #[error("invalid parameters for {method}: {source}")]
    InvalidParams {
        /// Method that rejected the parameters.
        method: String,
        /// Decoder failure.
        #[source]
        source: serde_json::Error,
    },

    /// A method result could not be encoded.
    #[error("failed to encode result of {method}: {source}")]
    EncodeResult {
        /// Method whose result failed to encode.
        method: String,
        /// Encoder failure.
        #[source]
        source: serde_json::Error,
    },

    /// A facade reported a domain failure with an explicit code.
    #[error("{message}")]
    Facade {
        /// Client-visible classification.
        code: ErrorCode,
        /// Human-readable description.
        message: String,
    },

    /// The backing store failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A connection resource could not be registered or stopped.
    #[error(transparent)]
    Resource(#[from] ResourceError),

    /// A registered factory or method table disagrees with its declared type.
    #[error("internal inconsistency: {message}")]
    InternalInconsistency {
        /// Diagnostic detail naming the facade and types involved.
        message: String,
    },

    /// Internal failure such as a poisoned lock.
    #[error("internal error: {message}")]
    Internal {
        /// Diagnostic detail.
        message: String,
    },
}

impl RpcError {
    /// Creates a not-implemented error for a missing facade or version.
    pub fn unknown_facade(root: impl Into<String>, version: u32) -> Self {
        Self::CallNotImplemented(CallNotImplemented {
            root: root.into(),
            version,
            method: None,
        })
    }

    /// Creates a not-implemented error for a missing method.
    pub fn unknown_method(root: impl Into<String>, version: u32, method: impl Into<String>) -> Self {
        Self::CallNotImplemented(CallNotImplemented {
            root: root.into(),
            version,
            method: Some(method.into()),
        })
    }

    /// Creates an unsupported client version error.
    #[must_use]
    pub const fn unsupported_client_version(version: u32) -> Self {
        Self::UnsupportedClientVersion { version }
    }

    /// Creates a not-found error.
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound { what: what.into() }
    }

    /// Creates an invalid parameters error.
    pub fn invalid_params(method: impl Into<String>, source: serde_json::Error) -> Self {
        Self::InvalidParams {
            method: method.into(),
            source,
        }
    }

    /// Creates a result encoding error.
    pub fn encode_result(method: impl Into<String>, source: serde_json::Error) -> Self {
        Self::EncodeResult {
            method: method.into(),
            source,
        }
    }

    /// Creates a facade domain error.
    pub fn facade(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::Facade {
            code,
            message: message.into(),
        }
    }

    /// Creates an internal inconsistency error.
    pub fn internal_inconsistency(message: impl Into<String>) -> Self {
        Self::InternalInconsistency {
            message: message.into(),
        }
    }

    /// Creates an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns the client-visible code for this error.
    #[must_use]
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::CallNotImplemented(_) => ErrorCode::NotImplemented,
            Self::UnsupportedClientVersion { .. } => ErrorCode::NotSupported,
            Self::PermissionDenied => ErrorCode::Unauthorized,
            Self::NotFound { .. } | Self::Store(StoreError::NotFound { .. }) => {
                ErrorCode::NotFound
            }
            Self::AlreadyLoggedIn | Self::InvalidParams { .. } => ErrorCode::BadRequest,
            Self::Facade { code, .. } => *code,
            Self::Store(_)
            | Self::Resource(_)
            | Self::EncodeResult { .. }
            | Self::InternalInconsistency { .. }
            | Self::Internal { .. } => ErrorCode::Internal,
        }
    }

    /// Returns `true` for routing misses.
    #[must_use]
    pub const fn is_not_implemented(&self) -> bool {
        matches!(self, Self::CallNotImplemented(_))
    }

    /// Builds the payload the transport encodes for the client.
    #[must_use]
    pub fn to_error_result(&self) -> ErrorResult {
        ErrorResult::new(self.code(), self.to_string())
    }
}
