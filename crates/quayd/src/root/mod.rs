//! Dispatch roots: the objects a connection's transport asks to resolve a
//! call into something invocable.
//!
//! Two roots exist. [`AnonRoot`] serves a connection before login and only
//! answers to the `Admin` facade. [`ApiRoot`] serves it afterwards, resolving
//! any registered facade and caching one instance per
//! `(name, version, object id)`.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::errors::RpcError;
use crate::registry::{FacadeObject, MethodHandle, Shape};
use crate::resources::StopAllReport;

mod anon;
mod api;

pub use self::anon::{ADMIN_ROOT, AdminApi, AdminApis, AnonRoot};
pub use self::api::{ApiRoot, ObjectKey};

/// Tracing target for dispatch operations.
pub(crate) const DISPATCH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::dispatch");

/// Resolves calls into invocable method callers.
pub trait MethodFinder: Send + Sync {
    /// Resolves `(root_name, version, method_name)`.
    ///
    /// # Errors
    ///
    /// Returns [`RpcError::CallNotImplemented`] when nothing matches, or a
    /// root-specific error such as [`RpcError::UnsupportedClientVersion`].
    fn find_method(
        &self,
        root_name: &str,
        version: u32,
        method_name: &str,
    ) -> Result<MethodCaller, RpcError>;
}

/// Tears down whatever a root holds for its connection.
pub trait Killer {
    /// Stops every connection resource. Safe to call more than once.
    fn kill(&self) -> StopAllReport;
}

/// Produces the target object for an object id.
pub(crate) type ObjectResolver =
    Arc<dyn Fn(&str) -> Result<FacadeObject, RpcError> + Send + Sync>;

/// A resolved method, ready to be called with an object id and parameters.
///
/// The target object is only produced when [`MethodCaller::call`] runs, so
/// resolving a method never constructs a facade by itself.
#[derive(Clone)]
pub struct MethodCaller {
    method: MethodHandle,
    resolve: ObjectResolver,
}

impl fmt::Debug for MethodCaller {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("MethodCaller")
            .field("method", &self.method)
            .finish_non_exhaustive()
    }
}

impl MethodCaller {
    pub(crate) fn new(method: MethodHandle, resolve: ObjectResolver) -> Self {
        Self { method, resolve }
    }

    /// Name of the resolved method.
    #[must_use]
    pub fn method_name(&self) -> &str {
        self.method.name()
    }

    /// Shape of the parameters the method expects.
    #[must_use]
    pub const fn params_shape(&self) -> Shape {
        self.method.params_shape()
    }

    /// Shape of the result the method returns.
    #[must_use]
    pub const fn result_shape(&self) -> Shape {
        self.method.result_shape()
    }

    /// Resolves the object for `object_id` and invokes the method on it.
    ///
    /// # Errors
    ///
    /// Returns construction failures verbatim, parameter decoding failures,
    /// and whatever the method itself returns.
    pub fn call(&self, object_id: &str, params: Value) -> Result<Value, RpcError> {
        let target = (self.resolve)(object_id)?;
        self.method.call(target.as_ref(), params)
    }
}

#[cfg(test)]
mod tests;
