//! Typed method tables built once per facade type.
//!
//! A [`MethodTable`] maps method names to [`MethodHandle`]s. Each handle
//! closes over a typed function `Fn(&T, P) -> Result<R, RpcError>` and erases
//! it behind a uniform `(receiver, JSON params) -> JSON result` signature, so
//! the dispatcher can look methods up by name without reflection.

use std::any::{Any, TypeId, type_name};
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::errors::RpcError;

use super::RegistryError;

/// A constructed facade instance with its concrete type erased.
pub type FacadeObject = Arc<dyn Any + Send + Sync>;

type Invoker =
    dyn Fn(&(dyn Any + Send + Sync + 'static), Value) -> Result<Value, RpcError> + Send + Sync;

/// Describes the Rust type a method expects or produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Shape {
    type_name: &'static str,
}

impl Shape {
    /// Shape of `T`.
    #[must_use]
    pub fn of<T: ?Sized>() -> Self {
        Self {
            type_name: type_name::<T>(),
        }
    }

    /// Fully qualified type name.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        self.type_name
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.type_name)
    }
}

/// A single callable method of a facade type.
#[derive(Clone)]
pub struct MethodHandle {
    name: Arc<str>,
    params: Shape,
    result: Shape,
    invoke: Arc<Invoker>,
}

impl fmt::Debug for MethodHandle {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("MethodHandle")
            .field("name", &self.name)
            .field("params", &self.params)
            .field("result", &self.result)
            .finish_non_exhaustive()
    }
}

impl MethodHandle {
    /// Method name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Shape of the parameters the method decodes.
    #[must_use]
    pub const fn params_shape(&self) -> Shape {
        self.params
    }

    /// Shape of the result the method encodes.
    #[must_use]
    pub const fn result_shape(&self) -> Shape {
        self.result
    }

    /// Invokes the method on `target`.
    ///
    /// # Errors
    ///
    /// Returns [`RpcError::InternalInconsistency`] when `target` is not the
    /// table's receiver type, [`RpcError::InvalidParams`] when `params` does
    /// not decode, or whatever the method itself returns.
    pub fn call(
        &self,
        target: &(dyn Any + Send + Sync + 'static),
        params: Value,
    ) -> Result<Value, RpcError> {
        (self.invoke)(target, params)
    }
}

/// Methods callable on one facade type, keyed by name.
#[derive(Clone)]
pub struct MethodTable {
    receiver: TypeId,
    receiver_name: &'static str,
    methods: HashMap<String, MethodHandle>,
}

impl fmt::Debug for MethodTable {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("MethodTable")
            .field("receiver", &self.receiver_name)
            .field("methods", &self.method_names())
            .finish()
    }
}

impl MethodTable {
    /// Starts a table for receiver type `T`.
    #[must_use]
    pub const fn builder<T: Send + Sync + 'static>() -> MethodTableBuilder<T> {
        MethodTableBuilder {
            methods: Vec::new(),
            receiver: PhantomData,
        }
    }

    /// Type the methods are called on.
    #[must_use]
    pub const fn receiver_type_id(&self) -> TypeId {
        self.receiver
    }

    /// Name of the receiver type.
    #[must_use]
    pub const fn receiver_type_name(&self) -> &'static str {
        self.receiver_name
    }

    /// Looks up a method by exact name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&MethodHandle> {
        self.methods.get(name)
    }

    /// Method names in lexical order.
    #[must_use]
    pub fn method_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.methods.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Number of methods.
    #[must_use]
    pub fn len(&self) -> usize {
        self.methods.len()
    }

    /// Returns `true` when the table has no methods.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }
}

/// Accumulates typed methods for receiver `T`.
///
/// ```
/// use quayd::registry::MethodTable;
///
/// struct Pinger;
///
/// let table = MethodTable::builder::<Pinger>()
///     .method("Ping", |_: &Pinger, (): ()| Ok("pong"))
///     .build()
///     .expect("valid table");
/// assert!(table.get("Ping").is_some());
/// ```
pub struct MethodTableBuilder<T> {
    methods: Vec<(String, MethodHandle)>,
    receiver: PhantomData<fn(&T)>,
}

impl<T: Send + Sync + 'static> MethodTableBuilder<T> {
    /// Adds a method taking parameters `P` and producing `R`.
    ///
    /// Methods without parameters use `()`, which decodes from a null or
    /// absent parameter value.
    #[must_use]
    pub fn method<P, R, F>(mut self, name: &str, method: F) -> Self
    where
        P: DeserializeOwned + 'static,
        R: Serialize + 'static,
        F: Fn(&T, P) -> Result<R, RpcError> + Send + Sync + 'static,
    {
        let label: Arc<str> = Arc::from(name);
        let invoke_label = Arc::clone(&label);
        let invoke = move |target: &(dyn Any + Send + Sync + 'static), params: Value| {
            let receiver = target.downcast_ref::<T>().ok_or_else(|| {
                RpcError::internal_inconsistency(format!(
                    "method {invoke_label} called on a value that is not {}",
                    type_name::<T>()
                ))
            })?;
            let decoded = serde_json::from_value::<P>(params)
                .map_err(|source| RpcError::invalid_params(invoke_label.as_ref(), source))?;
            let result = method(receiver, decoded)?;
            serde_json::to_value(result)
                .map_err(|source| RpcError::encode_result(invoke_label.as_ref(), source))
        };
        self.methods.push((
            name.to_owned(),
            MethodHandle {
                name: label,
                params: Shape::of::<P>(),
                result: Shape::of::<R>(),
                invoke: Arc::new(invoke),
            },
        ));
        self
    }

    /// Validates and freezes the table.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::InvalidMethodName`] for blank names and
    /// [`RegistryError::DuplicateMethod`] when a name appears twice.
    pub fn build(self) -> Result<MethodTable, RegistryError> {
        let receiver_name = type_name::<T>();
        let mut methods = HashMap::with_capacity(self.methods.len());
        for (name, handle) in self.methods {
            if name.trim().is_empty() {
                return Err(RegistryError::InvalidMethodName {
                    receiver: receiver_name,
                });
            }
            if methods.contains_key(&name) {
                return Err(RegistryError::DuplicateMethod {
                    receiver: receiver_name,
                    method: name,
                });
            }
            methods.insert(name, handle);
        }
        Ok(MethodTable {
            receiver: TypeId::of::<T>(),
            receiver_name,
            methods,
        })
    }
}
