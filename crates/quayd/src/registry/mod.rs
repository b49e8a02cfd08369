//! Versioned facade registry.
//!
//! The [`FacadeRegistry`] maps `(name, version)` to a declared facade type
//! and the factory that builds it. It is populated once at start-up through
//! `&mut self` and then shared read-only (`Arc<FacadeRegistry>`) by every
//! connection. Registration runs the self-checks that keep dispatch free of
//! reflection: a facade's method table must be built for the very type its
//! factory produces.

use std::any::{Any, TypeId, type_name};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::context::FacadeContext;
use crate::errors::RpcError;

mod method;

pub use self::method::{FacadeObject, MethodHandle, MethodTable, MethodTableBuilder, Shape};

/// Builds a facade instance for one connection.
pub type FacadeFactory =
    Arc<dyn Fn(&dyn FacadeContext) -> Result<FacadeObject, RpcError> + Send + Sync>;

/// Errors raised while populating or querying the registry.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// No facade is registered for the name and version.
    #[error("facade {name}({version}) not found")]
    NotFound {
        /// Requested name.
        name: String,
        /// Requested version.
        version: u32,
    },
    /// The name and version are already taken.
    #[error("facade {name}({version}) is already registered")]
    AlreadyRegistered {
        /// Conflicting name.
        name: String,
        /// Conflicting version.
        version: u32,
    },
    /// Facade names must be non-blank.
    #[error("facade name {name:?} is invalid")]
    InvalidName {
        /// Rejected name.
        name: String,
    },
    /// Method names must be non-blank.
    #[error("method table for {receiver} contains a blank method name")]
    InvalidMethodName {
        /// Receiver type of the table.
        receiver: &'static str,
    },
    /// A method name appears twice in one table.
    #[error("method {method} is declared twice for {receiver}")]
    DuplicateMethod {
        /// Receiver type of the table.
        receiver: &'static str,
        /// Repeated method name.
        method: String,
    },
    /// A method table was built for a different type than the facade.
    #[error("method table for {found} cannot serve facade type {expected}")]
    ReceiverMismatch {
        /// Declared facade type.
        expected: &'static str,
        /// Receiver type of the supplied table.
        found: &'static str,
    },
}

impl RegistryError {
    /// Returns `true` for lookups that found nothing.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Identifies a registered facade.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FacadeKey {
    name: String,
    version: u32,
}

impl FacadeKey {
    /// Builds a key.
    pub fn new(name: impl Into<String>, version: u32) -> Self {
        Self {
            name: name.into(),
            version,
        }
    }

    /// Facade name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Facade version.
    #[must_use]
    pub const fn version(&self) -> u32 {
        self.version
    }
}

impl fmt::Display for FacadeKey {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}({})", self.name, self.version)
    }
}

/// The capability a registered facade declares: its concrete type and the
/// methods callable on it.
#[derive(Clone)]
pub struct FacadeType {
    type_id: TypeId,
    type_name: &'static str,
    methods: Arc<MethodTable>,
}

impl fmt::Debug for FacadeType {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("FacadeType")
            .field("type_name", &self.type_name)
            .field("methods", &self.methods.method_names())
            .finish()
    }
}

impl FacadeType {
    /// Declares a facade type from its method table's receiver.
    #[must_use]
    pub fn new(methods: MethodTable) -> Self {
        Self {
            type_id: methods.receiver_type_id(),
            type_name: methods.receiver_type_name(),
            methods: Arc::new(methods),
        }
    }

    /// Declares `T` as the facade type and checks the table serves it.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::ReceiverMismatch`] when the table was built
    /// for another type.
    pub fn of<T: Any>(methods: MethodTable) -> Result<Self, RegistryError> {
        if methods.receiver_type_id() != TypeId::of::<T>() {
            return Err(RegistryError::ReceiverMismatch {
                expected: type_name::<T>(),
                found: methods.receiver_type_name(),
            });
        }
        Ok(Self::new(methods))
    }

    /// Name of the declared type.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Looks up a method by exact name.
    #[must_use]
    pub fn method(&self, name: &str) -> Option<&MethodHandle> {
        self.methods.get(name)
    }

    /// The full method table.
    #[must_use]
    pub fn methods(&self) -> &Arc<MethodTable> {
        &self.methods
    }

    /// Returns `true` when `object` is an instance of the declared type.
    #[must_use]
    pub fn matches(&self, object: &FacadeObject) -> bool {
        Any::type_id(object.as_ref()) == self.type_id
    }
}

/// A facade name with the versions registered for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FacadeDescription {
    /// Facade name.
    pub name: String,
    /// Registered versions in ascending order.
    pub versions: Vec<u32>,
}

struct FacadeRecord {
    facade_type: FacadeType,
    factory: FacadeFactory,
}

/// Registry of every facade the server can serve.
///
/// Enumeration order is by name, then version, both ascending.
#[derive(Default)]
pub struct FacadeRegistry {
    facades: BTreeMap<String, BTreeMap<u32, FacadeRecord>>,
}

impl fmt::Debug for FacadeRegistry {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("FacadeRegistry")
            .field("facades", &self.list())
            .finish()
    }
}

impl FacadeRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a facade whose factory returns the concrete type `T`.
    ///
    /// # Errors
    ///
    /// Fails for blank names, taken `(name, version)` pairs, and method
    /// tables built for a type other than `T`.
    pub fn register<T, F>(
        &mut self,
        name: &str,
        version: u32,
        methods: MethodTable,
        factory: F,
    ) -> Result<(), RegistryError>
    where
        T: Send + Sync + 'static,
        F: Fn(&dyn FacadeContext) -> Result<T, RpcError> + Send + Sync + 'static,
    {
        let facade_type = FacadeType::of::<T>(methods)?;
        let erased: FacadeFactory = Arc::new(move |context: &dyn FacadeContext| {
            factory(context).map(|facade| Arc::new(facade) as FacadeObject)
        });
        self.insert(name, version, facade_type, erased)
    }

    /// Registers a facade whose factory returns an already-erased object.
    ///
    /// The dispatcher checks every object such a factory builds against
    /// `facade_type` before caching it.
    ///
    /// # Errors
    ///
    /// Fails for blank names and taken `(name, version)` pairs.
    pub fn register_erased(
        &mut self,
        name: &str,
        version: u32,
        facade_type: FacadeType,
        factory: FacadeFactory,
    ) -> Result<(), RegistryError> {
        self.insert(name, version, facade_type, factory)
    }

    fn insert(
        &mut self,
        name: &str,
        version: u32,
        facade_type: FacadeType,
        factory: FacadeFactory,
    ) -> Result<(), RegistryError> {
        if name.trim().is_empty() || name.trim() != name {
            return Err(RegistryError::InvalidName {
                name: name.to_owned(),
            });
        }
        let versions = self.facades.entry(name.to_owned()).or_default();
        if versions.contains_key(&version) {
            return Err(RegistryError::AlreadyRegistered {
                name: name.to_owned(),
                version,
            });
        }
        versions.insert(
            version,
            FacadeRecord {
                facade_type,
                factory,
            },
        );
        Ok(())
    }

    /// Removes a registration. Returns `true` when one existed.
    pub fn discard(&mut self, name: &str, version: u32) -> bool {
        let Some(versions) = self.facades.get_mut(name) else {
            return false;
        };
        let removed = versions.remove(&version).is_some();
        if versions.is_empty() {
            self.facades.remove(name);
        }
        removed
    }

    fn record(&self, name: &str, version: u32) -> Result<&FacadeRecord, RegistryError> {
        self.facades
            .get(name)
            .and_then(|versions| versions.get(&version))
            .ok_or_else(|| RegistryError::NotFound {
                name: name.to_owned(),
                version,
            })
    }

    /// Declared type for a facade.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::NotFound`] when nothing is registered.
    pub fn get_type(&self, name: &str, version: u32) -> Result<&FacadeType, RegistryError> {
        self.record(name, version).map(|record| &record.facade_type)
    }

    /// Factory for a facade.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::NotFound`] when nothing is registered.
    pub fn get_factory(&self, name: &str, version: u32) -> Result<FacadeFactory, RegistryError> {
        self.record(name, version)
            .map(|record| Arc::clone(&record.factory))
    }

    /// Every registered facade with its versions.
    #[must_use]
    pub fn list(&self) -> Vec<FacadeDescription> {
        self.facades
            .iter()
            .map(|(name, versions)| FacadeDescription {
                name: name.clone(),
                versions: versions.keys().copied().collect(),
            })
            .collect()
    }

    /// Number of registered `(name, version)` pairs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.facades.values().map(BTreeMap::len).sum()
    }

    /// Returns `true` when nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.facades.is_empty()
    }
}
