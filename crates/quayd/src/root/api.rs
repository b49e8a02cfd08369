//! Post-login root dispatching to the facade registry.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock};

use tracing::{debug, error, warn};

use crate::abort::AbortSignal;
use crate::context::CallContext;
use crate::errors::RpcError;
use crate::registry::{FacadeObject, FacadeRegistry, FacadeType, MethodHandle};
use crate::resources::StopAllReport;
use crate::session::Session;

use super::{DISPATCH_TARGET, Killer, MethodCaller, MethodFinder, ObjectResolver};

/// Identifies one facade instance within a connection.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectKey {
    name: String,
    version: u32,
    object_id: String,
}

impl ObjectKey {
    /// Builds a key.
    pub fn new(name: impl Into<String>, version: u32, object_id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version,
            object_id: object_id.into(),
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

    /// Object id chosen by the caller.
    #[must_use]
    pub fn object_id(&self) -> &str {
        self.object_id.as_str()
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            formatter,
            "{}({}) id {:?}",
            self.name, self.version, self.object_id
        )
    }
}

/// Root used once a connection has logged in.
///
/// Facades are built lazily on the first call that needs them and cached
/// for the life of the connection. Concurrent callers racing on the same
/// [`ObjectKey`] all observe a single instance: lookups take the shared lock,
/// and a miss re-checks under the exclusive lock before constructing.
/// Construction runs under that exclusive lock, so a slow factory delays
/// other misses on this connection only.
#[derive(Clone)]
pub struct ApiRoot {
    inner: Arc<ApiRootInner>,
}

struct ApiRootInner {
    registry: Arc<FacadeRegistry>,
    session: Arc<Session>,
    abort: AbortSignal,
    objects: RwLock<HashMap<ObjectKey, FacadeObject>>,
}

impl fmt::Debug for ApiRoot {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("ApiRoot")
            .field("session", &self.inner.session)
            .field("cached_objects", &self.cached_objects())
            .finish_non_exhaustive()
    }
}

impl ApiRoot {
    /// Builds a root whose facades see a signal that never fires.
    #[must_use]
    pub fn new(registry: Arc<FacadeRegistry>, session: Arc<Session>) -> Self {
        Self::with_abort_signal(registry, session, AbortSignal::never())
    }

    /// Builds a root handing `abort` to every facade it constructs.
    #[must_use]
    pub fn with_abort_signal(
        registry: Arc<FacadeRegistry>,
        session: Arc<Session>,
        abort: AbortSignal,
    ) -> Self {
        Self {
            inner: Arc::new(ApiRootInner {
                registry,
                session,
                abort,
                objects: RwLock::new(HashMap::new()),
            }),
        }
    }

    /// The session this root serves.
    #[must_use]
    pub fn session(&self) -> &Arc<Session> {
        &self.inner.session
    }

    /// Number of facade instances constructed so far.
    #[must_use]
    pub fn cached_objects(&self) -> usize {
        self.inner.objects.read().map_or(0, |objects| objects.len())
    }
}

impl MethodFinder for ApiRoot {
    fn find_method(
        &self,
        root_name: &str,
        version: u32,
        method_name: &str,
    ) -> Result<MethodCaller, RpcError> {
        let (facade_type, method) =
            lookup_method(&self.inner.registry, root_name, version, method_name)?;
        debug!(
            target: DISPATCH_TARGET,
            facade = root_name,
            version,
            method = method_name,
            "resolved method"
        );

        let inner = Arc::clone(&self.inner);
        let name = root_name.to_owned();
        let resolve: ObjectResolver = Arc::new(move |object_id: &str| {
            inner.object(&ObjectKey::new(name.as_str(), version, object_id), &facade_type)
        });
        Ok(MethodCaller::new(method, resolve))
    }
}

impl Killer for ApiRoot {
    fn kill(&self) -> StopAllReport {
        let report = self.inner.session.kill();
        match self.inner.objects.write() {
            Ok(mut objects) => objects.clear(),
            Err(poisoned) => poisoned.into_inner().clear(),
        }
        report
    }
}

impl ApiRootInner {
    /// Returns the cached instance for `key`, constructing it on a miss.
    fn object(&self, key: &ObjectKey, declared: &FacadeType) -> Result<FacadeObject, RpcError> {
        {
            let objects = self
                .objects
                .read()
                .map_err(|_| RpcError::internal("object cache lock poisoned"))?;
            if let Some(object) = objects.get(key) {
                return Ok(Arc::clone(object));
            }
        }

        let mut objects = self
            .objects
            .write()
            .map_err(|_| RpcError::internal("object cache lock poisoned"))?;
        // Another caller may have constructed it while we waited.
        if let Some(object) = objects.get(key) {
            return Ok(Arc::clone(object));
        }

        let factory = self
            .registry
            .get_factory(key.name(), key.version())
            .map_err(|_| RpcError::unknown_facade(key.name(), key.version()))?;
        let context = CallContext::new(&self.session, &self.abort, key.object_id());
        let object = factory(&context).inspect_err(|error| {
            warn!(
                target: DISPATCH_TARGET,
                object = %key,
                error = %error,
                "facade construction failed"
            );
        })?;

        if !declared.matches(&object) {
            error!(
                target: DISPATCH_TARGET,
                object = %key,
                declared = declared.type_name(),
                "facade factory produced an undeclared type"
            );
            return Err(RpcError::internal_inconsistency(format!(
                "factory for {key} did not produce the declared type {}",
                declared.type_name()
            )));
        }

        debug!(target: DISPATCH_TARGET, object = %key, "constructed facade");
        objects.insert(key.clone(), Arc::clone(&object));
        Ok(object)
    }
}

fn lookup_method(
    registry: &FacadeRegistry,
    root_name: &str,
    version: u32,
    method_name: &str,
) -> Result<(FacadeType, MethodHandle), RpcError> {
    let facade_type = registry
        .get_type(root_name, version)
        .map_err(|_| RpcError::unknown_facade(root_name, version))?;
    let method = facade_type
        .method(method_name)
        .cloned()
        .ok_or_else(|| RpcError::unknown_method(root_name, version, method_name))?;
    Ok((facade_type.clone(), method))
}
