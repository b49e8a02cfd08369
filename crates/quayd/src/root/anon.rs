//! Pre-login root that only answers to the `Admin` facade.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::errors::RpcError;
use crate::registry::{FacadeObject, FacadeType, MethodTable, RegistryError};
use crate::resources::StopAllReport;
use crate::session::Session;

use super::{DISPATCH_TARGET, Killer, MethodCaller, MethodFinder, ObjectResolver};

/// The only facade name served before login.
pub const ADMIN_ROOT: &str = "Admin";

/// One version of the admin facade, already constructed.
#[derive(Clone)]
pub struct AdminApi {
    object: FacadeObject,
    methods: Arc<MethodTable>,
}

impl fmt::Debug for AdminApi {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("AdminApi")
            .field("methods", &self.methods.method_names())
            .finish_non_exhaustive()
    }
}

impl AdminApi {
    /// Wraps an admin implementation with its method table.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::ReceiverMismatch`] when `methods` was built
    /// for a type other than `T`.
    pub fn new<T>(api: T, methods: MethodTable) -> Result<Self, RegistryError>
    where
        T: Send + Sync + 'static,
    {
        let facade_type = FacadeType::of::<T>(methods)?;
        Ok(Self {
            object: Arc::new(api),
            methods: Arc::clone(facade_type.methods()),
        })
    }
}

/// Admin implementations keyed by the client-facing version.
pub type AdminApis = BTreeMap<u32, AdminApi>;

/// Root serving a connection that has not logged in.
///
/// It never holds an entity of its own and exposes nothing but `Admin`, so
/// the only way forward for a client is to log in.
#[derive(Debug)]
pub struct AnonRoot {
    session: Arc<Session>,
    admin_apis: AdminApis,
}

impl AnonRoot {
    /// Builds the root over `session` with the given admin versions.
    #[must_use]
    pub const fn new(session: Arc<Session>, admin_apis: AdminApis) -> Self {
        Self {
            session,
            admin_apis,
        }
    }

    /// The session this root serves.
    #[must_use]
    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }
}

impl MethodFinder for AnonRoot {
    fn find_method(
        &self,
        root_name: &str,
        version: u32,
        method_name: &str,
    ) -> Result<MethodCaller, RpcError> {
        if root_name != ADMIN_ROOT {
            debug!(
                target: DISPATCH_TARGET,
                facade = root_name,
                version,
                "rejected call before login"
            );
            return Err(RpcError::unknown_facade(root_name, version));
        }
        let api = self
            .admin_apis
            .get(&version)
            .ok_or_else(|| RpcError::unsupported_client_version(version))?;
        let method = api
            .methods
            .get(method_name)
            .cloned()
            .ok_or_else(|| RpcError::unknown_method(ADMIN_ROOT, version, method_name))?;

        let object = Arc::clone(&api.object);
        let resolve: ObjectResolver = Arc::new(move |_: &str| Ok(Arc::clone(&object)));
        Ok(MethodCaller::new(method, resolve))
    }
}

impl Killer for AnonRoot {
    fn kill(&self) -> StopAllReport {
        self.session.kill()
    }
}
