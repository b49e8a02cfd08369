//! Facade dispatch core of the Quay API server.
//!
//! Every client connection owns a [`Session`]: its backing-store handle, a
//! table of connection-scoped resources, and the identity it logged in as.
//! Calls arrive as `(facade, version, method)` triples plus an object id and
//! parameters. The connection's active root resolves the triple into a
//! [`MethodCaller`]; invoking the caller builds the facade on first use,
//! caches it for the rest of the connection, and runs the method.
//!
//! Before login the [`AnonRoot`] answers to nothing but `Admin`. A successful
//! login swaps in an [`ApiRoot`], which serves every facade in the shared
//! [`FacadeRegistry`]. Facade factories see the connection only through a
//! [`FacadeContext`], and check what the caller may do through the
//! [`Authorizer`] it exposes.
//!
//! Bootstrap mirrors the rest of the server: configuration comes from
//! [`quay_config`], telemetry is installed once, and lifecycle events are
//! surfaced through a [`HealthReporter`].

mod abort;
mod authorizer;
mod bootstrap;
mod connection;
mod context;
mod describe;
mod entity;
mod errors;
mod health;
mod permissions;
pub mod registry;
mod resources;
mod root;
mod session;
mod state;
pub mod telemetry;

pub use abort::{AbortHandle, AbortSignal, abort_pair};
pub use authorizer::Authorizer;
pub use bootstrap::{
    BootstrapError, ConfigLoader, DATA_DIR_RESOURCE, LOG_DIR_RESOURCE, MACHINE_ID_RESOURCE,
    Server, StaticConfigLoader, SystemConfigLoader, bootstrap_with,
};
pub use connection::{Connection, LoginHandle};
pub use context::FacadeContext;
pub use describe::describe_facades;
pub use entity::{Entity, MachineJob};
pub use errors::{CallNotImplemented, RpcError};
pub use health::{HealthReporter, StructuredHealthReporter};
pub use permissions::has_permission;
pub use registry::{
    FacadeDescription, FacadeFactory, FacadeKey, FacadeObject, FacadeRegistry, FacadeType,
    MethodHandle, MethodTable, RegistryError, Shape,
};
pub use resources::{Resource, ResourceError, Resources, StopAllReport, StringResource};
pub use root::{
    ADMIN_ROOT, AdminApi, AdminApis, AnonRoot, ApiRoot, Killer, MethodCaller, MethodFinder,
    ObjectKey,
};
pub use session::Session;
pub use state::{StateBackend, StoreError};
pub use telemetry::{TelemetryError, TelemetryHandle};

#[cfg(test)]
mod tests;
