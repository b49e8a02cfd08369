//! Per-connection identity, resources, and scope.

use std::fmt;
use std::sync::{Arc, OnceLock};

use quay_params::{Access, Tag, TagKind};

use crate::authorizer::Authorizer;
use crate::entity::{Entity, MachineJob};
use crate::errors::RpcError;
use crate::permissions::has_permission;
use crate::resources::{Resource, ResourceError, Resources, StopAllReport};
use crate::state::{StateBackend, StoreError};

/// State shared by every root that serves one connection.
///
/// The session starts unauthenticated. [`Session::authenticate`] records the
/// logged-in entity exactly once; it cannot change afterwards.
pub struct Session {
    state: Arc<dyn StateBackend>,
    resources: Arc<Resources>,
    entity: OnceLock<Entity>,
    model_uuid: String,
    server_host: String,
}

impl fmt::Debug for Session {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Session")
            .field("entity", &self.entity.get())
            .field("model_uuid", &self.model_uuid)
            .field("server_host", &self.server_host)
            .field("resources", &self.resources)
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Creates an unauthenticated session.
    ///
    /// An empty `model_uuid` means the client connected to the controller
    /// root rather than to a model endpoint.
    pub fn new(
        state: Arc<dyn StateBackend>,
        model_uuid: impl Into<String>,
        server_host: impl Into<String>,
    ) -> Self {
        Self {
            state,
            resources: Arc::new(Resources::new()),
            entity: OnceLock::new(),
            model_uuid: model_uuid.into(),
            server_host: server_host.into(),
        }
    }

    /// Records the entity the connection logged in as.
    ///
    /// # Errors
    ///
    /// Returns [`RpcError::AlreadyLoggedIn`] when an entity is already set.
    pub fn authenticate(&self, entity: Entity) -> Result<(), RpcError> {
        self.entity
            .set(entity)
            .map_err(|_| RpcError::AlreadyLoggedIn)
    }

    /// Returns `true` once a login has succeeded.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.entity.get().is_some()
    }

    /// Backing store handle.
    #[must_use]
    pub fn state(&self) -> &Arc<dyn StateBackend> {
        &self.state
    }

    /// The connection's resource table.
    #[must_use]
    pub fn resources(&self) -> &Arc<Resources> {
        &self.resources
    }

    /// `host:port` the client connected to.
    #[must_use]
    pub fn server_host(&self) -> &str {
        self.server_host.as_str()
    }

    /// Registers a named resource that stops when the session ends.
    ///
    /// # Errors
    ///
    /// Fails when the name is already registered or the session has ended.
    pub fn register_resource(
        &self,
        name: impl Into<String>,
        resource: Arc<dyn Resource>,
    ) -> Result<(), ResourceError> {
        self.resources.register_named(name, resource)
    }

    /// Stops every resource the session holds.
    pub fn kill(&self) -> StopAllReport {
        self.resources.stop_all()
    }

    fn auth_kind(&self) -> Option<TagKind> {
        self.entity.get().map(|entity| entity.tag().kind())
    }
}

impl Authorizer for Session {
    fn auth_machine_agent(&self) -> bool {
        self.auth_kind() == Some(TagKind::Machine)
    }

    fn auth_unit_agent(&self) -> bool {
        self.auth_kind() == Some(TagKind::Unit)
    }

    fn auth_client(&self) -> bool {
        self.auth_kind() == Some(TagKind::User)
    }

    fn auth_owner(&self, tag: &Tag) -> bool {
        self.get_auth_tag() == Some(tag)
    }

    fn auth_model_manager(&self) -> bool {
        self.entity
            .get()
            .is_some_and(|entity| entity.is_machine_with_job(MachineJob::ManageModel))
    }

    fn get_auth_tag(&self) -> Option<&Tag> {
        self.entity.get().map(Entity::tag)
    }

    fn get_auth_entity(&self) -> Option<&Entity> {
        self.entity.get()
    }

    fn connected_model(&self) -> &str {
        self.model_uuid.as_str()
    }

    fn has_permission(&self, operation: Access, target: &Tag) -> Result<bool, StoreError> {
        match self.get_auth_tag() {
            Some(tag) => has_permission(self.state.as_ref(), tag, operation, target),
            None => Ok(false),
        }
    }

    fn user_has_permission(
        &self,
        user: &Tag,
        operation: Access,
        target: &Tag,
    ) -> Result<bool, StoreError> {
        has_permission(self.state.as_ref(), user, operation, target)
    }
}
