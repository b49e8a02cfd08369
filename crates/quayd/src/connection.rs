//! One client connection: the session plus whichever root is active.
//!
//! A connection starts on an [`AnonRoot`] and switches to an [`ApiRoot`]
//! over the same session when the admin facade logs it in. The transport
//! only ever talks to the connection through [`MethodFinder`] and [`Killer`].

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock, Weak};

use serde_json::Value;

use quay_params::CallRequest;

use crate::abort::AbortSignal;
use crate::authorizer::Authorizer;
use crate::entity::Entity;
use crate::errors::RpcError;
use crate::health::HealthReporter;
use crate::registry::{FacadeRegistry, RegistryError};
use crate::resources::StopAllReport;
use crate::root::{AdminApis, AnonRoot, ApiRoot, Killer, MethodCaller, MethodFinder};
use crate::session::Session;

enum ActiveRoot {
    Anonymous(AnonRoot),
    Authenticated(ApiRoot),
}

impl ActiveRoot {
    fn finder(&self) -> &dyn MethodFinder {
        match self {
            Self::Anonymous(root) => root,
            Self::Authenticated(root) => root,
        }
    }

    fn kill(&self) -> StopAllReport {
        match self {
            Self::Anonymous(root) => root.kill(),
            Self::Authenticated(root) => root.kill(),
        }
    }
}

/// Lets an admin facade log its own connection in.
///
/// The handle holds the connection weakly, so admin implementations can keep
/// it without keeping the connection alive.
#[derive(Clone, Debug)]
pub struct LoginHandle {
    connection: Weak<Connection>,
}

impl LoginHandle {
    /// Logs the connection in as `entity`.
    ///
    /// # Errors
    ///
    /// Fails when the connection is gone or has already logged in.
    pub fn login(&self, entity: Entity) -> Result<(), RpcError> {
        self.connection
            .upgrade()
            .ok_or_else(|| RpcError::internal("connection no longer exists"))?
            .login(entity)
    }
}

/// A client connection and its active dispatch root.
pub struct Connection {
    session: Arc<Session>,
    registry: Arc<FacadeRegistry>,
    abort: AbortSignal,
    reporter: Arc<dyn HealthReporter>,
    root: RwLock<ActiveRoot>,
    closed: AtomicBool,
}

impl fmt::Debug for Connection {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Connection")
            .field("session", &self.session)
            .field("authenticated", &self.is_authenticated())
            .field("closed", &self.closed.load(Ordering::Acquire))
            .finish_non_exhaustive()
    }
}

impl Connection {
    /// Opens a connection over `session`, starting on the anonymous root.
    ///
    /// `admin_apis` receives a [`LoginHandle`] for this connection and
    /// returns the admin versions the anonymous root serves.
    ///
    /// # Errors
    ///
    /// Returns whatever `admin_apis` fails with.
    pub fn open<F>(
        session: Arc<Session>,
        registry: Arc<FacadeRegistry>,
        reporter: Arc<dyn HealthReporter>,
        abort: AbortSignal,
        admin_apis: F,
    ) -> Result<Arc<Self>, RegistryError>
    where
        F: FnOnce(LoginHandle) -> Result<AdminApis, RegistryError>,
    {
        let mut failure = None;
        let connection = Arc::new_cyclic(|weak| {
            let handle = LoginHandle {
                connection: weak.clone(),
            };
            let apis = admin_apis(handle).unwrap_or_else(|error| {
                failure = Some(error);
                AdminApis::new()
            });
            Self {
                root: RwLock::new(ActiveRoot::Anonymous(AnonRoot::new(
                    Arc::clone(&session),
                    apis,
                ))),
                session,
                registry,
                abort,
                reporter,
                closed: AtomicBool::new(false),
            }
        });
        match failure {
            Some(error) => {
                connection.session.kill();
                Err(error)
            }
            None => Ok(connection),
        }
    }

    /// The connection's session.
    #[must_use]
    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    /// Returns `true` once the connection has logged in.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.session.is_authenticated()
    }

    /// Returns `true` once the connection has been killed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Authenticates the session and switches to the full API root.
    ///
    /// # Errors
    ///
    /// Returns [`RpcError::AlreadyLoggedIn`] on a second login and
    /// [`RpcError::Internal`] when the connection has been killed.
    pub fn login(&self, entity: Entity) -> Result<(), RpcError> {
        if self.is_closed() {
            return Err(RpcError::internal("connection is closed"));
        }
        let tag = entity.tag().clone();
        let mut root = self
            .root
            .write()
            .map_err(|_| RpcError::internal("active root lock poisoned"))?;
        self.session.authenticate(entity)?;
        *root = ActiveRoot::Authenticated(ApiRoot::with_abort_signal(
            Arc::clone(&self.registry),
            Arc::clone(&self.session),
            self.abort.clone(),
        ));
        drop(root);

        self.reporter
            .login_succeeded(&tag, self.session.connected_model());
        Ok(())
    }

    /// Resolves and invokes one request.
    ///
    /// # Errors
    ///
    /// Returns routing, construction, and method failures unchanged.
    pub fn call(&self, request: &CallRequest) -> Result<Value, RpcError> {
        let caller = self.find_method(&request.facade, request.version, &request.request)?;
        caller.call(&request.id, request.params.clone())
    }
}

impl MethodFinder for Connection {
    fn find_method(
        &self,
        root_name: &str,
        version: u32,
        method_name: &str,
    ) -> Result<MethodCaller, RpcError> {
        // A killed root has stopped its resources; resolving through it
        // would build fresh facades nobody will ever stop.
        if self.is_closed() {
            return Err(RpcError::internal("connection is closed"));
        }
        // Resolution only; the lock is released before the call runs so a
        // login from inside an admin method can take it exclusively.
        let root = self
            .root
            .read()
            .map_err(|_| RpcError::internal("active root lock poisoned"))?;
        root.finder().find_method(root_name, version, method_name)
    }
}

impl Killer for Connection {
    fn kill(&self) -> StopAllReport {
        // Closed before teardown so no lookup can race in a new facade.
        let first = !self.closed.swap(true, Ordering::AcqRel);
        let report = match self.root.read() {
            Ok(root) => root.kill(),
            Err(_) => self.session.kill(),
        };
        if first {
            self.reporter.connection_closed(&report);
        }
        report
    }
}
