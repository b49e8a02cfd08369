//! Server bootstrap and per-connection set-up.

use std::sync::Arc;

use ortho_config::{OrthoConfig, OrthoError};
use thiserror::Error;

use quay_config::Config;
use quay_params::FacadeVersions;

use crate::abort::AbortSignal;
use crate::connection::{Connection, LoginHandle};
use crate::describe::describe_facades;
use crate::errors::RpcError;
use crate::health::HealthReporter;
use crate::registry::{FacadeRegistry, RegistryError};
use crate::resources::StringResource;
use crate::root::AdminApis;
use crate::session::Session;
use crate::state::StateBackend;
use crate::telemetry::{self, TelemetryError, TelemetryHandle};

/// Resource name under which every session carries the controller machine id.
pub const MACHINE_ID_RESOURCE: &str = "machineID";
/// Resource name for the server's data directory.
pub const DATA_DIR_RESOURCE: &str = "dataDir";
/// Resource name for the server's log directory.
pub const LOG_DIR_RESOURCE: &str = "logDir";

/// Trait abstracting configuration loading for testability.
pub trait ConfigLoader: Send + Sync {
    /// Loads the server configuration.
    ///
    /// # Errors
    ///
    /// Returns the loader's error when no valid configuration can be built.
    fn load(&self) -> Result<Config, Arc<OrthoError>>;
}

/// Loader that delegates to [`Config::load`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemConfigLoader;

impl ConfigLoader for SystemConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Config::load()
    }
}

/// Loader that hands out a fixed configuration.
#[derive(Debug, Default, Clone)]
pub struct StaticConfigLoader {
    config: Config,
}

impl StaticConfigLoader {
    /// Wraps `config`.
    #[must_use]
    pub const fn new(config: Config) -> Self {
        Self { config }
    }
}

impl ConfigLoader for StaticConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Ok(self.config.clone())
    }
}

/// Errors surfaced during bootstrap.
#[derive(Debug, Error)]
pub enum BootstrapError {
    /// Configuration failed to load.
    #[error("failed to load configuration: {source}")]
    Configuration {
        /// Underlying loader error.
        #[source]
        source: Arc<OrthoError>,
    },
    /// Telemetry initialisation failed.
    #[error("failed to initialise telemetry: {source}")]
    Telemetry {
        /// Underlying telemetry error.
        #[source]
        source: TelemetryError,
    },
}

/// A bootstrapped API server, ready to accept connections.
pub struct Server {
    config: Config,
    registry: Arc<FacadeRegistry>,
    telemetry: TelemetryHandle,
    reporter: Arc<dyn HealthReporter>,
}

impl std::fmt::Debug for Server {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("Server")
            .field("config", &self.config)
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

impl Server {
    /// Accessor for the resolved configuration.
    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// The shared facade registry.
    #[must_use]
    pub const fn registry(&self) -> &Arc<FacadeRegistry> {
        &self.registry
    }

    /// Accessor for the telemetry handle, primarily useful for testing.
    #[must_use]
    pub const fn telemetry(&self) -> TelemetryHandle {
        self.telemetry
    }

    /// Every facade this server can serve.
    #[must_use]
    pub fn describe_facades(&self) -> Vec<FacadeVersions> {
        describe_facades(&self.registry)
    }

    /// Sets up a connection against `model_uuid` (empty for the controller).
    ///
    /// The new session carries the controller machine id and the data and
    /// log directories as string resources. `admin_apis` builds the admin
    /// versions served before login.
    ///
    /// # Errors
    ///
    /// Fails when the session resources cannot be registered or the admin
    /// implementations do not match their method tables.
    pub fn open_connection<F>(
        &self,
        state: Arc<dyn StateBackend>,
        model_uuid: &str,
        admin_apis: F,
    ) -> Result<Arc<Connection>, RpcError>
    where
        F: FnOnce(LoginHandle) -> Result<AdminApis, RegistryError>,
    {
        self.open_connection_with_abort(state, model_uuid, AbortSignal::never(), admin_apis)
    }

    /// Like [`Server::open_connection`], handing `abort` to every facade the
    /// connection constructs.
    ///
    /// # Errors
    ///
    /// See [`Server::open_connection`].
    pub fn open_connection_with_abort<F>(
        &self,
        state: Arc<dyn StateBackend>,
        model_uuid: &str,
        abort: AbortSignal,
        admin_apis: F,
    ) -> Result<Arc<Connection>, RpcError>
    where
        F: FnOnce(LoginHandle) -> Result<AdminApis, RegistryError>,
    {
        let session = Arc::new(Session::new(
            state,
            model_uuid,
            self.config.server_host(),
        ));
        let resources = [
            (MACHINE_ID_RESOURCE, self.config.machine_id()),
            (DATA_DIR_RESOURCE, self.config.data_dir().as_str()),
            (LOG_DIR_RESOURCE, self.config.log_dir().as_str()),
        ];
        for (name, value) in resources {
            session.register_resource(name, Arc::new(StringResource::new(value)))?;
        }

        let connection = Connection::open(
            Arc::clone(&session),
            Arc::clone(&self.registry),
            Arc::clone(&self.reporter),
            abort,
            admin_apis,
        )
        .map_err(|error| RpcError::internal_inconsistency(error.to_string()))?;
        self.reporter
            .connection_opened(session.server_host(), model_uuid);
        Ok(connection)
    }
}

/// Bootstraps the server using the supplied collaborators.
///
/// # Errors
///
/// Fails when configuration cannot be loaded or telemetry cannot be
/// installed. Each failure is also passed to the reporter.
pub fn bootstrap_with(
    loader: &dyn ConfigLoader,
    reporter: Arc<dyn HealthReporter>,
    registry: FacadeRegistry,
) -> Result<Server, BootstrapError> {
    reporter.bootstrap_starting();

    let config = match loader.load() {
        Ok(config) => config,
        Err(source) => {
            let error = BootstrapError::Configuration { source };
            reporter.bootstrap_failed(&error);
            return Err(error);
        }
    };

    let telemetry = match telemetry::initialise(&config) {
        Ok(handle) => handle,
        Err(source) => {
            let error = BootstrapError::Telemetry { source };
            reporter.bootstrap_failed(&error);
            return Err(error);
        }
    };

    reporter.bootstrap_succeeded(&config);
    Ok(Server {
        config,
        registry: Arc::new(registry),
        telemetry,
        reporter,
    })
}
