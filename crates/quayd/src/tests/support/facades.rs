//! Small facades used to drive dispatch end to end.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use serde::{Deserialize, Serialize};

use quay_params::{ErrorCode, Tag};

use crate::connection::LoginHandle;
use crate::context::FacadeContext;
use crate::entity::Entity;
use crate::errors::RpcError;
use crate::registry::{FacadeRegistry, MethodTable, RegistryError};
use crate::root::{AdminApi, AdminApis};

/// Facade name the logger registers under.
pub const LOGGER: &str = "Logger";

/// The only admin version the fake admin serves.
pub const ADMIN_VERSION: u32 = 3;

/// A facade that records which instance answered each call.
#[derive(Debug)]
pub struct Logger {
    version: u32,
    instance: usize,
    object_id: String,
    owner: Tag,
}

#[derive(Debug, Deserialize)]
struct LogParams {
    message: String,
}

/// What a `Log` call returns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogReceipt {
    pub version: u32,
    pub instance: usize,
    pub object_id: String,
    pub owner: String,
    pub message: String,
}

impl Logger {
    fn build(
        context: &dyn FacadeContext,
        version: u32,
        constructions: &AtomicUsize,
    ) -> Result<Self, RpcError> {
        let auth = context.auth();
        let owner = auth.get_auth_tag().cloned().ok_or(RpcError::PermissionDenied)?;
        Ok(Self {
            version,
            instance: constructions.fetch_add(1, Ordering::SeqCst),
            object_id: context.id().to_owned(),
            owner,
        })
    }

    fn log(&self, params: LogParams) -> LogReceipt {
        LogReceipt {
            version: self.version,
            instance: self.instance,
            object_id: self.object_id.clone(),
            owner: self.owner.to_string(),
            message: params.message,
        }
    }
}

fn logger_methods() -> MethodTable {
    MethodTable::builder::<Logger>()
        .method("Log", |logger: &Logger, params: LogParams| {
            Ok(logger.log(params))
        })
        .method("Version", |logger: &Logger, (): ()| Ok(logger.version))
        .build()
        .expect("logger method table")
}

/// A registry serving `Logger` versions 1 and 2, counting constructions.
pub fn logger_registry(constructions: &Arc<AtomicUsize>) -> FacadeRegistry {
    let mut registry = FacadeRegistry::new();
    for version in [1, 2] {
        let counter = Arc::clone(constructions);
        registry
            .register(LOGGER, version, logger_methods(), move |context| {
                Logger::build(context, version, &counter)
            })
            .expect("register logger");
    }
    registry
}

/// Admin facade that logs its connection in as whatever tag it is given.
#[derive(Debug)]
pub struct FakeAdmin {
    login: LoginHandle,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct LoginRequest {
    auth_tag: String,
}

/// What a `Login` call returns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginResult {
    pub tag: String,
}

impl FakeAdmin {
    fn login(&self, request: LoginRequest) -> Result<LoginResult, RpcError> {
        let tag = request
            .auth_tag
            .parse::<Tag>()
            .map_err(|error| RpcError::facade(ErrorCode::BadRequest, error.to_string()))?;
        self.login.login(Entity::new(tag.clone()))?;
        Ok(LoginResult {
            tag: tag.to_string(),
        })
    }
}

/// Builds the admin versions a test connection serves before login.
pub fn admin_apis(login: LoginHandle) -> Result<AdminApis, RegistryError> {
    let methods = MethodTable::builder::<FakeAdmin>()
        .method("Login", FakeAdmin::login)
        .build()?;
    let mut apis = AdminApis::new();
    apis.insert(ADMIN_VERSION, AdminApi::new(FakeAdmin { login }, methods)?);
    Ok(apis)
}
