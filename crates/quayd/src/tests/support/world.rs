//! BDD test world: a bootstrapped server, one client connection, and the
//! results of every call the scenario made.

use std::cell::RefCell;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use serde_json::{Value, json};

use quay_config::Config;
use quay_params::{CallRequest, ErrorCode};

use crate::bootstrap::{Server, StaticConfigLoader, bootstrap_with};
use crate::connection::Connection;
use crate::errors::RpcError;
use crate::resources::StopAllReport;
use crate::root::Killer;

use super::facades::{ADMIN_VERSION, LogReceipt, admin_apis, logger_registry};
use super::reporter::RecordingHealthReporter;
use super::state::GrantTable;

/// Scenario world shared across BDD steps.
pub struct TestWorld {
    pub reporter: Arc<RecordingHealthReporter>,
    constructions: Arc<AtomicUsize>,
    server: Option<Server>,
    connection: Option<Arc<Connection>>,
    results: Vec<Result<Value, RpcError>>,
    kills: Vec<StopAllReport>,
}

impl TestWorld {
    /// Builds an empty world.
    pub fn new() -> Self {
        Self {
            reporter: Arc::new(RecordingHealthReporter::default()),
            constructions: Arc::new(AtomicUsize::new(0)),
            server: None,
            connection: None,
            results: Vec::new(),
            kills: Vec::new(),
        }
    }

    /// Bootstraps a server whose registry serves `Logger` 1 and 2.
    pub fn start_server(&mut self) {
        let loader = StaticConfigLoader::new(Config {
            machine_id: "4".to_owned(),
            ..Config::default()
        });
        let registry = logger_registry(&self.constructions);
        let server = bootstrap_with(&loader, self.reporter.clone(), registry)
            .expect("bootstrap with a static configuration");
        self.server = Some(server);
    }

    /// Opens the scenario's connection against `model_uuid`.
    pub fn open_connection(&mut self, model_uuid: &str) {
        let server = self.server.as_ref().expect("server not started");
        let connection = server
            .open_connection(Arc::new(GrantTable::new()), model_uuid, admin_apis)
            .expect("open connection");
        self.connection = Some(connection);
    }

    fn connection(&self) -> &Arc<Connection> {
        self.connection.as_ref().expect("connection not opened")
    }

    /// Sends one request and records its outcome.
    pub fn call(&mut self, request: &CallRequest) {
        let outcome = self.connection().call(request);
        self.results.push(outcome);
    }

    /// Logs in through the admin facade.
    pub fn login(&mut self, tag: &str) {
        let request = CallRequest::new("Admin", ADMIN_VERSION, "Login")
            .with_params(json!({ "auth-tag": tag }));
        self.call(&request);
    }

    /// Tears the connection down.
    pub fn kill(&mut self) {
        let report = self.connection().kill();
        self.kills.push(report);
    }

    /// Whether the connection has logged in.
    pub fn is_authenticated(&self) -> bool {
        self.connection().is_authenticated()
    }

    /// Number of facades constructed so far.
    pub fn constructions(&self) -> usize {
        self.constructions.load(Ordering::SeqCst)
    }

    /// Outcome of the most recent call.
    pub fn last_result(&self) -> &Result<Value, RpcError> {
        self.results.last().expect("no call was made")
    }

    /// Error code of the most recent call, which must have failed.
    pub fn last_error_code(&self) -> ErrorCode {
        match self.last_result() {
            Ok(value) => panic!("call succeeded unexpectedly with {value}"),
            Err(error) => error.code(),
        }
    }

    /// Logger receipts in call order, skipping every other kind of result.
    pub fn receipts(&self) -> Vec<LogReceipt> {
        self.results
            .iter()
            .filter_map(|outcome| outcome.as_ref().ok())
            .filter_map(|value| serde_json::from_value(value.clone()).ok())
            .collect()
    }

    /// Every recorded call outcome.
    pub fn results(&self) -> &[Result<Value, RpcError>] {
        &self.results
    }

    /// Teardown reports in kill order.
    pub fn kills(&self) -> &[StopAllReport] {
        &self.kills
    }
}

impl Default for TestWorld {
    fn default() -> Self {
        Self::new()
    }
}

/// Default test world fixture.
pub fn world() -> RefCell<TestWorld> {
    RefCell::new(TestWorld::new())
}
