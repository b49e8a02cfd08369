//! Entry point for the Quay API server.
//!
//! Loads layered configuration, installs telemetry, and reports readiness
//! through the structured health reporter.

use std::process::ExitCode;
use std::sync::Arc;

use quayd::{FacadeRegistry, StructuredHealthReporter, SystemConfigLoader, bootstrap_with};

fn main() -> ExitCode {
    let reporter = Arc::new(StructuredHealthReporter::new());
    match bootstrap_with(&SystemConfigLoader, reporter, FacadeRegistry::new()) {
        Ok(server) => {
            tracing::info!(
                target: "quayd::health",
                facades = server.describe_facades().len(),
                server_host = %server.config().server_host(),
                "API server ready"
            );
            ExitCode::SUCCESS
        }
        Err(_) => ExitCode::FAILURE,
    }
}
