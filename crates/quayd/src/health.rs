//! Structured health reporting for server and connection lifecycle events.

use std::sync::Arc;

use quay_config::Config;
use quay_params::Tag;

use crate::bootstrap::BootstrapError;
use crate::resources::StopAllReport;

/// Observer trait used to surface lifecycle events to telemetry sinks.
pub trait HealthReporter: Send + Sync {
    /// Invoked before configuration loading begins.
    fn bootstrap_starting(&self);

    /// Invoked after bootstrap completes successfully.
    fn bootstrap_succeeded(&self, config: &Config);

    /// Invoked when bootstrap fails.
    fn bootstrap_failed(&self, error: &BootstrapError);

    /// Invoked when a connection's session has been set up.
    fn connection_opened(&self, server_host: &str, model_uuid: &str);

    /// Invoked when a connection logs in.
    fn login_succeeded(&self, tag: &Tag, model_uuid: &str);

    /// Invoked the first time a connection is torn down.
    fn connection_closed(&self, report: &StopAllReport);
}

impl<T> HealthReporter for Arc<T>
where
    T: HealthReporter,
{
    fn bootstrap_starting(&self) {
        (**self).bootstrap_starting();
    }

    fn bootstrap_succeeded(&self, config: &Config) {
        (**self).bootstrap_succeeded(config);
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        (**self).bootstrap_failed(error);
    }

    fn connection_opened(&self, server_host: &str, model_uuid: &str) {
        (**self).connection_opened(server_host, model_uuid);
    }

    fn login_succeeded(&self, tag: &Tag, model_uuid: &str) {
        (**self).login_succeeded(tag, model_uuid);
    }

    fn connection_closed(&self, report: &StopAllReport) {
        (**self).connection_closed(report);
    }
}

/// Default reporter that records lifecycle events using `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct StructuredHealthReporter;

impl StructuredHealthReporter {
    /// Builds a new reporter.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl HealthReporter for StructuredHealthReporter {
    fn bootstrap_starting(&self) {
        tracing::info!(
            target: "quayd::health",
            event = "bootstrap_starting",
            "starting API server bootstrap"
        );
    }

    fn bootstrap_succeeded(&self, config: &Config) {
        tracing::info!(
            target: "quayd::health",
            event = "bootstrap_succeeded",
            server_host = %config.server_host(),
            machine_id = %config.machine_id(),
            log_filter = %config.log_filter(),
            log_format = ?config.log_format(),
            "API server bootstrap completed"
        );
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        tracing::error!(
            target: "quayd::health",
            event = "bootstrap_failed",
            error = %error,
            "API server bootstrap failed"
        );
    }

    fn connection_opened(&self, server_host: &str, model_uuid: &str) {
        tracing::info!(
            target: "quayd::health",
            event = "connection_opened",
            server_host,
            model_uuid,
            "connection opened"
        );
    }

    fn login_succeeded(&self, tag: &Tag, model_uuid: &str) {
        tracing::info!(
            target: "quayd::health",
            event = "login_succeeded",
            tag = %tag,
            model_uuid,
            "connection logged in"
        );
    }

    fn connection_closed(&self, report: &StopAllReport) {
        if report.is_clean() {
            tracing::info!(
                target: "quayd::health",
                event = "connection_closed",
                stopped = report.stopped,
                "connection closed"
            );
        } else {
            tracing::warn!(
                target: "quayd::health",
                event = "connection_closed",
                stopped = report.stopped,
                failures = report.failures.len(),
                "connection closed with resource stop failures"
            );
        }
    }
}
