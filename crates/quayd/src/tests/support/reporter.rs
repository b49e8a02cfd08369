//! Test double for [`HealthReporter`] that records lifecycle events.

use std::sync::Mutex;

use quay_config::Config;
use quay_params::Tag;

use crate::bootstrap::BootstrapError;
use crate::health::HealthReporter;
use crate::resources::StopAllReport;

/// Health events tracked during scenarios.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthEvent {
    BootstrapStarting,
    BootstrapSucceeded,
    BootstrapFailed(String),
    ConnectionOpened { model_uuid: String },
    LoginSucceeded { tag: String },
    ConnectionClosed { stopped: usize, failures: usize },
}

/// Records health events for assertions.
#[derive(Debug, Default)]
pub struct RecordingHealthReporter {
    events: Mutex<Vec<HealthEvent>>,
}

impl RecordingHealthReporter {
    /// Captures a copy of the recorded events.
    pub fn events(&self) -> Vec<HealthEvent> {
        self.events
            .lock()
            .expect("health reporter mutex poisoned")
            .clone()
    }

    fn record(&self, event: HealthEvent) {
        self.events
            .lock()
            .expect("health reporter mutex poisoned")
            .push(event);
    }
}

impl HealthReporter for RecordingHealthReporter {
    fn bootstrap_starting(&self) {
        self.record(HealthEvent::BootstrapStarting);
    }

    fn bootstrap_succeeded(&self, _config: &Config) {
        self.record(HealthEvent::BootstrapSucceeded);
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        self.record(HealthEvent::BootstrapFailed(error.to_string()));
    }

    fn connection_opened(&self, _server_host: &str, model_uuid: &str) {
        self.record(HealthEvent::ConnectionOpened {
            model_uuid: model_uuid.to_owned(),
        });
    }

    fn login_succeeded(&self, tag: &Tag, _model_uuid: &str) {
        self.record(HealthEvent::LoginSucceeded {
            tag: tag.to_string(),
        });
    }

    fn connection_closed(&self, report: &StopAllReport) {
        self.record(HealthEvent::ConnectionClosed {
            stopped: report.stopped,
            failures: report.failures.len(),
        });
    }
}
