//! Test harness utilities shared by the unit and behavioural suites.

mod facades;
mod reporter;
mod state;
mod world;

pub use facades::{ADMIN_VERSION, LogReceipt, LoginResult, admin_apis, logger_registry};
pub use reporter::{HealthEvent, RecordingHealthReporter};
pub use state::GrantTable;
pub use world::{TestWorld, world};
