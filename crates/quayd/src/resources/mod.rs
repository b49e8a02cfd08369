//! Connection-scoped resource table.
//!
//! Resources are registered when a session is created (the hosting machine's
//! id and directories) and by facades while they serve calls. Every resource
//! is stopped exactly once when the connection ends: [`Resources::stop_all`]
//! drains the table under its lock before stopping anything, so repeated or
//! concurrent teardown finds nothing left to stop.

use std::any::Any;
use std::sync::{Arc, Mutex, MutexGuard};

use thiserror::Error;
use tracing::{debug, warn};

/// Tracing target for resource lifecycle events.
pub(crate) const RESOURCES_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::resources");

/// Errors raised by the resource table.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ResourceError {
    /// A resource with the same name already exists.
    #[error("resource {name:?} is already registered")]
    AlreadyRegistered {
        /// Conflicting name.
        name: String,
    },
    /// The table has been torn down.
    #[error("cannot register resource {name:?}: resources already stopped")]
    Closed {
        /// Name of the rejected resource.
        name: String,
    },
    /// No resource has the given name.
    #[error("resource {name:?} not found")]
    NotFound {
        /// Requested name.
        name: String,
    },
    /// A resource failed to stop.
    #[error("failed to stop resource {name:?}: {message}")]
    Stop {
        /// Name of the failing resource.
        name: String,
        /// Failure reported by the resource.
        message: String,
    },
    /// The table lock was poisoned by a panicking thread.
    #[error("resource table lock poisoned")]
    Poisoned,
}

/// Anything that must be released when its connection ends.
pub trait Resource: Any + Send + Sync {
    /// Releases the resource.
    ///
    /// # Errors
    ///
    /// Returns a description of the failure; the table records it and
    /// carries on stopping the remaining resources.
    fn stop(&self) -> Result<(), String>;
}

/// A plain value exposed to facades through the resource table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StringResource(String);

impl StringResource {
    /// Wraps a value.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the wrapped value.
    #[must_use]
    pub fn value(&self) -> &str {
        self.0.as_str()
    }
}

impl Resource for StringResource {
    fn stop(&self) -> Result<(), String> {
        Ok(())
    }
}

/// Outcome of tearing down a resource table.
#[derive(Debug, Default)]
pub struct StopAllReport {
    /// Number of resources stopped successfully.
    pub stopped: usize,
    /// Resources whose stop failed.
    pub failures: Vec<ResourceError>,
}

impl StopAllReport {
    /// Returns `true` when every drained resource stopped cleanly.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

#[derive(Default)]
struct ResourceTable {
    entries: Vec<(String, Arc<dyn Resource>)>,
    next_id: u64,
    closed: bool,
}

impl ResourceTable {
    fn position(&self, name: &str) -> Option<usize> {
        self.entries.iter().position(|(entry, _)| entry == name)
    }
}

/// Named resources owned by one connection.
#[derive(Default)]
pub struct Resources {
    table: Mutex<ResourceTable>,
}

impl std::fmt::Debug for Resources {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("Resources")
            .field("len", &self.len())
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl Resources {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, ResourceTable>, ResourceError> {
        self.table.lock().map_err(|_| ResourceError::Poisoned)
    }

    /// Registers a resource under a generated numeric id and returns the id.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::Closed`] after teardown.
    pub fn register(&self, resource: Arc<dyn Resource>) -> Result<String, ResourceError> {
        let mut table = self.lock()?;
        loop {
            table.next_id += 1;
            let id = table.next_id.to_string();
            if table.position(&id).is_none() {
                insert(&mut table, id.clone(), resource)?;
                return Ok(id);
            }
        }
    }

    /// Registers a resource under a caller-chosen name.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::AlreadyRegistered`] when the name is taken and
    /// [`ResourceError::Closed`] after teardown.
    pub fn register_named(
        &self,
        name: impl Into<String>,
        resource: Arc<dyn Resource>,
    ) -> Result<(), ResourceError> {
        let name = name.into();
        let mut table = self.lock()?;
        if table.position(&name).is_some() {
            return Err(ResourceError::AlreadyRegistered { name });
        }
        insert(&mut table, name, resource)
    }

    /// Looks up a resource by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<dyn Resource>> {
        let table = self.lock().ok()?;
        let index = table.position(name)?;
        table.entries.get(index).map(|(_, resource)| Arc::clone(resource))
    }

    /// Looks up a resource by name and downcasts it to its concrete type.
    #[must_use]
    pub fn get_as<T: Resource>(&self, name: &str) -> Option<Arc<T>> {
        let resource: Arc<dyn Any + Send + Sync> = self.get(name)?;
        resource.downcast::<T>().ok()
    }

    /// Returns the value of a [`StringResource`].
    #[must_use]
    pub fn string_value(&self, name: &str) -> Option<String> {
        self.get_as::<StringResource>(name)
            .map(|resource| resource.value().to_owned())
    }

    /// Stops and removes a single resource.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::NotFound`] for unknown names and
    /// [`ResourceError::Stop`] when the resource fails to stop; the entry is
    /// removed either way.
    pub fn stop(&self, name: &str) -> Result<(), ResourceError> {
        let resource = {
            let mut table = self.lock()?;
            let index = table.position(name).ok_or_else(|| ResourceError::NotFound {
                name: name.to_owned(),
            })?;
            table.entries.remove(index).1
        };
        resource.stop().map_err(|message| ResourceError::Stop {
            name: name.to_owned(),
            message,
        })
    }

    /// Stops every registered resource and closes the table.
    ///
    /// Resources stop in registration order. A failing resource does not
    /// prevent the others from stopping; failures are logged and returned in
    /// the report. Calling this again, from any thread, stops nothing.
    pub fn stop_all(&self) -> StopAllReport {
        // Drain even if a previous holder panicked so teardown still happens.
        let drained = {
            let mut table = self
                .table
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            table.closed = true;
            std::mem::take(&mut table.entries)
        };

        let mut report = StopAllReport::default();
        for (name, resource) in drained {
            match resource.stop() {
                Ok(()) => {
                    debug!(target: RESOURCES_TARGET, resource = %name, "resource stopped");
                    report.stopped += 1;
                }
                Err(message) => {
                    warn!(
                        target: RESOURCES_TARGET,
                        resource = %name,
                        error = %message,
                        "resource failed to stop"
                    );
                    report.failures.push(ResourceError::Stop { name, message });
                }
            }
        }
        report
    }

    /// Number of live resources.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().map_or(0, |table| table.entries.len())
    }

    /// Returns `true` when no resources are live.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns `true` once [`Resources::stop_all`] has run.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.lock().map_or(true, |table| table.closed)
    }
}

fn insert(
    table: &mut ResourceTable,
    name: String,
    resource: Arc<dyn Resource>,
) -> Result<(), ResourceError> {
    if table.closed {
        return Err(ResourceError::Closed { name });
    }
    table.entries.push((name, resource));
    Ok(())
}
