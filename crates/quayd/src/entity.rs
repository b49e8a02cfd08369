//! The entity a connection authenticated as.

use quay_params::Tag;

/// Responsibilities a machine agent can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MachineJob {
    /// The machine runs workload units.
    HostUnits,
    /// The machine runs the controller for its model.
    ManageModel,
}

/// Identity established by a successful login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entity {
    tag: Tag,
    jobs: Vec<MachineJob>,
}

impl Entity {
    /// Builds an entity with no machine jobs.
    #[must_use]
    pub const fn new(tag: Tag) -> Self {
        Self {
            tag,
            jobs: Vec::new(),
        }
    }

    /// Builds a machine entity holding the given jobs.
    #[must_use]
    pub fn machine(id: impl Into<String>, jobs: impl IntoIterator<Item = MachineJob>) -> Self {
        Self {
            tag: Tag::machine(id),
            jobs: jobs.into_iter().collect(),
        }
    }

    /// Tag naming the entity.
    #[must_use]
    pub const fn tag(&self) -> &Tag {
        &self.tag
    }

    /// Jobs held by the entity. Always empty for non-machine entities.
    #[must_use]
    pub fn jobs(&self) -> &[MachineJob] {
        self.jobs.as_slice()
    }

    /// Returns `true` when the entity is a machine holding `job`.
    #[must_use]
    pub fn is_machine_with_job(&self, job: MachineJob) -> bool {
        self.tag.kind() == quay_params::TagKind::Machine && self.jobs.contains(&job)
    }
}
