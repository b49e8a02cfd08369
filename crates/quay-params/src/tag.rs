//! Entity tags in their canonical `kind-id` form.

use std::fmt;
use std::str::FromStr;

use strum::{Display, EnumString};
use thiserror::Error;

/// Kinds of entity a tag can name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, Display)]
#[strum(serialize_all = "lowercase")]
pub enum TagKind {
    /// A machine agent.
    Machine,
    /// A unit agent.
    Unit,
    /// A human or service user.
    User,
    /// A hosted model.
    Model,
    /// The controller itself.
    Controller,
}

/// Error returned when a string is not a well-formed tag.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{value:?} is not a valid tag")]
pub struct TagParseError {
    value: String,
}

impl TagParseError {
    fn new(value: &str) -> Self {
        Self {
            value: value.to_owned(),
        }
    }

    /// Returns the rejected input.
    #[must_use]
    pub fn value(&self) -> &str {
        self.value.as_str()
    }
}

/// Identifies a single entity known to the controller.
///
/// Tags render as `kind-id`. Unit identifiers carry a slash between the
/// application name and the unit number (`mysql/0`), which is written as a
/// dash in the rendered form (`unit-mysql-0`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Tag {
    kind: TagKind,
    id: String,
}

impl Tag {
    /// Builds a tag of the given kind.
    #[must_use]
    pub fn new(kind: TagKind, id: impl Into<String>) -> Self {
        Self {
            kind,
            id: id.into(),
        }
    }

    /// Builds a machine tag.
    #[must_use]
    pub fn machine(id: impl Into<String>) -> Self {
        Self::new(TagKind::Machine, id)
    }

    /// Builds a unit tag from a `application/number` identifier.
    #[must_use]
    pub fn unit(id: impl Into<String>) -> Self {
        Self::new(TagKind::Unit, id)
    }

    /// Builds a user tag.
    #[must_use]
    pub fn user(name: impl Into<String>) -> Self {
        Self::new(TagKind::User, name)
    }

    /// Builds a model tag.
    #[must_use]
    pub fn model(uuid: impl Into<String>) -> Self {
        Self::new(TagKind::Model, uuid)
    }

    /// Builds a controller tag.
    #[must_use]
    pub fn controller(uuid: impl Into<String>) -> Self {
        Self::new(TagKind::Controller, uuid)
    }

    /// Kind of entity named by this tag.
    #[must_use]
    pub const fn kind(&self) -> TagKind {
        self.kind
    }

    /// Identifier within the kind.
    #[must_use]
    pub fn id(&self) -> &str {
        self.id.as_str()
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            TagKind::Unit => write!(formatter, "{}-{}", self.kind, self.id.replace('/', "-")),
            _ => write!(formatter, "{}-{}", self.kind, self.id),
        }
    }
}

impl FromStr for Tag {
    type Err = TagParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let (kind, id) = value
            .split_once('-')
            .ok_or_else(|| TagParseError::new(value))?;
        let kind = kind
            .parse::<TagKind>()
            .map_err(|_| TagParseError::new(value))?;
        if id.is_empty() {
            return Err(TagParseError::new(value));
        }
        let id = match kind {
            TagKind::Unit => {
                let (application, number) =
                    id.rsplit_once('-').ok_or_else(|| TagParseError::new(value))?;
                if application.is_empty() || !number.chars().all(|c| c.is_ascii_digit()) {
                    return Err(TagParseError::new(value));
                }
                format!("{application}/{number}")
            }
            _ => id.to_owned(),
        };
        Ok(Self { kind, id })
    }
}
