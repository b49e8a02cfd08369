//! Lenient decoding for machine identifiers.
//!
//! Machine ids are numeric strings such as `"0"` or `"4"`. The environment
//! and file layers hand bare numbers over as integers, so both forms decode
//! to the same string.

use std::fmt;

use serde::Deserializer;
use serde::de::{self, Visitor};

struct MachineIdVisitor;

impl Visitor<'_> for MachineIdVisitor {
    type Value = String;

    fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str("a machine id as a string or non-negative integer")
    }

    fn visit_str<E: de::Error>(self, value: &str) -> Result<Self::Value, E> {
        Ok(value.to_owned())
    }

    fn visit_string<E: de::Error>(self, value: String) -> Result<Self::Value, E> {
        Ok(value)
    }

    fn visit_u64<E: de::Error>(self, value: u64) -> Result<Self::Value, E> {
        Ok(value.to_string())
    }

    fn visit_i64<E: de::Error>(self, value: i64) -> Result<Self::Value, E> {
        u64::try_from(value)
            .map(|id| id.to_string())
            .map_err(|_| E::invalid_value(de::Unexpected::Signed(value), &self))
    }
}

pub(crate) fn deserialize<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    deserializer.deserialize_any(MachineIdVisitor)
}
