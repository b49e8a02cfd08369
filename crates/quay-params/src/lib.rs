//! Value types shared between the Quay API server and its clients.
//!
//! The types in this crate describe what travels across the RPC boundary:
//! entity tags naming machines, units, users, models, and controllers; the
//! access levels granted to users; the error codes surfaced to clients; and
//! the call envelope handed to the server once a transport has decoded a
//! frame. Frame encoding itself belongs to the transport.

mod access;
mod call;
mod errors;
mod facades;
mod tag;

pub use self::access::{Access, AccessParseError};
pub use self::call::CallRequest;
pub use self::errors::{ErrorCode, ErrorResult};
pub use self::facades::FacadeVersions;
pub use self::tag::{Tag, TagKind, TagParseError};
