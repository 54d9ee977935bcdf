//! # Wire Model Types
//!
//! Value types with a fixed JSON encoding shared by contracts:
//!
//! * [`Id`]: an opaque identifier that round-trips through integers, UUIDs and strings.
//! * [`iso_duration`]: a `#[serde(with = "...")]` adapter writing `Duration` as ISO-8601.
mod id;
pub mod iso_duration;

pub use id::*;
