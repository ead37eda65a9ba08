//! Unit handles and facets.

use serde::{Deserialize, Serialize};

/// Process-unique handle of one executing unit.
///
/// Handles are never reused: a unit created later at the same path gets a new
/// handle, so "same path" never implies "same unit".
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    derive_more::Display,
    derive_more::From,
)]
#[display("unit#{}", _0)]
pub struct UnitId(u64);

impl UnitId {
    /// Raw numeric value.
    pub fn get(self) -> u64 {
        self.0
    }
}

/// A unit of behaviour a unit may carry.
///
/// Units compose facets instead of inheriting from a fixed chain.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Facet {
    /// Holds other units in an inventory
    Container,
    /// May be bound to a network session
    Connectable,
    /// Shadows another unit
    Shadow,
    /// Runs a periodic task
    Heartbeat,
}
