//! Core data types for the Warden mediator.
//!
//! This crate provides the vocabulary shared by the mediator and its callers:
//! identities, unit handles, the fixed enumerations of guarded operations,
//! decision values, path canonicalization, and the TOML configuration model.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod decision;
mod identity;
mod ops;
pub mod path;
mod unit;

pub use config::{
    JournalConfig, PolicyConfig, QuotaConfig, ReportingConfig, SessionConfig, WardenConfig,
};
pub use decision::{Decision, FileAccess};
pub use identity::{Identity, PrivilegeLevel};
pub use ops::{AccessMode, FileOp, PrivilegedOp};
pub use unit::{Facet, UnitId};
