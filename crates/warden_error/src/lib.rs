//! Error types for the Warden mediator.
//!
//! This crate provides the foundation error types used throughout the Warden workspace.
//!
//! # Error Hierarchy
//!
//! All errors follow the `ErrorKind` + wrapper struct pattern:
//! - `*ErrorKind` enum defines specific error conditions
//! - `*Error` struct wraps the kind with source location tracking
//! - All errors use `#[track_caller]` for automatic location capture
//!
//! Policy denials are never errors. Only privilege violations and host-level
//! failures travel through these types.
//!
//! # Examples
//!
//! ```
//! use warden_error::{ConfigError, WardenResult};
//!
//! fn load_policy() -> WardenResult<()> {
//!     Err(ConfigError::new("root_uid must not be empty"))?
//! }
//!
//! assert!(load_policy().is_err());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod command;
mod config;
mod error;
mod mediator;

pub use command::{CommandError, CommandErrorKind};
pub use config::ConfigError;
pub use error::{WardenError, WardenErrorKind, WardenResult};
pub use mediator::{MediatorError, MediatorErrorKind, MediatorResult};
