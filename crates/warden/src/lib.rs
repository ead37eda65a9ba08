//! Warden - a reference monitor for shared, multi-tenant object runtimes.
//!
//! Many independently-authored units share one process. The host runtime asks
//! the [`Mediator`] before every operation with security consequences: file
//! access, identity changes, connection rebinding, unit destruction, and a
//! fixed set of privileged operations.
//!
//! # Quick Start
//!
//! ```
//! use warden::{FileAccess, Identity, Mediator, WardenConfig};
//!
//! let mediator = Mediator::new(WardenConfig::default())?;
//! let bob = Identity::new("bob");
//! assert_eq!(
//!     mediator.validate_write("bob.o", Some(&bob), "save_object", None),
//!     FileAccess::Canonical("/players/bob/bob.o".to_string())
//! );
//! # Ok::<(), warden::WardenError>(())
//! ```
//!
//! # Architecture
//!
//! - `warden_error` - Error types
//! - `warden_core` - Identities, decisions, operation kinds, paths, configuration
//! - `warden_security` - The mediator and its components
//! - `warden_commands` - Verb registry consulted by sessions
//!
//! This crate re-exports everything and adds tracing setup and a
//! file-backed [`Host`].

#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod journal;
mod telemetry;

pub use journal::JournalHost;
pub use telemetry::init_tracing;

pub use warden_commands::{CommandContext, CommandHandler, CommandInfo, CommandRegistry};
pub use warden_core::{
    AccessMode, Decision, Facet, FileAccess, FileOp, Identity, JournalConfig, PolicyConfig,
    PrivilegeLevel, PrivilegedOp, QuotaConfig, ReportingConfig, SessionConfig, UnitId,
    WardenConfig, path,
};
pub use warden_error::{
    CommandError, CommandErrorKind, ConfigError, MediatorError, MediatorErrorKind, MediatorResult,
    WardenError, WardenErrorKind, WardenResult,
};
pub use warden_security::{
    AbortReason, ErrorSite, EuidScope, Host, LogChannel, Mediator, PressureOutcome, PrivilegeArg,
    Readiness, ReserveTier, Session, SessionContext, SessionId, SessionState, Unit, testing,
};
