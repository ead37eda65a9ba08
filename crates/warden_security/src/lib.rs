//! Reference monitor for a shared, multi-tenant object runtime.
//!
//! Many independently-authored units run in one process. The host runtime
//! consults the [`Mediator`] synchronously before every operation with
//! security consequences and honours its answer.
//!
//! # Architecture
//!
//! The mediator is made of these components, leaves first:
//!
//! 1. **Identity Resolver** - attributes an owner to every new unit
//! 2. **File Access Validator** - canonicalizes and authorizes file requests
//! 3. **Credential Change Validator** - guards effective-identity changes and connection rebinding
//! 4. **Privilege Mediator** - ternary decisions for the remaining privileged operations
//! 5. **Session Gateway** - connection lifecycle from login to teardown
//! 6. **Destruction Gatekeeper** - authorizes and sequences unit removal
//! 7. **Error & Crash Reporter** - terminal sinks for compile, runtime, heartbeat and fatal errors
//! 8. **Quota / Resource Guard** - eviction and orderly shutdown under memory pressure
//!
//! The mediator is fail-closed: malformed input, absent identities and
//! destroyed subjects always resolve to the most restrictive outcome.

#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod credentials;
mod destruct;
mod editor;
mod file_access;
mod host;
mod identity;
mod mediator;
mod privilege;
mod quota;
mod report;
mod session;
pub mod testing;
mod world;

pub use credentials::EuidScope;
pub use destruct::{AbortReason, Readiness};
pub use host::{Host, LogChannel};
pub use mediator::Mediator;
pub use privilege::PrivilegeArg;
pub use quota::{PressureOutcome, ReserveTier};
pub use report::ErrorSite;
pub use session::{Session, SessionContext, SessionId, SessionState};
pub use world::Unit;
