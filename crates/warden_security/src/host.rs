//! Callbacks from the mediator into the host runtime.

use crate::session::SessionId;
use crate::Mediator;
use std::time::Duration;
use warden_core::{Identity, UnitId};

/// Named log channel a report is appended to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
pub enum LogChannel {
    /// Compile-time errors
    #[strum(to_string = "compile.err")]
    Compile,
    /// Execution-time errors
    #[strum(to_string = "runtime.err")]
    Runtime,
    /// Periodic-task failures
    #[strum(to_string = "heart_beat")]
    Heartbeat,
    /// Fatal errors
    #[strum(to_string = "crashes")]
    Crashes,
    /// Raised privilege violations
    #[strum(to_string = "violations")]
    Violations,
    /// Quota demon and shutdown activity
    #[strum(to_string = "quota")]
    Quota,
    /// Inbound datagrams
    #[strum(to_string = "imp")]
    Imp,
}

/// Ordinary, unprivileged services the mediator asks of its host.
///
/// Only `log_file` and `schedule_shutdown` are mandatory. Callbacks that
/// receive the mediator may call back into it; the mediator guards its own
/// decision paths against re-entry.
pub trait Host {
    /// Append an entry to a log channel.
    fn log_file(&mut self, channel: LogChannel, entry: &str);

    /// Deliver a message to a unit.
    fn tell(&mut self, _unit: UnitId, _message: &str) {}

    /// A unit was evacuated from a container that is about to be destroyed.
    fn container_destructing(&mut self, _mediator: &mut Mediator, _dependent: UnitId, _container: UnitId) {
    }

    /// Ask a victim whether it accepts being shadowed.
    fn query_allow_shadow(&mut self, _mediator: &mut Mediator, _victim: UnitId, _shadow: UnitId) -> bool {
        true
    }

    /// Whether the connection behind `session` has proven it speaks for `name`.
    ///
    /// Asked before a session is promoted to a wizard or admin identity.
    /// Refuses unless the host implements a check.
    fn authenticate(&mut self, _session: SessionId, _name: &Identity) -> bool {
        false
    }

    /// Arrange for the runtime to shut down after a grace period.
    fn schedule_shutdown(&mut self, grace: Duration);

    /// Write a file at an already-authorized canonical path.
    fn write_file(&mut self, _path: &str, _contents: &str) -> bool {
        false
    }

    /// Read a file at an already-authorized canonical path.
    fn read_file(&mut self, _path: &str) -> Option<String> {
        None
    }
}
