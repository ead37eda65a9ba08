//! Test double for [`Host`].

use crate::destruct::Readiness;
use crate::host::{Host, LogChannel};
use crate::Mediator;
use crate::session::SessionId;
use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;
use warden_core::{Identity, UnitId};

/// A [`Host`] that records every callback.
///
/// Files live in an in-memory map keyed by canonical path. The
/// `reenter_*` switches make callbacks call straight back into the mediator.
#[derive(Debug, Default)]
pub struct RecordingHost {
    /// Appended log entries, in order
    pub logs: Vec<(LogChannel, String)>,
    /// Messages delivered to units, in order
    pub tells: Vec<(UnitId, String)>,
    /// Requested shutdown grace periods
    pub shutdowns: Vec<Duration>,
    /// Written files
    pub files: BTreeMap<String, String>,
    /// Identities whose connections authenticate
    pub authenticated: BTreeSet<Identity>,
    /// Victims refuse every shadow
    pub refuse_shadows: bool,
    /// Destruction notices try to destroy the container again
    pub reenter_destruct: bool,
    /// Shadow queries ask for clearance again
    pub reenter_shadow: bool,
    /// Outcomes of re-entrant calls
    pub reentry_results: Vec<bool>,
    /// `(dependent, container)` pairs notified of a destruction
    pub container_notices: Vec<(UnitId, UnitId)>,
}

impl RecordingHost {
    /// Entries appended to `channel`.
    pub fn entries(&self, channel: LogChannel) -> Vec<&str> {
        self.logs
            .iter()
            .filter(|(c, _)| *c == channel)
            .map(|(_, entry)| entry.as_str())
            .collect()
    }

    /// Messages delivered to `unit`.
    pub fn tells_to(&self, unit: UnitId) -> Vec<&str> {
        self.tells
            .iter()
            .filter(|(u, _)| *u == unit)
            .map(|(_, message)| message.as_str())
            .collect()
    }

    /// `(dependent, container)` pairs notified of a destruction.
    pub fn container_notices(&self) -> &[(UnitId, UnitId)] {
        &self.container_notices
    }
}

impl Host for RecordingHost {
    fn log_file(&mut self, channel: LogChannel, entry: &str) {
        self.logs.push((channel, entry.to_string()));
    }

    fn tell(&mut self, unit: UnitId, message: &str) {
        self.tells.push((unit, message.to_string()));
    }

    fn container_destructing(&mut self, mediator: &mut Mediator, dependent: UnitId, container: UnitId) {
        self.container_notices.push((dependent, container));
        if self.reenter_destruct {
            let outcome = mediator.prepare_destruct(self, container);
            self.reentry_results.push(outcome == Readiness::Ready);
        }
    }

    fn query_allow_shadow(&mut self, mediator: &mut Mediator, victim: UnitId, shadow: UnitId) -> bool {
        if self.reenter_shadow {
            let again = mediator.valid_shadow(self, shadow, victim);
            self.reentry_results.push(again);
        }
        !self.refuse_shadows
    }

    fn authenticate(&mut self, _session: SessionId, name: &Identity) -> bool {
        self.authenticated.contains(name)
    }

    fn schedule_shutdown(&mut self, grace: Duration) {
        self.shutdowns.push(grace);
    }

    fn write_file(&mut self, path: &str, contents: &str) -> bool {
        self.files.insert(path.to_string(), contents.to_string());
        true
    }

    fn read_file(&mut self, path: &str) -> Option<String> {
        self.files.get(path).cloned()
    }
}
