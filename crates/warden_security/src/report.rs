//! Error & Crash Reporter. Every report is terminal: logged, surfaced, never
//! retried.

use crate::host::{Host, LogChannel};
use crate::Mediator;
use tracing::{debug, error, info, instrument, warn};
use warden_core::{PrivilegeLevel, UnitId};

/// Message shown to players in place of error detail.
pub(crate) const GENERIC_ERROR: &str =
    "Your sensitive mind notices a wrongness in the fabric of space.\n";

/// Where an execution-time error happened.
///
/// `program` is the code that was executing, which may be inherited;
/// `offending` is the instance it was executing in.
#[derive(
    Debug, Clone, Default, PartialEq, Eq, derive_builder::Builder, derive_getters::Getters,
)]
#[builder(setter(into, strip_option), default)]
pub struct ErrorSite {
    /// Executed program
    program: Option<String>,
    /// Offending instance
    offending: Option<UnitId>,
    /// Source line
    line: Option<u32>,
}

impl ErrorSite {
    /// Start building a site.
    pub fn builder() -> ErrorSiteBuilder {
        ErrorSiteBuilder::default()
    }
}

impl Mediator {
    fn describe_site(&self, site: &ErrorSite) -> String {
        let offending = site
            .offending
            .and_then(|id| self.unit(id))
            .map(|unit| unit.path().as_str())
            .unwrap_or("<none>");
        format!(
            "{}:{}:{}",
            offending,
            site.program.as_deref().unwrap_or("<unknown>"),
            site.line.unwrap_or(0)
        )
    }

    /// Record a compile-time error and show it to online wizards.
    #[instrument(skip(self, host, message))]
    pub fn report_compile_error(&self, host: &mut dyn Host, file: &str, message: &str) {
        error!(message, "Compile error");
        host.log_file(LogChannel::Compile, &format!("{}: {}\n", file, message));
        if !self.config.reporting.surface_compile_errors {
            return;
        }
        for unit in self.sessions.bound_units() {
            if self.level_of_unit(unit) >= PrivilegeLevel::Wizard {
                host.tell(unit, &format!("Compile error in {}: {}\n", file, message));
            }
        }
    }

    /// Record an execution-time error.
    ///
    /// The acting unit sees full detail when it acts as a wizard or above,
    /// and a generic notice otherwise.
    #[instrument(skip(self, host, site))]
    pub fn report_runtime_error(
        &self,
        host: &mut dyn Host,
        message: &str,
        site: &ErrorSite,
        actor: Option<UnitId>,
    ) {
        let entry = format!("{}\n{}\n", self.describe_site(site), message);
        error!(site = %self.describe_site(site), "Runtime error");
        host.log_file(LogChannel::Runtime, &entry);

        let Some(actor) = actor.filter(|id| self.is_live(*id)) else {
            return;
        };
        if self.level_of_unit(actor) >= PrivilegeLevel::Wizard {
            host.tell(actor, &entry);
        } else {
            host.tell(actor, GENERIC_ERROR);
        }
    }

    /// Record a failed periodic task and decide whether it restarts.
    ///
    /// The task is already disabled when this is called. It is re-enabled
    /// while the culprit is live and has failed no more than the configured
    /// number of times in a row; [`Mediator::heartbeat_succeeded`] ends a run.
    #[instrument(skip(self, host, site))]
    pub fn report_heartbeat_error(
        &mut self,
        host: &mut dyn Host,
        culprit: UnitId,
        message: &str,
        site: &ErrorSite,
    ) -> bool {
        let culprit_path = self
            .unit(culprit)
            .map(|unit| unit.path().clone())
            .unwrap_or_else(|| culprit.to_string());
        host.log_file(
            LogChannel::Heartbeat,
            &format!("{}\n{}\n{}\n", culprit_path, message, self.describe_site(site)),
        );
        warn!(culprit = %culprit_path, message, "Heartbeat failed");

        if !self.is_live(culprit) {
            return false;
        }
        self.units.set_heartbeat(culprit, false);
        if self.is_interactive(culprit) {
            host.tell(culprit, "You have no heartbeat!\n");
        }

        let failures = self.heartbeat_failures.entry(culprit).or_insert(0);
        *failures += 1;
        let restart = *failures <= self.config.reporting.heartbeat_restart_limit;
        if restart {
            self.units.set_heartbeat(culprit, true);
            info!(culprit = %culprit_path, failures = *failures, "Heartbeat restarted");
        }
        restart
    }

    /// Record a datagram received on the inter-host port.
    ///
    /// Empty messages are dropped.
    #[instrument(skip(self, host, message))]
    pub fn receive_imp(&self, host: &mut dyn Host, source: &str, message: &str) {
        let message = message.trim_end();
        if message.is_empty() {
            return;
        }
        debug!(bytes = message.len(), "Datagram received");
        host.log_file(LogChannel::Imp, &format!("{}: {}\n", source, message));
    }

    /// A periodic task of `unit` completed; its failure streak is over.
    pub fn heartbeat_succeeded(&mut self, unit: UnitId) {
        if self.heartbeat_failures.remove(&unit).is_some() {
            debug!(%unit, "Heartbeat failure count cleared");
        }
    }

    /// Record a fatal error.
    pub fn report_crash(&self, host: &mut dyn Host, message: &str) {
        error!(message, "Crash");
        host.log_file(
            LogChannel::Crashes,
            &format!(
                "CRASHED on: {} ERROR: {}\n",
                chrono::Local::now().to_rfc2822(),
                message
            ),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingHost;
    use warden_core::{Facet, Identity, WardenConfig};

    fn mediator() -> Mediator {
        let mut config = WardenConfig::default();
        config.policy.wizards.insert(Identity::new("bob"));
        Mediator::new(config).unwrap()
    }

    fn playing(m: &mut Mediator, host: &mut RecordingHost, name: &str) -> UnitId {
        host.authenticated.insert(Identity::new(name));
        let (id, _) = m.connect().unwrap();
        m.logon(id).unwrap();
        m.promote(host, id, name).unwrap()
    }

    #[test]
    fn test_heartbeat_restart_and_stay_off() {
        let mut config = WardenConfig::default();
        config.reporting.heartbeat_restart_limit = 1;
        let mut m = Mediator::new(config).unwrap();
        let mut host = RecordingHost::default();
        let clock = m.load("players/bob/clock.c", None, [Facet::Heartbeat]).unwrap();
        let site = ErrorSite::builder()
            .program("players/bob/clock.c")
            .offending(clock)
            .line(42u32)
            .build()
            .unwrap();

        assert!(m.report_heartbeat_error(&mut host, clock, "div by zero", &site));
        assert!(m.heartbeat_enabled(clock));
        assert!(!m.report_heartbeat_error(&mut host, clock, "div by zero", &site));
        assert!(!m.heartbeat_enabled(clock));
        assert_eq!(host.entries(LogChannel::Heartbeat).len(), 2);
        assert!(host.entries(LogChannel::Heartbeat)[0].contains("players/bob/clock.c:42"));
    }

    #[test]
    fn test_success_resets_failure_streak() {
        let mut config = WardenConfig::default();
        config.reporting.heartbeat_restart_limit = 1;
        let mut m = Mediator::new(config).unwrap();
        let mut host = RecordingHost::default();
        let clock = m.load("players/bob/clock.c", None, [Facet::Heartbeat]).unwrap();
        let site = ErrorSite::default();

        for _ in 0..4 {
            assert!(m.report_heartbeat_error(&mut host, clock, "tick failed", &site));
            m.heartbeat_succeeded(clock);
        }
        assert!(m.heartbeat_enabled(clock));
        assert!(m.report_heartbeat_error(&mut host, clock, "tick failed", &site));
        assert!(!m.report_heartbeat_error(&mut host, clock, "tick failed", &site));
    }

    #[test]
    fn test_heartbeat_of_destroyed_unit_stays_off() {
        let mut m = mediator();
        let mut host = RecordingHost::default();
        assert!(!m.report_heartbeat_error(&mut host, UnitId::from(5000), "gone", &ErrorSite::default()));
    }

    #[test]
    fn test_runtime_detail_follows_level() {
        let mut m = mediator();
        let mut host = RecordingHost::default();
        let wizard = playing(&mut m, &mut host, "bob");
        let player = playing(&mut m, &mut host, "carol");
        let site = ErrorSite::builder().program("std/room.c").line(7u32).build().unwrap();

        m.report_runtime_error(&mut host, "bad arg", &site, Some(wizard));
        m.report_runtime_error(&mut host, "bad arg", &site, Some(player));
        assert!(host.tells_to(wizard)[0].contains("std/room.c:7"));
        assert_eq!(host.tells_to(player), vec![GENERIC_ERROR]);
        assert_eq!(host.entries(LogChannel::Runtime).len(), 2);
    }

    #[test]
    fn test_compile_errors_reach_online_wizards() {
        let mut m = mediator();
        let mut host = RecordingHost::default();
        let wizard = playing(&mut m, &mut host, "bob");
        let player = playing(&mut m, &mut host, "carol");
        m.report_compile_error(&mut host, "players/bob/broken.c", "syntax error");
        assert_eq!(host.entries(LogChannel::Compile).len(), 1);
        assert_eq!(host.tells_to(wizard).len(), 1);
        assert!(host.tells_to(player).is_empty());
    }

    #[test]
    fn test_datagrams_are_logged() {
        let m = mediator();
        let mut host = RecordingHost::default();
        m.receive_imp(&mut host, "mud.example.org", "ping\n");
        m.receive_imp(&mut host, "mud.example.org", "   ");
        assert_eq!(host.entries(LogChannel::Imp), vec!["mud.example.org: ping\n"]);
    }

    #[test]
    fn test_crash_is_logged() {
        let m = mediator();
        let mut host = RecordingHost::default();
        m.report_crash(&mut host, "out of memory");
        let entries = host.entries(LogChannel::Crashes);
        assert!(entries[0].starts_with("CRASHED on: "));
        assert!(entries[0].contains("ERROR: out of memory"));
    }
}
