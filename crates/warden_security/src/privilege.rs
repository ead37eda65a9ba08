//! Privilege Mediator: ternary decisions for the enumerated privileged
//! operations, plus shadow and snoop clearance.

use crate::host::{Host, LogChannel};
use crate::mediator::Checkpoint;
use crate::world::Unit;
use crate::Mediator;
use std::str::FromStr;
use tracing::{debug, instrument, warn};
use warden_core::{Decision, Facet, Identity, PrivilegeLevel, PrivilegedOp, UnitId};
use warden_error::{MediatorError, MediatorErrorKind, MediatorResult};

/// Extra argument of a privileged operation; its meaning depends on the kind.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PrivilegeArg {
    /// Not supplied
    #[default]
    None,
    /// A unit handle
    Unit(UnitId),
    /// An identity
    Identity(Identity),
    /// Free text such as a path, host name or payload
    Text(String),
    /// A number
    Number(i64),
}

impl Mediator {
    /// Decide a privileged operation.
    ///
    /// Root-acting requesters are always allowed. Destroyed requesters,
    /// requesters without an effective identity, missing targets and
    /// re-entrant calls all resolve to [`Decision::SilentlyCorrect`].
    #[instrument(skip(self, arg, arg2))]
    pub fn decide(
        &mut self,
        op: PrivilegedOp,
        requester: UnitId,
        arg: &PrivilegeArg,
        arg2: &PrivilegeArg,
    ) -> Decision {
        let decision = self.guarded(
            Checkpoint::Decide(op, requester),
            Decision::SilentlyCorrect,
            |m| m.evaluate(op, requester, arg, arg2),
        );
        debug!(?decision, "Privilege decision");
        decision
    }

    /// Decide an operation named as the host names it; unknown names are
    /// refused without raising.
    pub fn decide_named(
        &mut self,
        op: &str,
        requester: UnitId,
        arg: &PrivilegeArg,
        arg2: &PrivilegeArg,
    ) -> Decision {
        match PrivilegedOp::from_str(op) {
            Ok(op) => self.decide(op, requester, arg, arg2),
            Err(_) => {
                debug!(op, "Unknown privileged operation");
                Decision::SilentlyCorrect
            }
        }
    }

    /// Decide and translate the outcome for a call site.
    ///
    /// # Errors
    ///
    /// A [`Decision::Violation`] is logged to the violations channel and
    /// returned as a `PrivilegeViolation`.
    pub fn enforce(
        &mut self,
        host: &mut dyn Host,
        op: PrivilegedOp,
        requester: UnitId,
        arg: &PrivilegeArg,
        arg2: &PrivilegeArg,
    ) -> MediatorResult<bool> {
        match self.decide(op, requester, arg, arg2) {
            Decision::Allow => Ok(true),
            Decision::SilentlyCorrect => Ok(false),
            Decision::Violation => {
                let requester_path = self
                    .unit(requester)
                    .map(|unit| unit.path().clone())
                    .unwrap_or_else(|| requester.to_string());
                let euid = self
                    .euid_of(requester)
                    .map(|id| id.to_string())
                    .unwrap_or_default();
                let reason = format!("acting as '{}' with {:?} {:?}", euid, arg, arg2);
                warn!(%op, requester = %requester_path, %reason, "Privilege violation");
                host.log_file(
                    LogChannel::Violations,
                    &format!("{} {} {}\n", requester_path, op, reason),
                );
                Err(MediatorError::new(MediatorErrorKind::PrivilegeViolation {
                    operation: op.to_string(),
                    requester: requester_path,
                    reason,
                }))
            }
        }
    }

    fn evaluate(
        &self,
        op: PrivilegedOp,
        requester: UnitId,
        arg: &PrivilegeArg,
        arg2: &PrivilegeArg,
    ) -> Decision {
        let Some(euid) = self.units.get(requester).and_then(Unit::euid) else {
            return Decision::SilentlyCorrect;
        };
        let policy = &self.config.policy;
        let level = policy.level_of(Some(euid));
        if level == PrivilegeLevel::Root {
            return Decision::Allow;
        }
        let admin = level.is_admin();
        let allow_or = |ok: bool, otherwise: Decision| if ok { Decision::Allow } else { otherwise };

        match op {
            PrivilegedOp::BindLambda | PrivilegedOp::SetThisObject | PrivilegedOp::ShadowAddAction => {
                match self.target(arg) {
                    None => Decision::SilentlyCorrect,
                    Some(target) => allow_or(admin || target.euid() == Some(euid), Decision::Violation),
                }
            }
            PrivilegedOp::RenameObject => {
                let (Some(target), PrivilegeArg::Text(new_path)) = (self.target(arg), arg2) else {
                    return Decision::SilentlyCorrect;
                };
                let owns_target = target.creator() == euid;
                let owns_destination = self.creator_file(new_path).as_ref() == Some(euid);
                allow_or(admin || (owns_target && owns_destination), Decision::Violation)
            }
            PrivilegedOp::CallOutInfo | PrivilegedOp::WizlistInfo | PrivilegedOp::SendImp => {
                allow_or(admin, Decision::SilentlyCorrect)
            }
            PrivilegedOp::GetExtraWizinfo => match arg {
                PrivilegeArg::Identity(who) => allow_or(admin || who == euid, Decision::Violation),
                _ => Decision::SilentlyCorrect,
            },
            PrivilegedOp::NomaskSimulEfun
            | PrivilegedOp::SetExtraWizinfo
            | PrivilegedOp::SetExtraWizinfoSize => allow_or(admin, Decision::Violation),
            PrivilegedOp::SetAutoIncludeString => Decision::Violation,
        }
    }

    fn target(&self, arg: &PrivilegeArg) -> Option<&Unit> {
        match arg {
            PrivilegeArg::Unit(id) => self.units.get(*id),
            _ => None,
        }
    }

    /// Answer a level question about a unit: `wizard`, `trace` or
    /// `showsmallnewmalloced`. Unknown questions are answered no.
    pub fn query_player_level(&self, unit: UnitId, what: &str) -> bool {
        if !self.is_live(unit) {
            return false;
        }
        let level = self.level_of_unit(unit);
        match what {
            "wizard" => level >= PrivilegeLevel::Wizard,
            "trace" | "showsmallnewmalloced" => level >= PrivilegeLevel::Admin,
            _ => false,
        }
    }

    /// Whether `shadow` may shadow `victim`.
    #[instrument(skip(self, host))]
    pub fn valid_shadow(&mut self, host: &mut dyn Host, shadow: UnitId, victim: UnitId) -> bool {
        if shadow == victim || victim == self.master() {
            return false;
        }
        let Some(target) = self.units.get(victim) else {
            return false;
        };
        let root = &self.config.policy.root_uid;
        if target.creator() == root || target.euid() == Some(root) {
            debug!("Root-owned units cannot be shadowed");
            return false;
        }
        if !self.units.get(shadow).is_some_and(|unit| unit.has(Facet::Shadow)) {
            return false;
        }
        self.guarded(Checkpoint::Shadow(victim), false, |m| {
            host.query_allow_shadow(m, victim, shadow)
        })
    }

    /// Whether `requester` may start (`snooper` present) or stop a snoop on
    /// `snoopee`.
    ///
    /// Snoopers must be admins and strictly outrank their target, so root
    /// is never snooped.
    pub fn valid_snoop(&self, requester: UnitId, snoopee: UnitId, snooper: Option<UnitId>) -> bool {
        if !self.is_live(requester) || !self.is_live(snoopee) {
            return false;
        }
        let requester_level = self.level_of_unit(requester);
        match snooper {
            None => {
                requester_level.is_admin()
                    || (self.euid_of(requester).is_some()
                        && self.euid_of(requester) == self.euid_of(snoopee))
            }
            Some(snooper) => {
                if !self.is_live(snooper) || snooper == snoopee {
                    return false;
                }
                if requester != snooper && requester_level != PrivilegeLevel::Root {
                    return false;
                }
                let level = self.level_of_unit(snooper);
                level.is_admin() && self.level_of_unit(snoopee) < level
            }
        }
    }

    /// Whether `asker` may learn who is snooping `target`.
    pub fn valid_query_snoop(&self, asker: UnitId, target: UnitId) -> bool {
        self.is_live(target) && self.level_of_unit(asker).is_admin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingHost;
    use warden_core::WardenConfig;

    fn mediator() -> Mediator {
        let mut config = WardenConfig::default();
        config.policy.admins.insert(Identity::new("ada"));
        config.policy.wizards.insert(Identity::new("bob"));
        Mediator::new(config).unwrap()
    }

    fn none() -> PrivilegeArg {
        PrivilegeArg::None
    }

    #[test]
    fn test_send_imp_from_unprivileged_is_neutral() {
        let mut m = mediator();
        let bobs = m.load("players/bob/radio.c", None, []).unwrap();
        let host = PrivilegeArg::Text("127.0.0.1".to_string());
        let payload = PrivilegeArg::Text("ping".to_string());
        assert_eq!(
            m.decide_named("send_datagram", bobs, &host, &payload),
            Decision::SilentlyCorrect
        );
        let adas = m.load("players/ada/radio.c", None, []).unwrap();
        assert_eq!(m.decide(PrivilegedOp::SendImp, adas, &host, &payload), Decision::Allow);
    }

    #[test]
    fn test_root_is_allowed_everything() {
        let mut m = mediator();
        let master = m.master();
        assert_eq!(
            m.decide(PrivilegedOp::SetAutoIncludeString, master, &none(), &none()),
            Decision::Allow
        );
    }

    #[test]
    fn test_bind_lambda_to_foreign_unit_is_violation() {
        let mut m = mediator();
        let bobs = m.load("players/bob/a.c", None, []).unwrap();
        let own = m.load("players/bob/b.c", None, []).unwrap();
        let alices = m.load("players/alice/c.c", None, []).unwrap();
        assert_eq!(
            m.decide(PrivilegedOp::BindLambda, bobs, &PrivilegeArg::Unit(own), &none()),
            Decision::Allow
        );
        assert_eq!(
            m.decide(PrivilegedOp::BindLambda, bobs, &PrivilegeArg::Unit(alices), &none()),
            Decision::Violation
        );
        assert_eq!(
            m.decide(PrivilegedOp::BindLambda, bobs, &PrivilegeArg::Unit(UnitId::from(999)), &none()),
            Decision::SilentlyCorrect
        );
    }

    #[test]
    fn test_captured_state_dumps_need_admin() {
        let mut m = mediator();
        let bobs = m.load("players/bob/a.c", None, []).unwrap();
        let adas = m.load("players/ada/a.c", None, []).unwrap();
        for op in [PrivilegedOp::CallOutInfo, PrivilegedOp::WizlistInfo] {
            assert!(op.exposes_captured_state());
            assert_eq!(m.decide(op, bobs, &none(), &none()), Decision::SilentlyCorrect);
            assert_eq!(m.decide(op, adas, &none(), &none()), Decision::Allow);
        }
        let other = PrivilegeArg::Identity(Identity::new("alice"));
        let own = PrivilegeArg::Identity(Identity::new("bob"));
        assert_eq!(m.decide(PrivilegedOp::GetExtraWizinfo, bobs, &own, &none()), Decision::Allow);
        assert_eq!(m.decide(PrivilegedOp::GetExtraWizinfo, bobs, &other, &none()), Decision::Violation);
    }

    #[test]
    fn test_rename_requires_both_ends_owned() {
        let mut m = mediator();
        let bobs = m.load("players/bob/a.c", None, []).unwrap();
        let target = m.load("players/bob/b.c", None, []).unwrap();
        let inside = PrivilegeArg::Text("/players/bob/c".to_string());
        let outside = PrivilegeArg::Text("/secure/c".to_string());
        let unit = PrivilegeArg::Unit(target);
        assert_eq!(m.decide(PrivilegedOp::RenameObject, bobs, &unit, &inside), Decision::Allow);
        assert_eq!(m.decide(PrivilegedOp::RenameObject, bobs, &unit, &outside), Decision::Violation);
        assert_eq!(m.decide(PrivilegedOp::RenameObject, bobs, &unit, &none()), Decision::SilentlyCorrect);
    }

    #[test]
    fn test_absent_euid_and_destroyed_requester_are_neutral() {
        let mut m = mediator();
        let bobs = m.load("players/bob/a.c", None, []).unwrap();
        assert!(m.seteuid(bobs, None));
        assert_eq!(
            m.decide(PrivilegedOp::SetAutoIncludeString, bobs, &none(), &none()),
            Decision::SilentlyCorrect
        );
        assert_eq!(
            m.decide(PrivilegedOp::SetAutoIncludeString, UnitId::from(777), &none(), &none()),
            Decision::SilentlyCorrect
        );
        assert_eq!(m.decide_named("format_disk", bobs, &none(), &none()), Decision::SilentlyCorrect);
    }

    #[test]
    fn test_seteuid_changes_later_decisions() {
        let mut m = mediator();
        let adas = m.load("players/ada/a.c", None, []).unwrap();
        assert_eq!(m.decide(PrivilegedOp::WizlistInfo, adas, &none(), &none()), Decision::Allow);
        assert!(m.seteuid(adas, Some(Identity::new("bob"))));
        assert_eq!(
            m.decide(PrivilegedOp::WizlistInfo, adas, &none(), &none()),
            Decision::SilentlyCorrect
        );
    }

    #[test]
    fn test_enforce_raises_only_violations() {
        let mut m = mediator();
        let mut host = RecordingHost::default();
        let bobs = m.load("players/bob/a.c", None, []).unwrap();
        assert!(!m.enforce(&mut host, PrivilegedOp::SendImp, bobs, &none(), &none()).unwrap());
        let err = m
            .enforce(&mut host, PrivilegedOp::SetAutoIncludeString, bobs, &none(), &none())
            .unwrap_err();
        assert!(err.is_violation());
        assert_eq!(host.entries(LogChannel::Violations).len(), 1);
    }

    #[test]
    fn test_query_player_level() {
        let mut m = mediator();
        let bobs = m.load("players/bob/a.c", None, []).unwrap();
        let adas = m.load("players/ada/a.c", None, []).unwrap();
        assert!(m.query_player_level(bobs, "wizard"));
        assert!(!m.query_player_level(bobs, "trace"));
        assert!(m.query_player_level(adas, "showsmallnewmalloced"));
        assert!(!m.query_player_level(adas, "anything"));
    }

    #[test]
    fn test_shadow_clearance() {
        let mut m = mediator();
        let mut host = RecordingHost::default();
        let victim = m.load("players/bob/pet.c", None, []).unwrap();
        let shadow = m.load("players/alice/mask.c", None, [Facet::Shadow]).unwrap();
        let plain = m.load("players/alice/hat.c", None, []).unwrap();
        let master = m.master();
        assert!(m.valid_shadow(&mut host, shadow, victim));
        assert!(!m.valid_shadow(&mut host, plain, victim));
        assert!(!m.valid_shadow(&mut host, shadow, master));

        host.refuse_shadows = true;
        assert!(!m.valid_shadow(&mut host, shadow, victim));
    }

    #[test]
    fn test_snoop_rules() {
        let mut m = mediator();
        let ada = m.load("players/ada/eye.c", None, []).unwrap();
        let bob = m.load("players/bob/ear.c", None, []).unwrap();
        let master = m.master();
        assert!(m.valid_snoop(ada, bob, Some(ada)));
        assert!(!m.valid_snoop(bob, ada, Some(bob)));
        assert!(!m.valid_snoop(ada, master, Some(ada)));
        assert!(m.valid_snoop(bob, bob, None));
        assert!(m.valid_query_snoop(ada, bob));
        assert!(!m.valid_query_snoop(bob, ada));
    }
}
