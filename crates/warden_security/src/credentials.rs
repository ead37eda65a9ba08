//! Credential Change Validator.
//!
//! The only code path that mutates a unit's effective identity.

use crate::Mediator;
use std::ops::{Deref, DerefMut};
use tracing::{debug, info, instrument};
use warden_core::{Identity, PrivilegeLevel, UnitId};

impl Mediator {
    /// Whether `unit` may change its effective identity to `new`.
    ///
    /// Dropping the identity is always permitted. Otherwise the unit may take
    /// back its creator, root-owned or root-acting units may become anyone,
    /// and admins may become any non-root identity. Nobody becomes backbone.
    pub fn validate_seteuid(&self, unit: UnitId, new: Option<&Identity>) -> bool {
        let Some(subject) = self.units.get(unit) else {
            return false;
        };
        let Some(new) = new else {
            return true;
        };
        let policy = &self.config.policy;
        if *new == policy.backbone_uid {
            return false;
        }
        if subject.euid() == Some(new) || subject.creator() == new {
            return true;
        }
        if *subject.creator() == policy.root_uid || subject.euid() == Some(&policy.root_uid) {
            return true;
        }
        policy.level_of(subject.euid()) >= PrivilegeLevel::Admin && *new != policy.root_uid
    }

    /// Validate and commit an effective-identity change.
    ///
    /// On refusal the identity is left untouched.
    #[instrument(skip(self))]
    pub fn seteuid(&mut self, unit: UnitId, new: Option<Identity>) -> bool {
        if !self.validate_seteuid(unit, new.as_ref()) {
            debug!("Identity change refused");
            return false;
        }
        info!(euid = ?new, "Effective identity changed");
        self.units.set_euid(unit, new)
    }

    /// Whether a session may be rebound by code of `program`.
    ///
    /// `program` is a compiled-program name such as `secure/login.c`; names
    /// with a leading separator or parent references are never accepted.
    pub fn validate_exec(&self, program: &str) -> bool {
        if program.is_empty() || program.starts_with('/') || program.split('/').any(|c| c == "..") {
            return false;
        }
        self.config.policy.exec_programs.contains(program)
    }

    /// Temporarily act as `identity` on `unit`.
    ///
    /// The change passes through [`Mediator::validate_seteuid`]; the prior
    /// identity is restored when the returned scope is dropped.
    pub fn assume_euid(&mut self, unit: UnitId, identity: Identity) -> Option<EuidScope<'_>> {
        if !self.validate_seteuid(unit, Some(&identity)) {
            debug!(%unit, %identity, "Scoped identity refused");
            return None;
        }
        let prior = self.euid_of(unit).cloned();
        self.units.set_euid(unit, Some(identity));
        Some(EuidScope {
            mediator: self,
            unit,
            prior,
        })
    }
}

/// Scoped effective identity; restores the prior identity on drop.
#[derive(Debug)]
pub struct EuidScope<'a> {
    mediator: &'a mut Mediator,
    unit: UnitId,
    prior: Option<Identity>,
}

impl Deref for EuidScope<'_> {
    type Target = Mediator;

    fn deref(&self) -> &Mediator {
        self.mediator
    }
}

impl DerefMut for EuidScope<'_> {
    fn deref_mut(&mut self) -> &mut Mediator {
        self.mediator
    }
}

impl Drop for EuidScope<'_> {
    fn drop(&mut self) {
        debug!(unit = %self.unit, "Restoring effective identity");
        self.mediator.units.set_euid(self.unit, self.prior.take());
    }
}
