//! File Access Validator.
//!
//! Every filesystem-shaped request is canonicalized first and authorized
//! against the canonical path only. Callers must operate on the path the
//! validator hands back, never on the one they asked about.

use crate::Mediator;
use std::str::FromStr;
use tracing::{debug, instrument};
use warden_core::{path, AccessMode, FileAccess, FileOp, Identity, PrivilegeLevel, UnitId};

impl Mediator {
    /// Authorize a read.
    ///
    /// `operation` names the host primitive (`read_file`, `get_dir`, ...);
    /// unknown or write-only names are denied.
    #[instrument(skip(self))]
    pub fn validate_read(
        &self,
        path: &str,
        euid: Option<&Identity>,
        operation: &str,
        caller: Option<UnitId>,
    ) -> FileAccess {
        self.validate_access(AccessMode::Read, path, euid, operation, caller)
    }

    /// Authorize a write.
    #[instrument(skip(self))]
    pub fn validate_write(
        &self,
        path: &str,
        euid: Option<&Identity>,
        operation: &str,
        caller: Option<UnitId>,
    ) -> FileAccess {
        self.validate_access(AccessMode::Write, path, euid, operation, caller)
    }

    /// Authorize a read on behalf of a unit, using its current effective identity.
    pub fn validate_read_for(&self, caller: UnitId, path: &str, operation: &str) -> FileAccess {
        self.validate_read(path, self.euid_of(caller), operation, Some(caller))
    }

    /// Authorize a write on behalf of a unit, using its current effective identity.
    pub fn validate_write_for(&self, caller: UnitId, path: &str, operation: &str) -> FileAccess {
        self.validate_write(path, self.euid_of(caller), operation, Some(caller))
    }

    /// Authorize a rename; both endpoints must be writable.
    ///
    /// Returns the canonical `(from, to)` pair to operate on.
    pub fn validate_rename(
        &self,
        from: &str,
        to: &str,
        euid: Option<&Identity>,
        caller: Option<UnitId>,
    ) -> Option<(String, String)> {
        let source = self.validate_write(from, euid, "do_rename", caller);
        let target = self.validate_write(to, euid, "do_rename", caller);
        Some((
            source.resolve(from)?.to_string(),
            target.resolve(to)?.to_string(),
        ))
    }

    fn validate_access(
        &self,
        mode: AccessMode,
        requested: &str,
        euid: Option<&Identity>,
        operation: &str,
        caller: Option<UnitId>,
    ) -> FileAccess {
        let Ok(op) = FileOp::from_str(operation) else {
            debug!(operation, "Unknown file operation");
            return FileAccess::Deny;
        };
        let direction_ok = match mode {
            AccessMode::Read => op.is_read(),
            AccessMode::Write => op.is_write(),
            AccessMode::Either => true,
        };
        if !direction_ok {
            debug!(%op, %mode, "Operation used in the wrong direction");
            return FileAccess::Deny;
        }
        if caller.is_some_and(|id| !self.is_live(id)) {
            debug!("Caller no longer live");
            return FileAccess::Deny;
        }
        let Some(euid) = euid else {
            debug!("No effective identity");
            return FileAccess::Deny;
        };
        let Some(canonical) = self.canonicalize(requested, euid) else {
            debug!(requested, "Path does not canonicalize");
            return FileAccess::Deny;
        };

        let allowed = match mode {
            AccessMode::Write => self.may_write(&canonical, euid),
            _ => self.may_read(&canonical, euid),
        };
        if !allowed {
            debug!(%canonical, "Access denied");
            FileAccess::Deny
        } else if canonical == requested {
            FileAccess::Unchanged
        } else {
            FileAccess::Canonical(canonical)
        }
    }

    /// Canonical absolute form of a request made by `euid`.
    ///
    /// Relative paths resolve against the identity's home (the root directory
    /// for identities without one); `~/x` names the home and `~name/x` a
    /// player's home.
    pub fn canonicalize(&self, requested: &str, euid: &Identity) -> Option<String> {
        let policy = &self.config.policy;
        let home = policy.home_of(euid);
        let absolute = if requested.is_empty() {
            return None;
        } else if requested.starts_with('/') {
            requested.to_string()
        } else if let Some(rest) = requested.strip_prefix('~') {
            let (name, tail) = rest.split_once('/').unwrap_or((rest, ""));
            let base = if name.is_empty() {
                home?
            } else {
                path::join(&policy.player_root, name)
            };
            path::join(&base, tail)
        } else {
            path::join(home.as_deref().unwrap_or("/"), requested)
        };
        path::normalize(&absolute)
    }

    fn in_own_namespace(&self, canonical: &str, euid: &Identity) -> bool {
        let policy = &self.config.policy;
        [policy.home_of(euid), policy.domain_of(euid)]
            .into_iter()
            .flatten()
            .any(|ns| path::is_under(canonical, &ns))
    }

    /// True for paths only root may write.
    pub fn is_root_owned(&self, canonical: &str) -> bool {
        canonical == "/" || self.creator_file(canonical).as_ref() == Some(&self.config.policy.root_uid)
    }

    fn may_read(&self, canonical: &str, euid: &Identity) -> bool {
        let policy = &self.config.policy;
        policy.level_of(Some(euid)) >= PrivilegeLevel::Admin
            || self.in_own_namespace(canonical, euid)
            || policy.public_read_prefixes.iter().any(|p| path::is_under(canonical, p))
    }

    fn may_write(&self, canonical: &str, euid: &Identity) -> bool {
        let policy = &self.config.policy;
        if *euid == policy.root_uid {
            return true;
        }
        if self.is_root_owned(canonical) {
            return false;
        }
        policy.level_of(Some(euid)) >= PrivilegeLevel::Admin
            || self.in_own_namespace(canonical, euid)
            || policy.public_write_prefixes.iter().any(|p| path::is_under(canonical, p))
    }
}
