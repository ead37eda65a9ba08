//! Session Gateway: connection lifecycle from first contact to teardown.
//!
//! ```text
//! Connecting --logon--> LoggingIn --promote--> Playing
//!      \___________________\______________________\__disconnect__> Disconnected
//! ```

use crate::host::Host;
use crate::mediator::Checkpoint;
use crate::Mediator;
use std::collections::BTreeMap;
use tracing::{debug, error, info, instrument, warn};
use warden_core::{path, Facet, Identity, PrivilegeLevel, UnitId};
use warden_error::{MediatorError, MediatorErrorKind, MediatorResult};

/// Handle of one network connection.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, derive_more::Display, derive_more::From,
)]
#[display("session#{}", _0)]
pub struct SessionId(u64);

impl SessionId {
    /// Raw numeric value.
    pub fn get(self) -> u64 {
        self.0
    }
}

/// Where a connection is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum SessionState {
    /// Login unit created, connection not yet bound
    Connecting,
    /// Bound to the login unit, collecting a name
    LoggingIn,
    /// Bound to a persistent player unit
    Playing,
    /// Binding torn down
    Disconnected,
}

/// State that belongs to one session rather than to the process.
#[derive(Debug, Clone, Default, PartialEq, Eq, derive_getters::Getters)]
pub struct SessionContext {
    /// Identity the player logged in as
    name: Option<Identity>,
    /// Player unit of this session
    player: Option<UnitId>,
    /// Most recent verb dispatched
    last_verb: Option<String>,
    /// Number of verbs dispatched
    verbs_issued: u64,
}

impl SessionContext {
    /// Note a dispatched verb.
    pub fn record_verb(&mut self, verb: &str) {
        self.last_verb = Some(verb.to_string());
        self.verbs_issued += 1;
    }
}

/// One connection and its current binding.
#[derive(Debug, Clone, derive_getters::Getters)]
pub struct Session {
    /// Handle
    id: SessionId,
    /// Lifecycle state
    state: SessionState,
    /// Unit the connection is bound to
    unit: Option<UnitId>,
    #[getter(skip)]
    pending: Option<UnitId>,
    /// Per-session state
    context: SessionContext,
}

#[derive(Debug, Default)]
pub(crate) struct SessionTable {
    sessions: BTreeMap<SessionId, Session>,
    next: u64,
}

impl SessionTable {
    fn open(&mut self, login: UnitId) -> SessionId {
        self.next += 1;
        let id = SessionId(self.next);
        self.sessions.insert(
            id,
            Session {
                id,
                state: SessionState::Connecting,
                unit: None,
                pending: Some(login),
                context: SessionContext::default(),
            },
        );
        id
    }

    fn bound_to(&self, unit: UnitId) -> Option<SessionId> {
        self.sessions
            .values()
            .find(|s| s.unit == Some(unit))
            .map(|s| s.id)
    }

    fn playing_as(&self, name: &Identity) -> Option<SessionId> {
        self.sessions
            .values()
            .find(|s| s.state == SessionState::Playing && s.context.name.as_ref() == Some(name))
            .map(|s| s.id)
    }

    pub(crate) fn bound_units(&self) -> Vec<UnitId> {
        self.sessions.values().filter_map(|s| s.unit).collect()
    }
}

fn not_found(id: SessionId) -> MediatorError {
    MediatorError::new(MediatorErrorKind::SessionNotFound(id.get()))
}

fn refused(reason: impl Into<String>) -> MediatorError {
    MediatorError::new(MediatorErrorKind::PromotionRefused {
        reason: reason.into(),
    })
}

impl Mediator {
    /// Accept a new connection.
    ///
    /// Always instantiates a fresh login unit; the connection is not bound
    /// until [`Mediator::logon`].
    ///
    /// # Errors
    ///
    /// Fails when the login program cannot be attributed to an owner.
    #[instrument(skip(self))]
    pub fn connect(&mut self) -> MediatorResult<(SessionId, UnitId)> {
        let program = self.config.session.login_program.clone();
        let master = self.master();
        let login = self.clone_unit(&program, Some(master), [Facet::Connectable])?;
        let id = self.sessions.open(login);
        info!(session = %id, %login, "Connection accepted");
        Ok((id, login))
    }

    /// Bind a connecting session to its login unit.
    ///
    /// # Errors
    ///
    /// Unknown sessions, sessions past `Connecting`, and sessions whose login
    /// unit has already gone are refused.
    #[instrument(skip(self))]
    pub fn logon(&mut self, id: SessionId) -> MediatorResult<UnitId> {
        let session = self.sessions.sessions.get_mut(&id).ok_or_else(|| not_found(id))?;
        if session.state != SessionState::Connecting {
            return Err(refused(format!("{} is {}", id, session.state)));
        }
        let login = session.pending.take().filter(|login| self.units.contains(*login));
        let Some(login) = login else {
            self.sessions.sessions.remove(&id);
            return Err(refused("login unit is gone"));
        };
        session.unit = Some(login);
        session.state = SessionState::LoggingIn;
        debug!(%login, "Logged on");
        Ok(login)
    }

    /// Promote a logging-in session to a player unit named `name`.
    ///
    /// The login unit assumes the player's identity for the duration of the
    /// promotion, a player unit is cloned on its behalf, and the connection
    /// is rebound through [`Mediator::exec`]. If the rebind is refused the
    /// binding is left unchanged and the new player unit is destroyed. On
    /// success the login unit is always destroyed.
    ///
    /// Wizard and admin names are only granted when the host vouches for the
    /// connection through [`Host::authenticate`]. A name already playing on
    /// another session is refused.
    ///
    /// # Errors
    ///
    /// `InvalidName` for names that fail the configured pattern or are
    /// reserved, `PromotionRefused` for anything else that stops promotion.
    #[instrument(skip(self, host))]
    pub fn promote(&mut self, host: &mut dyn Host, id: SessionId, name: &str) -> MediatorResult<UnitId> {
        let session = self.sessions.sessions.get(&id).ok_or_else(|| not_found(id))?;
        let (SessionState::LoggingIn, Some(login)) = (session.state, session.unit) else {
            return Err(refused(format!("{} is not logging in", id)));
        };

        let name = name.trim().to_lowercase();
        if !self.name_pattern.is_match(&name) {
            return Err(MediatorError::new(MediatorErrorKind::InvalidName {
                reason: format!("must match {}", self.name_pattern.as_str()),
                name,
            }));
        }
        let identity = Identity::new(name.clone());
        let policy = &self.config.policy;
        if identity.as_str().eq_ignore_ascii_case(&policy.root_uid)
            || identity.as_str().eq_ignore_ascii_case(&policy.backbone_uid)
        {
            return Err(MediatorError::new(MediatorErrorKind::InvalidName {
                name,
                reason: "reserved".to_string(),
            }));
        }

        if let Some(other) = self.sessions.playing_as(&identity) {
            return Err(refused(format!("{} is already playing on {}", identity, other)));
        }
        if self.config.policy.level_of(Some(&identity)) > PrivilegeLevel::Player
            && !host.authenticate(id, &identity)
        {
            warn!(session = %id, %identity, "Privileged name not authenticated");
            return Err(refused(format!("{} failed authentication", identity)));
        }
        if self.in_flight(Checkpoint::Destruct(login)) {
            return Err(refused("login unit is being destroyed"));
        }

        let program = self.config.session.player_program.clone();
        let player = {
            let Some(mut scope) = self.assume_euid(login, identity.clone()) else {
                return Err(refused("login unit may not assume the player identity"));
            };
            let player = scope.clone_unit(
                &program,
                Some(login),
                [Facet::Connectable, Facet::Container, Facet::Heartbeat],
            )?;
            if !scope.exec(login, player, login) {
                warn!(%login, %player, "Rebind refused; discarding player unit");
                if !scope.force_destruct(host, player) {
                    error!(%player, "Discarded player unit survived");
                }
                return Err(refused("connection rebind refused"));
            }
            player
        };

        if let Some(session) = self.sessions.sessions.get_mut(&id) {
            session.state = SessionState::Playing;
            session.context.name = Some(identity.clone());
            session.context.player = Some(player);
        }
        if !self.force_destruct(host, login) {
            error!(%login, "Login unit survived promotion");
        }
        info!(session = %id, %player, %identity, "Promoted to player");
        Ok(player)
    }

    /// Rebind the session currently bound to `from` onto `to`, on behalf of
    /// code running in `caller`.
    ///
    /// Refused (binding unchanged) unless the caller's program may exec,
    /// `to` is a connectable unit, and `to` is not bound elsewhere.
    #[instrument(skip(self))]
    pub fn exec(&mut self, caller: UnitId, to: UnitId, from: UnitId) -> bool {
        let Some(program) = self.units.get(caller).map(|unit| path::program_name(unit.path())) else {
            return false;
        };
        if !self.validate_exec(&program) {
            debug!(%program, "Program may not rebind connections");
            return false;
        }
        if !self.units.get(to).is_some_and(|unit| unit.has(Facet::Connectable))
            || self.sessions.bound_to(to).is_some()
        {
            return false;
        }
        let Some(id) = self.sessions.bound_to(from) else {
            return false;
        };
        if let Some(session) = self.sessions.sessions.get_mut(&id) {
            session.unit = Some(to);
        }
        info!(session = %id, "Connection rebound");
        true
    }

    /// Tear down the binding of `unit`'s connection and forget the session.
    ///
    /// Returns the closed session, in state `Disconnected`. Unknown units are
    /// ignored.
    #[instrument(skip(self))]
    pub fn disconnect(&mut self, unit: UnitId) -> Option<Session> {
        let id = self
            .sessions
            .sessions
            .values()
            .find(|s| s.unit == Some(unit) || s.pending == Some(unit))
            .map(|s| s.id)?;
        let mut session = self.sessions.sessions.remove(&id)?;
        session.unit = None;
        session.pending = None;
        session.state = SessionState::Disconnected;
        info!(session = %id, "Disconnected");
        Some(session)
    }

    /// Best-effort graceful removal of a player at shutdown.
    ///
    /// Returns true when the unit is gone afterwards. Never fails; callers
    /// fall back to [`Mediator::force_destruct`] on false.
    #[instrument(skip(self, host))]
    pub fn remove_player(&mut self, host: &mut dyn Host, unit: UnitId) -> bool {
        if !self.is_live(unit) {
            debug!("Already gone");
            return true;
        }
        host.tell(unit, "The game is shutting down. Goodbye.\n");
        self.disconnect(unit);
        match self.destruct(host, unit) {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "Graceful removal failed");
                false
            }
        }
    }

    /// Look up a session.
    pub fn session(&self, id: SessionId) -> Option<&Session> {
        self.sessions.sessions.get(&id)
    }

    /// Per-session state, mutable.
    pub fn context_mut(&mut self, id: SessionId) -> Option<&mut SessionContext> {
        self.sessions.sessions.get_mut(&id).map(|s| &mut s.context)
    }

    /// Session currently bound to `unit`.
    pub fn session_of(&self, unit: UnitId) -> Option<SessionId> {
        self.sessions.bound_to(unit)
    }

    /// True when a connection is bound to `unit`.
    pub fn is_interactive(&self, unit: UnitId) -> bool {
        self.sessions.bound_to(unit).is_some()
    }

    /// Iterate over every open session.
    pub fn sessions(&self) -> impl Iterator<Item = &Session> {
        self.sessions.sessions.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingHost;
    use warden_core::WardenConfig;

    fn mediator() -> Mediator {
        Mediator::new(WardenConfig::default()).unwrap()
    }

    #[test]
    fn test_connect_yields_fresh_units() {
        let mut m = mediator();
        let (a, login_a) = m.connect().unwrap();
        let (b, login_b) = m.connect().unwrap();
        assert_ne!(a, b);
        assert_ne!(login_a, login_b);
        assert_eq!(*m.session(a).unwrap().state(), SessionState::Connecting);
        assert_eq!(*m.session(a).unwrap().unit(), None);
        assert_eq!(m.unit(login_a).unwrap().creator().as_str(), "Root");
    }

    #[test]
    fn test_full_lifecycle() {
        let mut m = mediator();
        let mut host = RecordingHost::default();
        let (id, login) = m.connect().unwrap();
        assert_eq!(m.logon(id).unwrap(), login);
        assert_eq!(*m.session(id).unwrap().state(), SessionState::LoggingIn);

        let player = m.promote(&mut host, id, "  Bob ").unwrap();
        let session = m.session(id).unwrap();
        assert_eq!(*session.state(), SessionState::Playing);
        assert_eq!(*session.unit(), Some(player));
        assert_eq!(session.context().name().as_ref().unwrap().as_str(), "bob");
        assert!(!m.is_live(login));
        let unit = m.unit(player).unwrap();
        assert_eq!(unit.creator().as_str(), "bob");
        assert_eq!(unit.euid().unwrap().as_str(), "bob");

        let closed = m.disconnect(player).unwrap();
        assert_eq!(*closed.state(), SessionState::Disconnected);
        assert_eq!(*closed.unit(), None);
        assert!(m.session(id).is_none());
        assert!(m.is_live(player));
        assert!(m.disconnect(player).is_none());
    }

    #[test]
    fn test_closed_sessions_are_forgotten() {
        let mut m = mediator();
        let mut host = RecordingHost::default();
        for _ in 0..50 {
            let (id, _) = m.connect().unwrap();
            m.logon(id).unwrap();
            let player = m.promote(&mut host, id, "bob").unwrap();
            assert!(m.remove_player(&mut host, player));
        }
        assert_eq!(m.sessions().count(), 0);
        assert_eq!(m.unit_count(), 1);
    }

    #[test]
    fn test_privileged_names_need_authentication() {
        let mut config = WardenConfig::default();
        config.policy.admins.insert(Identity::new("ada"));
        let mut m = Mediator::new(config).unwrap();
        let mut host = RecordingHost::default();
        let (id, login) = m.connect().unwrap();
        m.logon(id).unwrap();
        let units_before = m.unit_count();

        let err = m.promote(&mut host, id, "ada").unwrap_err();
        assert!(matches!(err.kind(), MediatorErrorKind::PromotionRefused { .. }));
        assert_eq!(m.unit_count(), units_before);
        assert_eq!(*m.session(id).unwrap().unit(), Some(login));
        assert_eq!(m.euid_of(login).unwrap().as_str(), "Root");

        host.authenticated.insert(Identity::new("ada"));
        let player = m.promote(&mut host, id, "ada").unwrap();
        assert_eq!(m.level_of_unit(player), PrivilegeLevel::Admin);
    }

    #[test]
    fn test_one_session_per_name() {
        let mut m = mediator();
        let mut host = RecordingHost::default();
        let (first, _) = m.connect().unwrap();
        let (second, second_login) = m.connect().unwrap();
        m.logon(first).unwrap();
        m.logon(second).unwrap();
        let bob = m.promote(&mut host, first, "bob").unwrap();

        assert!(m.promote(&mut host, second, "bob").is_err());
        assert!(m.is_live(second_login));
        assert_eq!(*m.session(second).unwrap().state(), SessionState::LoggingIn);

        assert!(m.remove_player(&mut host, bob));
        assert!(m.promote(&mut host, second, "bob").is_ok());
    }

    #[test]
    fn test_refused_promotion_restores_prior_identity() {
        let mut config = WardenConfig::default();
        config.policy.exec_programs.clear();
        let mut m = Mediator::new(config).unwrap();
        let mut host = RecordingHost::default();
        let (id, login) = m.connect().unwrap();
        m.logon(id).unwrap();
        assert!(m.seteuid(login, None));

        assert!(m.promote(&mut host, id, "bob").is_err());
        assert_eq!(m.euid_of(login), None);
    }

    #[test]
    fn test_promotion_refused_while_login_is_being_destroyed() {
        let mut m = mediator();
        let mut host = RecordingHost::default();
        let (id, login) = m.connect().unwrap();
        m.logon(id).unwrap();
        let units_before = m.unit_count();

        let outcome = m.guarded(Checkpoint::Destruct(login), None, |m| {
            Some(m.promote(&mut host, id, "bob"))
        });
        assert!(matches!(outcome, Some(Err(_))));
        assert_eq!(m.unit_count(), units_before);
        assert_eq!(*m.session(id).unwrap().unit(), Some(login));
    }

    #[test]
    fn test_invalid_name_keeps_login() {
        let mut m = mediator();
        let mut host = RecordingHost::default();
        let (id, login) = m.connect().unwrap();
        m.logon(id).unwrap();
        let err = m.promote(&mut host, id, "x1").unwrap_err();
        assert!(matches!(err.kind(), MediatorErrorKind::InvalidName { .. }));
        assert!(m.is_live(login));
        assert_eq!(*m.session(id).unwrap().unit(), Some(login));
        assert_eq!(m.euid_of(login).unwrap().as_str(), "Root");
    }

    #[test]
    fn test_refused_exec_leaves_binding_and_discards_player() {
        let mut config = WardenConfig::default();
        config.policy.exec_programs.clear();
        let mut m = Mediator::new(config).unwrap();
        let mut host = RecordingHost::default();
        let (id, login) = m.connect().unwrap();
        m.logon(id).unwrap();
        let units_before = m.unit_count();

        assert!(m.promote(&mut host, id, "bob").is_err());
        assert_eq!(*m.session(id).unwrap().unit(), Some(login));
        assert_eq!(*m.session(id).unwrap().state(), SessionState::LoggingIn);
        assert_eq!(m.unit_count(), units_before);
        assert_eq!(m.euid_of(login).unwrap().as_str(), "Root");
    }

    #[test]
    fn test_promote_requires_logon() {
        let mut m = mediator();
        let mut host = RecordingHost::default();
        let (id, _) = m.connect().unwrap();
        assert!(m.promote(&mut host, id, "bob").is_err());
        assert!(m.promote(&mut host, SessionId::from(99), "bob").is_err());
    }

    #[test]
    fn test_remove_player_never_fails_on_gone_unit() {
        let mut m = mediator();
        let mut host = RecordingHost::default();
        let (id, _) = m.connect().unwrap();
        m.logon(id).unwrap();
        let player = m.promote(&mut host, id, "bob").unwrap();
        assert!(m.remove_player(&mut host, player));
        assert!(!m.is_live(player));
        assert!(m.remove_player(&mut host, player));
        m.disconnect(player);
    }

    #[test]
    fn test_contexts_do_not_leak() {
        let mut m = mediator();
        let mut host = RecordingHost::default();
        let (a, _) = m.connect().unwrap();
        let (b, _) = m.connect().unwrap();
        m.logon(a).unwrap();
        m.logon(b).unwrap();
        m.promote(&mut host, a, "alice").unwrap();
        m.context_mut(a).unwrap().record_verb("look");
        let other = m.session(b).unwrap().context();
        assert_eq!(other, &SessionContext::default());
    }
}
