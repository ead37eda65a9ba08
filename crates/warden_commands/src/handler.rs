//! The handler trait and the context handlers run with.

use warden_core::{PrivilegeLevel, UnitId};
use warden_error::CommandError;
use warden_security::{Host, Mediator, SessionContext, SessionId};

/// Everything a handler may touch while it runs.
pub struct CommandContext<'a> {
    mediator: &'a mut Mediator,
    host: &'a mut dyn Host,
    session: SessionId,
    player: UnitId,
    verb: String,
    argument: Option<String>,
}

impl<'a> CommandContext<'a> {
    pub(crate) fn new(
        mediator: &'a mut Mediator,
        host: &'a mut dyn Host,
        session: SessionId,
        player: UnitId,
        verb: &str,
        argument: Option<&str>,
    ) -> Self {
        Self {
            mediator,
            host,
            session,
            player,
            verb: verb.to_string(),
            argument: argument.map(str::to_string),
        }
    }

    /// The mediator, for consulting policy.
    pub fn mediator(&mut self) -> &mut Mediator {
        self.mediator
    }

    /// The host runtime.
    pub fn host(&mut self) -> &mut (dyn Host + 'a) {
        &mut *self.host
    }

    /// Session the verb arrived on.
    pub fn session(&self) -> SessionId {
        self.session
    }

    /// Player unit acting.
    pub fn player(&self) -> UnitId {
        self.player
    }

    /// Verb being run.
    pub fn verb(&self) -> &str {
        &self.verb
    }

    /// Text after the verb, if any.
    pub fn argument(&self) -> Option<&str> {
        self.argument.as_deref()
    }

    /// State of this session.
    pub fn session_context(&mut self) -> Option<&mut SessionContext> {
        self.mediator.context_mut(self.session)
    }

    /// Send a message to the acting player.
    pub fn tell(&mut self, message: &str) {
        self.host.tell(self.player, message);
    }
}

/// A command implementation.
pub trait CommandHandler: Send + Sync {
    /// Verb the handler answers to.
    fn verb(&self) -> &str;

    /// One-line description.
    fn description(&self) -> &str {
        ""
    }

    /// Lowest level allowed to run the verb.
    fn required_level(&self) -> PrivilegeLevel {
        PrivilegeLevel::Player
    }

    /// Run the verb.
    ///
    /// Returns `Ok(false)` when the handler declines the input, letting the
    /// caller try something else.
    ///
    /// # Errors
    ///
    /// Returns error if the handler fails.
    fn execute(&self, context: &mut CommandContext<'_>) -> Result<bool, CommandError>;
}

/// Information about a registered handler.
#[derive(Debug, Clone, PartialEq, Eq, derive_getters::Getters)]
pub struct CommandInfo {
    /// Verb
    pub(crate) verb: String,
    /// Description
    pub(crate) description: String,
    /// Lowest level allowed
    pub(crate) required_level: PrivilegeLevel,
}
