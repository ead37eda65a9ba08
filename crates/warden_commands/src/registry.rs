//! Registry for command handlers.

use crate::{CommandContext, CommandHandler, CommandInfo};
use std::collections::HashMap;
use std::sync::Arc;
use warden_error::{CommandError, CommandErrorKind};
use warden_security::{Host, Mediator, SessionId, SessionState};

/// Handlers keyed by verb.
pub struct CommandRegistry {
    handlers: HashMap<String, Arc<dyn CommandHandler>>,
}

impl CommandRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Register a handler.
    ///
    /// If a handler for the same verb already exists, it will be replaced and a warning logged.
    #[tracing::instrument(skip(self, handler), fields(verb = handler.verb()))]
    pub fn register(&mut self, handler: Arc<dyn CommandHandler>) {
        let verb = handler.verb().to_string();

        if self.handlers.contains_key(&verb) {
            tracing::warn!(verb = %verb, "Verb already registered, overwriting previous registration");
        } else {
            tracing::debug!("Registering verb");
        }

        self.handlers.insert(verb, handler);
    }

    /// Get a handler by verb.
    pub fn get(&self, verb: &str) -> Option<Arc<dyn CommandHandler>> {
        self.handlers.get(verb).cloned()
    }

    /// Dispatch `verb` for the player bound to `session`.
    ///
    /// Returns `Ok(false)` for verbs nobody handles.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - The session has no playing player
    /// - The player's level is below the handler's requirement
    /// - The handler fails
    #[tracing::instrument(skip(self, mediator, host, argument))]
    pub fn dispatch(
        &self,
        mediator: &mut Mediator,
        host: &mut dyn Host,
        session: SessionId,
        verb: &str,
        argument: Option<&str>,
    ) -> Result<bool, CommandError> {
        let player = mediator
            .session(session)
            .filter(|s| *s.state() == SessionState::Playing)
            .and_then(|s| *s.unit())
            .ok_or_else(|| CommandError::new(CommandErrorKind::NoPlayer))?;

        let Some(handler) = self.get(verb) else {
            tracing::debug!("No handler for verb");
            return Ok(false);
        };

        let required = handler.required_level();
        let level = mediator.level_of_unit(player);
        if level < required {
            tracing::debug!(%level, %required, "Verb refused");
            return Err(CommandError::new(CommandErrorKind::InsufficientLevel {
                verb: verb.to_string(),
                required: required.to_string(),
            }));
        }

        if let Some(context) = mediator.context_mut(session) {
            context.record_verb(verb);
        }
        let mut context = CommandContext::new(mediator, host, session, player, verb, argument);
        handler.execute(&mut context)
    }

    /// List all registered handlers, sorted by verb.
    pub fn list(&self) -> Vec<CommandInfo> {
        let mut infos: Vec<CommandInfo> = self
            .handlers
            .values()
            .map(|handler| CommandInfo {
                verb: handler.verb().to_string(),
                description: handler.description().to_string(),
                required_level: handler.required_level(),
            })
            .collect();
        infos.sort_by(|a, b| a.verb().cmp(b.verb()));
        infos
    }

    /// Get number of registered handlers.
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Check if registry is empty.
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::new()
    }
}
