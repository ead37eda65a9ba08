//! Command dispatch errors.

/// Specific command dispatch conditions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, derive_more::Display)]
pub enum CommandErrorKind {
    /// The acting player lacks the level a handler requires.
    #[display("Verb '{}' requires level {}", verb, required)]
    InsufficientLevel {
        /// Verb that was refused
        verb: String,
        /// Level the handler declares
        required: String,
    },

    /// The session has no player bound to it.
    #[display("No player bound to session")]
    NoPlayer,

    /// The handler itself failed.
    #[display("Handler for '{}' failed: {}", verb, reason)]
    HandlerFailed {
        /// Verb whose handler failed
        verb: String,
        /// Failure description
        reason: String,
    },
}

/// Command error with location tracking.
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Command Error: {} at line {} in {}", kind, line, file)]
pub struct CommandError {
    kind: CommandErrorKind,
    line: u32,
    file: &'static str,
}

impl CommandError {
    /// Create a new command error with caller location tracking.
    #[track_caller]
    pub fn new(kind: CommandErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }

    /// Get the error kind.
    pub fn kind(&self) -> &CommandErrorKind {
        &self.kind
    }
}
