//! Mediator error types.
//!
//! Only two kinds of outcome become a `MediatorError`: genuine privilege
//! violations, and host requests the mediator cannot carry out (refused
//! instantiation, unknown session, vetoed destruction). Ordinary policy
//! denials are plain return values.

/// Specific mediator error conditions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, derive_more::Display)]
pub enum MediatorErrorKind {
    /// A requester attempted an operation outside honest-mistake territory.
    #[display("Privilege violation: {} attempted '{}': {}", requester, operation, reason)]
    PrivilegeViolation {
        /// Operation name as the host knows it
        operation: String,
        /// Path of the requesting unit
        requester: String,
        /// Why the attempt counts as a violation
        reason: String,
    },

    /// The identity resolver refused to attribute an owner.
    #[display("Instantiation refused for '{}': no owning identity", path)]
    InstantiationRefused {
        /// Program path that could not be attributed
        path: String,
    },

    /// No session with the given id exists.
    #[display("Session {} not found", _0)]
    SessionNotFound(u64),

    /// A login name failed validation.
    #[display("Invalid name '{}': {}", name, reason)]
    InvalidName {
        /// Name as typed
        name: String,
        /// Reason for rejection
        reason: String,
    },

    /// Promotion from login to player unit was refused.
    #[display("Promotion refused: {}", reason)]
    PromotionRefused {
        /// Reason for refusal
        reason: String,
    },

    /// The destruction gatekeeper vetoed a destruction.
    #[display("Destruction of '{}' aborted: {}", path, reason)]
    DestructAborted {
        /// Path of the unit that stays live
        path: String,
        /// Veto reason
        reason: String,
    },
}

/// Mediator error with location tracking.
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Mediator Error: {} at line {} in {}", kind, line, file)]
pub struct MediatorError {
    /// The specific error kind
    pub kind: MediatorErrorKind,
    /// Line number where error occurred
    pub line: u32,
    /// File where error occurred
    pub file: &'static str,
}

impl MediatorError {
    /// Create a new mediator error with location tracking.
    #[track_caller]
    pub fn new(kind: MediatorErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }

    /// Get the error kind.
    pub fn kind(&self) -> &MediatorErrorKind {
        &self.kind
    }

    /// True when this error is a privilege violation.
    pub fn is_violation(&self) -> bool {
        matches!(self.kind, MediatorErrorKind::PrivilegeViolation { .. })
    }
}

/// Result type for mediator operations.
pub type MediatorResult<T> = Result<T, MediatorError>;
