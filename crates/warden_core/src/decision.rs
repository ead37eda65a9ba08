//! Decision values returned by the mediator.

use serde::{Deserialize, Serialize};

/// Outcome of a privileged-operation check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Decision {
    /// The operation proceeds.
    Allow,
    /// Denied without an error; the caller was probably mistaken.
    SilentlyCorrect,
    /// Denied and raised as an error at the call site.
    Violation,
}

impl Decision {
    /// The host's integer protocol: positive allows, zero corrects silently,
    /// negative is a violation.
    ///
    /// # Examples
    ///
    /// ```
    /// use warden_core::Decision;
    ///
    /// assert_eq!(Decision::Allow.code(), 1);
    /// assert_eq!(Decision::from_code(0), Decision::SilentlyCorrect);
    /// assert_eq!(Decision::from_code(-7), Decision::Violation);
    /// ```
    pub fn code(self) -> i32 {
        match self {
            Decision::Allow => 1,
            Decision::SilentlyCorrect => 0,
            Decision::Violation => -1,
        }
    }

    /// Interpret a host integer; every non-positive, non-zero value is a violation.
    pub fn from_code(code: i32) -> Self {
        match code {
            c if c > 0 => Decision::Allow,
            0 => Decision::SilentlyCorrect,
            _ => Decision::Violation,
        }
    }

    /// True only for `Allow`.
    pub fn is_allowed(self) -> bool {
        self == Decision::Allow
    }
}

/// Outcome of a file access check.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FileAccess {
    /// Authorized against exactly this canonical path, not the original.
    Canonical(String),
    /// Authorized against the original path verbatim.
    Unchanged,
    /// Refused; the primitive fails with an access error.
    Deny,
}

impl FileAccess {
    /// True for either allowing outcome.
    pub fn is_allowed(&self) -> bool {
        !matches!(self, FileAccess::Deny)
    }

    /// The path the primitive must operate on, given the path it was asked for.
    pub fn resolve<'a>(&'a self, original: &'a str) -> Option<&'a str> {
        match self {
            FileAccess::Canonical(path) => Some(path),
            FileAccess::Unchanged => Some(original),
            FileAccess::Deny => None,
        }
    }
}
