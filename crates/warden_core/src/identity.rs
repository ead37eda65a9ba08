//! Owning principals.

use serde::{Deserialize, Serialize};

/// An opaque, process-unique name for an owner.
///
/// Absence of an owner is expressed as `Option<Identity>::None`, never as an
/// empty string.
///
/// # Examples
///
/// ```
/// use warden_core::Identity;
///
/// let bob = Identity::new("bob");
/// assert_eq!(bob.as_str(), "bob");
/// assert_eq!(format!("{}", bob), "bob");
/// ```
#[derive(
    Debug,
    Clone,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    derive_more::Display,
    derive_more::From,
    derive_more::Deref,
)]
#[serde(transparent)]
pub struct Identity(String);

impl Identity {
    /// Wrap a name as an identity.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The identity's name.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Identity {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// How much the runtime trusts an identity.
///
/// Ordered from least to most privileged.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PrivilegeLevel {
    /// Ordinary player
    Player,
    /// Builder with a home namespace
    Wizard,
    /// Administratively privileged
    Admin,
    /// The root identity
    Root,
}

impl PrivilegeLevel {
    /// True for administrators and root.
    pub fn is_admin(self) -> bool {
        self >= PrivilegeLevel::Admin
    }
}
