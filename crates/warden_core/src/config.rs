//! Configuration structures for the mediator.
//!
//! Configuration is TOML with layered precedence:
//! - Bundled defaults (include_str! from warden.toml)
//! - User overrides (~/.config/warden/warden.toml, then ./warden.toml)
//!
//! Later sources override earlier ones key by key.

use crate::{path, Identity, PrivilegeLevel};
use config::{Config, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::{debug, instrument};
use warden_error::ConfigError;

/// Identity and namespace policy.
///
/// # Example
///
/// ```toml
/// [policy]
/// root_uid = "Root"
/// backbone_uid = "Backbone"
/// admins = ["ada"]
/// player_root = "/players"
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, derive_setters::Setters)]
#[setters(prefix = "with_")]
#[serde(default)]
pub struct PolicyConfig {
    /// Identity with unrestricted access to the whole tree
    pub root_uid: Identity,

    /// Shared default owner; units attributed to it take their instantiator's identity
    pub backbone_uid: Identity,

    /// Administratively privileged identities
    pub admins: BTreeSet<Identity>,

    /// Identities with builder privileges
    pub wizards: BTreeSet<Identity>,

    /// Parent of per-identity home namespaces (`<player_root>/<uid>`)
    pub player_root: String,

    /// Parent of domain namespaces (`<domain_root>/<uid>`)
    pub domain_root: String,

    /// Paths owned by the root identity
    pub root_prefixes: Vec<String>,

    /// Paths owned by the backbone identity
    pub backbone_prefixes: Vec<String>,

    /// Paths any identified requester may read
    pub public_read_prefixes: Vec<String>,

    /// Paths any identified requester may write (root-owned paths excepted)
    pub public_write_prefixes: Vec<String>,

    /// Compiled-program names allowed to rebind a live connection
    pub exec_programs: BTreeSet<String>,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        let owned = |items: &[&str]| items.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        Self {
            root_uid: Identity::new("Root"),
            backbone_uid: Identity::new("Backbone"),
            admins: BTreeSet::new(),
            wizards: BTreeSet::new(),
            player_root: "/players".to_string(),
            domain_root: "/domains".to_string(),
            root_prefixes: owned(&["/secure", "/etc", "/log"]),
            backbone_prefixes: owned(&["/obj", "/std", "/room", "/cmds", "/include", "/sys", "/lib"]),
            public_read_prefixes: owned(&[
                "/obj", "/std", "/room", "/cmds", "/include", "/sys", "/lib", "/doc", "/open",
            ]),
            public_write_prefixes: owned(&["/open"]),
            exec_programs: ["secure/login.c", "secure/master.c"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl PolicyConfig {
    /// Privilege level of an identity; absent identities are players.
    pub fn level_of(&self, identity: Option<&Identity>) -> PrivilegeLevel {
        match identity {
            Some(id) if *id == self.root_uid => PrivilegeLevel::Root,
            Some(id) if self.admins.contains(id) => PrivilegeLevel::Admin,
            Some(id) if self.wizards.contains(id) => PrivilegeLevel::Wizard,
            _ => PrivilegeLevel::Player,
        }
    }

    /// Home namespace of an identity, `None` for root and backbone.
    pub fn home_of(&self, identity: &Identity) -> Option<String> {
        if *identity == self.root_uid || *identity == self.backbone_uid {
            return None;
        }
        Some(path::join(&self.player_root, identity.as_str()))
    }

    /// Domain namespace of an identity.
    pub fn domain_of(&self, identity: &Identity) -> Option<String> {
        if *identity == self.root_uid || *identity == self.backbone_uid {
            return None;
        }
        Some(path::join(&self.domain_root, identity.as_str()))
    }

    /// Validates the policy.
    ///
    /// # Errors
    ///
    /// Returns an error for empty or colliding root/backbone identities,
    /// non-absolute roots, or exec programs with a leading separator.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.root_uid.is_empty() {
            return Err(ConfigError::new("policy.root_uid must not be empty"));
        }
        if self.backbone_uid.is_empty() {
            return Err(ConfigError::new("policy.backbone_uid must not be empty"));
        }
        if self.root_uid == self.backbone_uid {
            return Err(ConfigError::new(
                "policy.backbone_uid must differ from policy.root_uid",
            ));
        }
        let roots = [&self.player_root, &self.domain_root]
            .into_iter()
            .chain(&self.root_prefixes)
            .chain(&self.backbone_prefixes)
            .chain(&self.public_read_prefixes)
            .chain(&self.public_write_prefixes);
        for root in roots {
            if path::normalize(root).is_none() {
                return Err(ConfigError::new(format!(
                    "policy path '{}' must be absolute and canonical",
                    root
                )));
            }
        }
        if let Some(program) = self.exec_programs.iter().find(|p| p.starts_with('/')) {
            return Err(ConfigError::new(format!(
                "policy.exec_programs entry '{}' must not start with '/'",
                program
            )));
        }
        Ok(())
    }
}

/// Connection lifecycle settings.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, derive_setters::Setters)]
#[setters(prefix = "with_")]
#[serde(default)]
pub struct SessionConfig {
    /// Path of the master unit the mediator acts as
    pub master_path: String,
    /// Program instantiated for every new connection
    pub login_program: String,
    /// Program instantiated when a login is promoted
    pub player_program: String,
    /// Where evacuated interactive units go when their container has no environment
    pub void_path: String,
    /// Regex every login name must match after lowercasing
    pub name_pattern: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            master_path: "/secure/master".to_string(),
            login_program: "secure/login.c".to_string(),
            player_program: "obj/player.c".to_string(),
            void_path: "/room/void".to_string(),
            name_pattern: "^[a-z]{2,11}$".to_string(),
        }
    }
}

/// Error reporting settings.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, derive_setters::Setters)]
#[setters(prefix = "with_")]
#[serde(default)]
pub struct ReportingConfig {
    /// Tell online administrators about compile errors
    pub surface_compile_errors: bool,
    /// Heartbeat failures tolerated per unit before it stays off
    pub heartbeat_restart_limit: u32,
}

impl Default for ReportingConfig {
    fn default() -> Self {
        Self {
            surface_compile_errors: true,
            heartbeat_restart_limit: 3,
        }
    }
}

/// Memory-pressure eviction settings.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, Default, derive_setters::Setters)]
#[setters(prefix = "with_")]
pub struct QuotaConfig {
    /// Owners whose units the quota demon never evicts
    #[serde(default)]
    pub exempt_identities: BTreeSet<Identity>,
}

/// Log channel settings for file-backed hosts.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct JournalConfig {
    /// Directory holding one file per log channel
    pub log_dir: String,
}

impl Default for JournalConfig {
    fn default() -> Self {
        Self {
            log_dir: "log".to_string(),
        }
    }
}

/// Top-level Warden configuration.
///
/// # Example
///
/// ```no_run
/// use warden_core::WardenConfig;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let config = WardenConfig::load()?;
/// println!("root identity: {}", config.policy.root_uid);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, Default, derive_setters::Setters)]
#[setters(prefix = "with_")]
pub struct WardenConfig {
    /// Identity and namespace policy
    #[serde(default)]
    pub policy: PolicyConfig,
    /// Connection lifecycle
    #[serde(default)]
    pub session: SessionConfig,
    /// Error reporting
    #[serde(default)]
    pub reporting: ReportingConfig,
    /// Memory-pressure eviction
    #[serde(default)]
    pub quota: QuotaConfig,
    /// Log channels
    #[serde(default)]
    pub journal: JournalConfig,
}

impl WardenConfig {
    /// Load configuration from a specific file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed, or validated.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self, ConfigError> {
        debug!("Loading configuration from file");

        let config: Self = Config::builder()
            .add_source(File::from(path.as_ref()))
            .build()
            .map_err(|e| {
                ConfigError::new(format!(
                    "Failed to read configuration from {}: {}",
                    path.as_ref().display(),
                    e
                ))
            })?
            .try_deserialize()
            .map_err(|e| ConfigError::new(format!("Failed to parse configuration: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration with precedence: current dir > home dir > bundled defaults.
    ///
    /// User config files are optional and silently skipped when absent.
    ///
    /// # Errors
    ///
    /// Returns an error if any present source fails to parse or the merged
    /// configuration fails validation.
    #[instrument]
    pub fn load() -> Result<Self, ConfigError> {
        debug!("Loading configuration with precedence: current dir > home dir > bundled defaults");

        const DEFAULT_CONFIG: &str = include_str!("../../../warden.toml");

        let mut builder =
            Config::builder().add_source(File::from_str(DEFAULT_CONFIG, FileFormat::Toml));

        if let Some(home) = dirs::home_dir() {
            let home_config = home.join(".config/warden/warden.toml");
            builder = builder.add_source(File::from(home_config).required(false));
        }

        builder = builder.add_source(File::with_name("warden").required(false));

        let config: Self = builder
            .build()
            .map_err(|e| ConfigError::new(format!("Failed to build configuration: {}", e)))?
            .try_deserialize()
            .map_err(|e| ConfigError::new(format!("Failed to parse configuration: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Validates every section.
    ///
    /// # Errors
    ///
    /// Returns the first validation failure.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.policy.validate()?;
        for (key, value) in [
            ("session.master_path", &self.session.master_path),
            ("session.void_path", &self.session.void_path),
        ] {
            if path::normalize(value).as_deref() != Some(value.as_str()) {
                return Err(ConfigError::new(format!(
                    "{} '{}' must be absolute and canonical",
                    key, value
                )));
            }
        }
        if self.session.name_pattern.is_empty() {
            return Err(ConfigError::new("session.name_pattern must not be empty"));
        }
        Ok(())
    }
}
