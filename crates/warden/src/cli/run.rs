//! Command implementations.

use super::ConfigFormat;
use std::path::Path;
use std::str::FromStr;
use tracing::debug;
use warden::{
    ConfigError, Decision, FileAccess, Identity, JournalHost, Mediator, PrivilegeArg,
    PrivilegedOp, WardenConfig, WardenResult,
};

/// Load the configuration from `path`, or the layered defaults.
pub fn load_config(path: Option<&Path>) -> WardenResult<WardenConfig> {
    let config = match path {
        Some(path) => WardenConfig::from_file(path)?,
        None => WardenConfig::load()?,
    };
    Ok(config)
}

/// Report a read or write check.
pub fn check_access(
    config: WardenConfig,
    write: bool,
    path: &str,
    euid: &str,
    op: &str,
) -> WardenResult<()> {
    let mediator = Mediator::new(config)?;
    let euid = Identity::new(euid);
    let access = if write {
        mediator.validate_write(path, Some(&euid), op, None)
    } else {
        mediator.validate_read(path, Some(&euid), op, None)
    };
    match access {
        FileAccess::Canonical(canonical) => println!("allowed: {}", canonical),
        FileAccess::Unchanged => println!("allowed: {} (unchanged)", path),
        FileAccess::Deny => println!("denied"),
    }
    Ok(())
}

/// Report the owner of a path.
pub fn show_creator(config: WardenConfig, path: &str) -> WardenResult<()> {
    let mediator = Mediator::new(config)?;
    match mediator.creator_file(path) {
        Some(owner) => println!("{}", owner),
        None => println!("<none>"),
    }
    Ok(())
}

/// Decide a privileged operation for a requester acting as `euid`.
///
/// The master unit assumes `euid` for the duration of the decision.
pub fn decide(
    config: WardenConfig,
    op: &str,
    euid: &str,
    unit: Option<&str>,
    identity: Option<&str>,
    text: Option<&str>,
) -> WardenResult<()> {
    let mut host = JournalHost::from_config(&config.journal);
    let mut mediator = Mediator::new(config)?;
    let master = mediator.master();

    let arg = match (unit, identity) {
        (Some(program), _) => PrivilegeArg::Unit(mediator.load(program, None, [])?),
        (None, Some(identity)) => PrivilegeArg::Identity(Identity::new(identity)),
        (None, None) => PrivilegeArg::None,
    };
    let arg2 = text.map_or(PrivilegeArg::None, |t| PrivilegeArg::Text(t.to_string()));

    let Ok(op) = PrivilegedOp::from_str(op) else {
        println!("deny ({})", Decision::SilentlyCorrect.code());
        return Ok(());
    };
    let Some(mut scope) = mediator.assume_euid(master, Identity::new(euid)) else {
        return Err(ConfigError::new(format!("'{}' cannot be assumed", euid)).into());
    };
    debug!(requester = %master, "Deciding as scoped identity");
    match scope.enforce(&mut host, op, master, &arg, &arg2) {
        Ok(true) => println!("allow ({})", Decision::Allow.code()),
        Ok(false) => println!("deny ({})", Decision::SilentlyCorrect.code()),
        Err(e) if e.is_violation() => println!("violation ({}): {}", Decision::Violation.code(), e),
        Err(e) => return Err(e.into()),
    }
    Ok(())
}

/// Print the configuration.
pub fn show_config(config: &WardenConfig, format: ConfigFormat) -> WardenResult<()> {
    let rendered = match format {
        ConfigFormat::Toml => toml::to_string_pretty(config)
            .map_err(|e| ConfigError::new(format!("Failed to render configuration: {}", e)))?,
        ConfigFormat::Json => serde_json::to_string_pretty(config)
            .map_err(|e| ConfigError::new(format!("Failed to render configuration: {}", e)))?,
    };
    println!("{}", rendered);
    Ok(())
}
