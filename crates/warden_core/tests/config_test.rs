//! Tests for the layered configuration system.

use std::io::Write;
use tempfile::Builder;
use warden_core::{Identity, PrivilegeLevel, WardenConfig};

#[test]
fn test_load_bundled_defaults() {
    let config = WardenConfig::load().unwrap();

    assert_eq!(config.policy.root_uid, Identity::new("Root"));
    assert_eq!(config.policy.backbone_uid, Identity::new("Backbone"));
    assert!(config.policy.root_prefixes.iter().any(|p| p == "/secure"));
    assert!(config.policy.exec_programs.contains("secure/login.c"));
    assert_eq!(config.session.player_program, "obj/player.c");
    assert_eq!(config.reporting.heartbeat_restart_limit, 3);
}

#[test]
fn test_config_from_file_keeps_unmentioned_defaults() {
    let mut temp_file = Builder::new().suffix(".toml").tempfile().unwrap();
    writeln!(
        temp_file,
        r#"
[policy]
admins = ["ada"]
wizards = ["bob"]

[reporting]
heartbeat_restart_limit = 0
"#
    )
    .unwrap();

    let config = WardenConfig::from_file(temp_file.path()).unwrap();

    assert_eq!(
        config.policy.level_of(Some(&Identity::new("ada"))),
        PrivilegeLevel::Admin
    );
    assert_eq!(
        config.policy.level_of(Some(&Identity::new("bob"))),
        PrivilegeLevel::Wizard
    );
    assert_eq!(config.reporting.heartbeat_restart_limit, 0);
    assert!(config.reporting.surface_compile_errors);
    assert!(config.policy.root_prefixes.iter().any(|p| p == "/secure"));
    assert_eq!(config.session.void_path, "/room/void");
}

#[test]
fn test_invalid_file_is_rejected() {
    let mut temp_file = Builder::new().suffix(".toml").tempfile().unwrap();
    writeln!(
        temp_file,
        r#"
[policy]
root_uid = "Same"
backbone_uid = "Same"
"#
    )
    .unwrap();

    assert!(WardenConfig::from_file(temp_file.path()).is_err());
}

#[test]
fn test_config_round_trips_through_toml() {
    let config = WardenConfig::default();
    let text = toml::to_string(&config).unwrap();
    let parsed: WardenConfig = toml::from_str(&text).unwrap();
    assert_eq!(parsed, config);
}
