//! Tests for the file-backed host.

use std::fs;
use std::time::Duration;
use warden::{
    ErrorSite, Facet, Host, JournalConfig, JournalHost, LogChannel, Mediator, WardenConfig,
};

#[test]
fn test_channels_append_to_files() {
    let dir = tempfile::tempdir().unwrap();
    let mut host = JournalHost::new(dir.path().join("log"));
    host.log_file(LogChannel::Compile, "obj/bad.c: syntax error\n");
    host.log_file(LogChannel::Compile, "obj/worse.c: syntax error");

    let contents = fs::read_to_string(host.channel_path(LogChannel::Compile)).unwrap();
    let lines: Vec<_> = contents.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].starts_with('['));
    assert!(lines[0].ends_with("obj/bad.c: syntax error"));
    assert!(lines[1].ends_with("obj/worse.c: syntax error"));
    assert!(host.log_dir().join("compile.err").exists());
}

#[test]
fn test_mediator_reports_land_in_journal() {
    let dir = tempfile::tempdir().unwrap();
    let config = JournalConfig {
        log_dir: dir.path().display().to_string(),
    };
    let mut host = JournalHost::from_config(&config);
    let mut mediator = Mediator::new(WardenConfig::default()).unwrap();
    let clock = mediator
        .load("players/bob/clock.c", None, [Facet::Heartbeat])
        .unwrap();
    let site = ErrorSite::builder().offending(clock).line(3u32).build().unwrap();

    assert!(mediator.report_heartbeat_error(&mut host, clock, "div by zero", &site));
    mediator.report_crash(&mut host, "stack overflow");

    let heartbeat = fs::read_to_string(dir.path().join("heart_beat")).unwrap();
    assert!(heartbeat.contains("div by zero"));
    let crashes = fs::read_to_string(dir.path().join("crashes")).unwrap();
    assert!(crashes.contains("CRASHED on: "));
    assert!(crashes.contains("ERROR: stack overflow"));
}

#[test]
fn test_files_are_served_from_mudlib_root() {
    let dir = tempfile::tempdir().unwrap();
    let mut host = JournalHost::new(dir.path().join("log")).with_mudlib_root(dir.path().join("lib"));
    let mut mediator = Mediator::new(WardenConfig::default()).unwrap();
    let bob = mediator.load("players/bob/workroom.c", None, []).unwrap();

    assert!(mediator.save_ed_setup(&mut host, bob, 12));
    assert!(dir.path().join("lib/players/bob/.edrc").exists());
    assert_eq!(mediator.retrieve_ed_setup(&mut host, bob), 12);
}

#[test]
fn test_without_mudlib_root_files_are_unavailable() {
    let dir = tempfile::tempdir().unwrap();
    let mut host = JournalHost::new(dir.path());
    assert!(!host.write_file("/players/bob/x", "data"));
    assert_eq!(host.read_file("/players/bob/x"), None);
}

#[test]
fn test_shutdown_is_recorded() {
    let dir = tempfile::tempdir().unwrap();
    let mut host = JournalHost::new(dir.path());
    let mut mediator = Mediator::new(WardenConfig::default()).unwrap();
    assert!(mediator.slow_shut_down(&mut host, 6));
    assert_eq!(host.pending_shutdown(), Some(Duration::from_secs(360)));
    let quota = fs::read_to_string(host.channel_path(LogChannel::Quota)).unwrap();
    assert!(quota.contains("shutdown in 6 minutes"));
}
