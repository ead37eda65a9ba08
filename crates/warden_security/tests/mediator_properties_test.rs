//! End-to-end properties of the mediator as a host runtime sees it.

use warden_core::{Decision, Facet, FileAccess, Identity, PrivilegedOp, WardenConfig};
use warden_security::testing::RecordingHost;
use warden_security::{AbortReason, ErrorSite, LogChannel, Mediator, PrivilegeArg, Readiness};

fn mediator() -> Mediator {
    let mut config = WardenConfig::default();
    config.policy.admins.insert(Identity::new("ada"));
    config.policy.wizards.insert(Identity::new("bob"));
    Mediator::new(config).expect("default policy is valid")
}

#[test]
fn test_bob_saves_into_his_home() {
    let mut m = mediator();
    let bob = m.load("players/bob/workroom.c", None, []).unwrap();
    let euid = m.euid_of(bob).cloned();
    assert_eq!(
        m.validate_write("bob.o", euid.as_ref(), "save_object", Some(bob)),
        FileAccess::Canonical("/players/bob/bob.o".to_string())
    );
}

#[test]
fn test_guest_is_denied_the_master_source() {
    let mut m = mediator();
    let guest = m.load("players/guest/shell.c", None, []).unwrap();
    assert_eq!(
        m.validate_read_for(guest, "/secure/master.c", "read_file"),
        FileAccess::Deny
    );
}

#[test]
fn test_no_non_root_identity_writes_root_owned_paths() {
    let m = mediator();
    let paths = ["/secure/master.c", "/etc/passwd", "/log/crashes", "/", "/secure"];
    let identities = ["bob", "ada", "guest", "Backbone"];
    for path in paths {
        for name in identities {
            let euid = Identity::new(name);
            for op in ["write_file", "write_bytes", "save_object", "remove_file", "mkdir", "rmdir"] {
                assert_eq!(
                    m.validate_write(path, Some(&euid), op, None),
                    FileAccess::Deny,
                    "{name} {op} {path}"
                );
            }
        }
    }
}

#[test]
fn test_read_and_write_are_validated_independently() {
    let m = mediator();
    let bob = Identity::new("bob");
    assert!(m.validate_read("/doc/intro", Some(&bob), "read_file", None).is_allowed());
    assert_eq!(
        m.validate_write("/doc/intro", Some(&bob), "write_file", None),
        FileAccess::Deny
    );
}

#[test]
fn test_refused_owner_never_goes_live() {
    let mut m = mediator();
    let before: Vec<_> = m.units().map(|u| *u.id()).collect();
    assert!(m.clone_unit("nowhere/thing.c", None, []).is_err());
    let after: Vec<_> = m.units().map(|u| *u.id()).collect();
    assert_eq!(before.len(), after.len());
}

#[test]
fn test_backbone_unit_is_attributed_to_its_instantiator() {
    let mut m = mediator();
    let room = m.load("domains/castle/hall.c", None, [Facet::Container]).unwrap();
    let torch = m.clone_unit("std/torch.c", Some(room), []).unwrap();
    assert_eq!(m.unit(torch).unwrap().creator().as_str(), "castle");
    assert_eq!(m.euid_of(torch).unwrap().as_str(), "castle");
}

#[test]
fn test_reloaded_path_is_a_different_unit() {
    let mut m = mediator();
    let mut host = RecordingHost::default();
    let first = m.load("players/bob/toy.c", None, []).unwrap();
    m.destruct(&mut host, first).unwrap();
    let second = m.load("players/bob/toy.c", None, []).unwrap();
    assert_ne!(first, second);
    assert!(!m.is_live(first));
}

#[test]
fn test_euid_change_governs_later_decisions() {
    let mut m = mediator();
    let ada = m.load("players/ada/tool.c", None, []).unwrap();
    let none = PrivilegeArg::None;
    assert_eq!(m.decide(PrivilegedOp::CallOutInfo, ada, &none, &none), Decision::Allow);

    assert!(m.validate_seteuid(ada, Some(&Identity::new("bob"))));
    assert!(m.seteuid(ada, Some(Identity::new("bob"))));
    assert_eq!(
        m.decide(PrivilegedOp::CallOutInfo, ada, &none, &none),
        Decision::SilentlyCorrect
    );
    assert_eq!(
        m.validate_read_for(ada, "/secure/master.c", "read_file"),
        FileAccess::Deny
    );
}

#[test]
fn test_destroyed_unit_never_acts() {
    let mut m = mediator();
    let mut host = RecordingHost::default();
    let ada = m.load("players/ada/tool.c", None, []).unwrap();
    m.destruct(&mut host, ada).unwrap();
    let none = PrivilegeArg::None;
    assert_eq!(m.decide(PrivilegedOp::WizlistInfo, ada, &none, &none), Decision::SilentlyCorrect);
    assert!(!m.seteuid(ada, None));
    assert_eq!(
        m.validate_read("/players/ada/x", Some(&Identity::new("ada")), "read_file", Some(ada)),
        FileAccess::Deny
    );
}

#[test]
fn test_two_logins_are_isolated() {
    let mut m = mediator();
    let mut host = RecordingHost::default();
    let (first, first_login) = m.connect().unwrap();
    let (second, second_login) = m.connect().unwrap();
    assert_ne!(first_login, second_login);

    m.logon(first).unwrap();
    m.logon(second).unwrap();
    let alice = m.promote(&mut host, first, "alice").unwrap();
    assert!(m.is_live(second_login));
    assert_eq!(m.euid_of(second_login).unwrap().as_str(), "Root");
    assert_eq!(*m.session(second).unwrap().unit(), Some(second_login));
    assert_eq!(m.session_of(alice), Some(first));
}

#[test]
fn test_abort_leaves_unit_live() {
    let mut m = mediator();
    let mut host = RecordingHost::default();
    let master = m.master();
    assert_eq!(
        m.prepare_destruct(&mut host, master),
        Readiness::Abort(AbortReason::Master)
    );
    assert!(m.is_live(master));
    assert!(m.unit(master).is_some());
}

#[test]
fn test_reentrant_destruction_is_refused() {
    let mut m = mediator();
    let mut host = RecordingHost {
        reenter_destruct: true,
        ..Default::default()
    };
    let room = m.load("players/bob/room.c", None, [Facet::Container]).unwrap();
    let bag = m.load("players/bob/bag.c", None, [Facet::Container]).unwrap();
    let coin = m.clone_unit("players/bob/coin.c", None, []).unwrap();
    assert!(m.move_into(bag, room));
    assert!(m.move_into(coin, bag));

    assert!(m.destruct(&mut host, bag).is_ok());
    assert_eq!(host.reentry_results, vec![false]);
    assert!(!m.is_live(bag));
    assert!(m.is_live(coin));
}

#[test]
fn test_reentrant_shadow_query_terminates() {
    let mut m = mediator();
    let mut host = RecordingHost {
        reenter_shadow: true,
        ..Default::default()
    };
    let victim = m.load("players/bob/pet.c", None, []).unwrap();
    let shadow = m.load("players/carol/mask.c", None, [Facet::Shadow]).unwrap();
    assert!(m.valid_shadow(&mut host, shadow, victim));
    assert_eq!(host.reentry_results, vec![false]);
}

#[test]
fn test_remove_player_tolerates_everything() {
    let mut m = mediator();
    let mut host = RecordingHost::default();
    let (id, _) = m.connect().unwrap();
    m.logon(id).unwrap();
    let player = m.promote(&mut host, id, "dora").unwrap();
    assert!(m.remove_player(&mut host, player));
    assert!(m.remove_player(&mut host, player));
    assert_eq!(host.tells_to(player).len(), 1);
}

#[test]
fn test_heartbeat_reports_decide_restart() {
    let mut m = mediator();
    let mut host = RecordingHost::default();
    let clock = m.load("players/bob/clock.c", None, [Facet::Heartbeat]).unwrap();
    let site = ErrorSite::builder()
        .program("players/bob/clock.c")
        .offending(clock)
        .line(42u32)
        .build()
        .unwrap();
    let limit = m.config().reporting.heartbeat_restart_limit;
    for _ in 0..limit {
        assert!(m.report_heartbeat_error(&mut host, clock, "div by zero", &site));
        assert!(m.heartbeat_enabled(clock));
    }
    assert!(!m.report_heartbeat_error(&mut host, clock, "div by zero", &site));
    assert!(!m.heartbeat_enabled(clock));
    assert_eq!(host.entries(LogChannel::Heartbeat).len() as u32, limit + 1);
}
