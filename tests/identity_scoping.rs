//! Namespacing of cache keys by identity and role.
mod common;

use civprogress::progress::{Identity, KeyValueStore, Role, UnlockOptions};

#[tokio::test]
async fn unlocks_do_not_leak_between_identities() {
    let h = common::offline();
    h.session.login(Identity::student("enki")).await.unwrap();
    h.coordinator.unlock("Scribe");
    h.session.logout();

    h.session.login(Identity::student("ninlil")).await.unwrap();
    assert!(!h.coordinator.is_unlocked("Scribe"));
    assert_eq!(h.kv.get_int("enki_ACH_AC001_unlocked", 0).unwrap(), 1);
    assert!(!h.kv.has_key("ninlil_ACH_AC001_unlocked").unwrap());
}

#[test]
fn identity_change_between_calls_switches_namespace() {
    let h = common::offline();
    h.auth.record_login(&Identity::student("enki")).unwrap();
    h.coordinator.scoped().set_string("LastLesson", "ur").unwrap();

    h.auth.record_login(&Identity::student("ninlil")).unwrap();
    assert_eq!(h.coordinator.scoped().get_string("LastLesson", "none").unwrap(), "none");
    assert_eq!(h.kv.get_string("enki_LastLesson", "").unwrap(), "ur");
}

#[test]
fn teacher_namespace_ignores_student_logins() {
    let h = common::offline_with(Role::Teacher, UnlockOptions::default());
    h.auth.record_login(&Identity::student("enki")).unwrap();
    assert_eq!(h.coordinator.scoped().identity(), Identity::teacher("DefaultTeacher"));

    h.auth.record_login(&Identity::teacher("mrsmith")).unwrap();
    assert_eq!(h.coordinator.scoped().identity(), Identity::teacher("mrsmith"));
    h.coordinator.unlock("Lawgiver");
    assert_eq!(h.kv.get_int("mrsmith_ACH_AC005_unlocked", 0).unwrap(), 1);
}

#[tokio::test]
async fn loaded_session_wins_over_auth_user() {
    let h = common::offline();
    h.auth.record_login(&Identity::student("enki")).unwrap();
    h.session.login(Identity::student("ninlil")).await.unwrap();
    assert_eq!(h.coordinator.scoped().identity(), Identity::student("ninlil"));
}

#[tokio::test]
async fn ids_with_separator_are_refused() {
    let h = common::offline();
    assert!(h.session.login(Identity::student("en_ki")).await.is_err());
    assert!(h.session.current().is_none());
}
