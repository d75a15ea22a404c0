//! Unlocks made before any progress record is loaded.
mod common;

use civprogress::progress::{Identity, KeyValueStore, UnlockTrack};

#[tokio::test]
async fn pending_unlock_survives_login_until_absorbed() {
    let h = common::offline();
    h.auth.record_login(&Identity::student("enki")).unwrap();

    // No record yet: only the cache flag is written.
    h.coordinator.unlock("AC007");
    assert_eq!(h.kv.get_int("enki_ACH_AC007_unlocked", 0).unwrap(), 1);

    // Record loads without the post-load hook.
    h.session.login(Identity::student("enki")).await.unwrap();
    assert!(h.coordinator.is_unlocked("AC007"));
    assert!(!h.session.current().unwrap().contains(UnlockTrack::Achievement, "AC007"));
    assert_eq!(h.kv.get_int("enki_ACH_AC007_unlocked", 0).unwrap(), 1);

    assert_eq!(h.coordinator.absorb_scoped_unlocks(), vec!["AC007".to_string()]);
    assert!(h.session.current().unwrap().contains(UnlockTrack::Achievement, "AC007"));
    assert!(h.coordinator.absorb_scoped_unlocks().is_empty());
}

#[tokio::test]
async fn ready_hook_absorbs_pending_unlocks() {
    let h = common::offline();
    h.auth.record_login(&Identity::student("enki")).unwrap();
    h.coordinator.unlock("Cylinder Seal");

    h.session.login(Identity::student("enki")).await.unwrap();
    h.coordinator.on_session_ready();

    let record = h.session.current().unwrap();
    assert!(record.unlocked_artifacts.contains("AR002"));
}

#[tokio::test]
async fn pending_chapter_is_absorbed_and_cleared_by_reset() {
    let h = common::offline();
    h.auth.record_login(&Identity::student("enki")).unwrap();
    h.coordinator.unlock_chapter("ur-2");
    assert_eq!(h.kv.get_int("enki_CHAPTER_ur-2_unlocked", 0).unwrap(), 1);

    h.session.login(Identity::student("enki")).await.unwrap();
    h.coordinator.on_session_ready();
    assert!(h.session.current().unwrap().contains(UnlockTrack::Chapter, "ur-2"));

    assert!(h.coordinator.reset_progress());
    assert!(!h.coordinator.is_chapter_unlocked("ur-2"));
    assert_eq!(h.kv.get_int("enki_CHAPTER_ur-2_unlocked", 1).unwrap(), 0);
    assert!(h.coordinator.absorb_scoped_unlocks().is_empty());
}

#[tokio::test]
async fn reset_clears_pending_chapters_that_were_never_absorbed() {
    let h = common::offline();
    h.auth.record_login(&Identity::student("enki")).unwrap();
    h.coordinator.unlock_chapter("ur-3");

    // Loaded without the ready hook, so the chapter is still only pending.
    h.session.login(Identity::student("enki")).await.unwrap();
    assert!(h.coordinator.is_chapter_unlocked("ur-3"));

    assert!(h.coordinator.reset_progress());
    assert!(!h.coordinator.is_chapter_unlocked("ur-3"));
}

#[test]
fn anonymous_unlocks_land_in_the_sentinel_namespace() {
    let h = common::offline();
    h.coordinator.unlock("Scribe");
    assert_eq!(h.kv.get_int("DefaultStudent_ACH_AC001_unlocked", 0).unwrap(), 1);
    assert!(!h.kv.has_key("ACH_AC001_unlocked").unwrap());
}

#[test]
fn record_operations_are_refused_without_a_record() {
    let h = common::offline();
    assert!(!h.coordinator.set_hearts(2));
    assert!(!h.coordinator.set_score(10));
    assert!(!h.coordinator.reset_progress());
    assert_eq!(h.coordinator.sync_to_scoped_store(), 0);
    assert!(h.coordinator.absorb_scoped_unlocks().is_empty());
}
