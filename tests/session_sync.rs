//! Record lifecycle against the file-backed profile store.
mod common;

use std::time::Duration;

use civprogress::progress::{Identity, ProgressRecord, RemoteProfileStore, UnlockTrack};

#[tokio::test]
async fn progress_survives_logout_through_the_profile_store() {
    let (h, profiles) = common::with_profiles();
    h.session.login(Identity::student("enki")).await.unwrap();
    h.coordinator.unlock("Tablet");
    h.coordinator.set_hearts(1);
    h.coordinator.set_score(75);
    h.session.flush_remote().await.unwrap();
    h.session.logout();
    assert!(profiles.profile_path("enki").exists());

    h.session.login(Identity::student("enki")).await.unwrap();
    let record = h.session.current().unwrap();
    assert!(record.contains(UnlockTrack::Artifact, "AR001"));
    assert_eq!(record.hearts, 1);
    assert_eq!(record.score, 75);
}

#[tokio::test]
async fn removed_profiles_are_ignored() {
    let (h, profiles) = common::with_profiles();
    let mut stale = ProgressRecord::new("enki");
    stale.insert(UnlockTrack::Achievement, "AC004");
    stale.is_removed = true;
    profiles.store(&stale).await.unwrap();

    h.session.login(Identity::student("enki")).await.unwrap();
    assert!(!h.coordinator.is_unlocked("Merchant"));
}

#[tokio::test]
async fn local_unlocks_made_while_loading_are_kept() {
    let (h, profiles) = common::with_profiles();
    let mut stored = ProgressRecord::new("enki");
    stored.insert(UnlockTrack::Achievement, "AC002");
    stored.set_score(10);
    profiles.store(&stored).await.unwrap();

    h.session.begin_login(Identity::student("enki")).unwrap();
    h.coordinator.unlock("Scribe");
    h.coordinator.set_score(30);
    assert!(h.session.load_remote().await);

    let record = h.session.current().unwrap();
    assert!(record.contains(UnlockTrack::Achievement, "AC001"));
    assert!(record.contains(UnlockTrack::Achievement, "AC002"));
    assert_eq!(record.score, 30);
}

#[tokio::test]
async fn unlocks_while_loading_keep_stored_hearts() {
    let (h, profiles) = common::with_profiles();
    let mut stored = ProgressRecord::new("enki");
    stored.set_hearts(1);
    profiles.store(&stored).await.unwrap();

    h.session.begin_login(Identity::student("enki")).unwrap();
    h.coordinator.unlock("Scribe");
    assert!(h.session.load_remote().await);

    assert_eq!(h.coordinator.hearts(), Some(1));
    assert!(h.coordinator.is_unlocked("AC001"));
}

#[tokio::test]
async fn listener_drives_the_ready_hook() {
    let (h, _profiles) = common::with_profiles();
    let listener = h.session.ready_listener();
    let session = h.session.clone();
    let login = tokio::spawn(async move { session.login(Identity::student("enki")).await });

    let identity = tokio::time::timeout(Duration::from_secs(2), listener.wait())
        .await
        .expect("ready in time");
    assert_eq!(identity, Some(Identity::student("enki")));
    login.await.unwrap().unwrap();

    h.coordinator.on_session_ready();
    h.coordinator.unlock("Historian");
    assert!(h.coordinator.is_unlocked("AC010"));
}

#[tokio::test]
async fn unknown_catalog_ids_are_kept_but_never_reported_unlocked() {
    let (h, profiles) = common::with_profiles();
    let mut stored = ProgressRecord::new("enki");
    stored.insert(UnlockTrack::Achievement, "AC999");
    profiles.store(&stored).await.unwrap();

    h.session.login(Identity::student("enki")).await.unwrap();
    h.coordinator.on_session_ready();

    assert!(h.session.current().unwrap().contains(UnlockTrack::Achievement, "AC999"));
    assert!(!h.coordinator.is_unlocked("AC999"));
    assert!(h.coordinator.unlocked_definitions().is_empty());
}
