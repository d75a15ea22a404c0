//! Shared fixtures: a sled-backed cache in a temp dir wired to a progress
//! session, the way the binary wires them.

use std::sync::Arc;

use civprogress::progress::{
    FileProfileStore, IdentityResolver, KeyValueStore, OfflineProfileStore, ProgressSession,
    Registry, RemoteProfileStore, Role, ScopedStore, SledKvStore, StoredAuthSession,
    UnlockCoordinator, UnlockOptions,
};
use tempfile::TempDir;

pub struct Harness {
    // Held so the directory outlives the stores.
    #[allow(dead_code)]
    pub dir: TempDir,
    pub kv: Arc<dyn KeyValueStore>,
    pub session: Arc<ProgressSession>,
    pub auth: Arc<StoredAuthSession>,
    pub coordinator: UnlockCoordinator,
}

fn build(dir: TempDir, remote: Arc<dyn RemoteProfileStore>, role: Role, options: UnlockOptions) -> Harness {
    let kv: Arc<dyn KeyValueStore> = Arc::new(SledKvStore::open(dir.path().join("kv")).expect("open kv"));
    let session = Arc::new(ProgressSession::new(remote));
    let auth = Arc::new(StoredAuthSession::new(kv.clone()));
    let resolver = IdentityResolver::new(role)
        .with_session(session.clone())
        .with_auth(auth.clone(), kv.clone());
    let coordinator = UnlockCoordinator::new(
        Arc::new(Registry::builtin().expect("builtin catalog")),
        session.clone(),
        ScopedStore::new(kv.clone(), resolver),
        kv.clone(),
    )
    .with_options(options);
    Harness {
        dir,
        kv,
        session,
        auth,
        coordinator,
    }
}

/// Student harness with the remote store offline.
#[allow(dead_code)]
pub fn offline() -> Harness {
    build(
        tempfile::tempdir().expect("tempdir"),
        Arc::new(OfflineProfileStore),
        Role::Student,
        UnlockOptions::default(),
    )
}

#[allow(dead_code)]
pub fn offline_with(role: Role, options: UnlockOptions) -> Harness {
    build(tempfile::tempdir().expect("tempdir"), Arc::new(OfflineProfileStore), role, options)
}

/// Student harness backed by a file profile store under the same temp dir.
#[allow(dead_code)]
pub fn with_profiles() -> (Harness, Arc<FileProfileStore>) {
    let dir = tempfile::tempdir().expect("tempdir");
    let profiles = Arc::new(FileProfileStore::new(dir.path().join("profiles")).expect("profiles"));
    let harness = build(dir, profiles.clone(), Role::Student, UnlockOptions::default());
    (harness, profiles)
}
