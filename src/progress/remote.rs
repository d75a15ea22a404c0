//! Remote profile store boundary.
//!
//! The core always exchanges whole [`ProgressRecord`] documents keyed by
//! identity id; no partial-field updates. The file-backed implementation
//! keeps one JSON document per identity and is what the CLI uses; a real
//! deployment plugs its own backend in behind [`RemoteProfileStore`].

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use fs2::FileExt;
use log::debug;

use crate::progress::errors::ProgressError;
use crate::progress::migration::load_and_migrate;
use crate::progress::types::ProgressRecord;
use crate::validation::{bounded_document, safe_filename};

/// Default ceiling for a single profile document.
pub const DEFAULT_MAX_PROFILE_BYTES: usize = 256 * 1024;

#[async_trait]
pub trait RemoteProfileStore: Send + Sync {
    /// Fetch the record for `identity_id`; a fresh default when none exists.
    async fn fetch(&self, identity_id: &str) -> Result<ProgressRecord, ProgressError>;

    /// Replace the stored record for `record.student_id`.
    async fn store(&self, record: &ProgressRecord) -> Result<(), ProgressError>;
}

/// Store used when remote sync is disabled: every call fails, and callers
/// keep working from the local cache.
pub struct OfflineProfileStore;

#[async_trait]
impl RemoteProfileStore for OfflineProfileStore {
    async fn fetch(&self, _identity_id: &str) -> Result<ProgressRecord, ProgressError> {
        Err(ProgressError::Remote("remote profile store is offline".to_string()))
    }

    async fn store(&self, _record: &ProgressRecord) -> Result<(), ProgressError> {
        Err(ProgressError::Remote("remote profile store is offline".to_string()))
    }
}

/// One `<safe id>.json` per identity under a directory.
pub struct FileProfileStore {
    dir: PathBuf,
    max_bytes: usize,
}

impl FileProfileStore {
    pub fn new<P: AsRef<Path>>(dir: P) -> Result<Self, ProgressError> {
        Self::with_limit(dir, DEFAULT_MAX_PROFILE_BYTES)
    }

    pub fn with_limit<P: AsRef<Path>>(dir: P, max_bytes: usize) -> Result<Self, ProgressError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir, max_bytes })
    }

    pub fn profile_path(&self, identity_id: &str) -> PathBuf {
        self.dir.join(format!("{}.json", safe_filename(identity_id)))
    }

    fn read_profile(path: &Path, identity_id: &str, max_bytes: usize) -> Result<ProgressRecord, ProgressError> {
        if !path.exists() {
            debug!("no stored profile at {}", path.display());
            return Ok(ProgressRecord::new(identity_id));
        }
        let metadata = fs::metadata(path)?;
        if metadata.len() as usize > max_bytes {
            return Err(ProgressError::Remote(format!(
                "profile {} exceeds {} bytes",
                path.display(),
                max_bytes
            )));
        }
        let content = fs::read_to_string(path)?;
        let (mut record, migrated): (ProgressRecord, bool) =
            load_and_migrate(bounded_document(&content, max_bytes)?)?;
        if migrated {
            debug!("profile {} upgraded on read", path.display());
        }
        record.student_id = identity_id.to_string();
        Ok(record)
    }

    /// Lock, write to a temp file in the same directory, then rename over the target.
    fn write_profile(path: &Path, content: &str) -> Result<(), ProgressError> {
        let lock_path = path.with_extension("lock");
        let lock_file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&lock_path)?;
        lock_file.lock_exclusive()?;

        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        let base = path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("profile.json");
        let mut counter = 0u32;
        let tmp_path = loop {
            let candidate = dir.join(format!(".{}.tmp-{}-{}", base, std::process::id(), counter));
            match OpenOptions::new().write(true).create_new(true).open(&candidate) {
                Ok(mut tmp) => {
                    tmp.write_all(content.as_bytes())?;
                    tmp.flush()?;
                    let _ = tmp.sync_all();
                    break candidate;
                }
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                    counter = counter.saturating_add(1);
                    continue;
                }
                Err(e) => return Err(ProgressError::Io(e)),
            }
        };
        fs::rename(&tmp_path, path)?;
        if let Ok(dir_file) = File::open(dir) {
            let _ = dir_file.sync_all();
        }
        let _ = lock_file.unlock();
        Ok(())
    }
}

#[async_trait]
impl RemoteProfileStore for FileProfileStore {
    async fn fetch(&self, identity_id: &str) -> Result<ProgressRecord, ProgressError> {
        let path = self.profile_path(identity_id);
        let id = identity_id.to_string();
        let max_bytes = self.max_bytes;
        tokio::task::spawn_blocking(move || Self::read_profile(&path, &id, max_bytes))
            .await
            .map_err(|e| ProgressError::Internal(format!("profile read task failed: {}", e)))?
    }

    async fn store(&self, record: &ProgressRecord) -> Result<(), ProgressError> {
        let content = serde_json::to_string_pretty(record)?;
        if content.len() > self.max_bytes {
            return Err(ProgressError::Remote(format!(
                "profile for {} exceeds {} bytes",
                record.student_id, self.max_bytes
            )));
        }
        let path = self.profile_path(&record.student_id);
        tokio::task::spawn_blocking(move || Self::write_profile(&path, &content))
            .await
            .map_err(|e| ProgressError::Internal(format!("profile write task failed: {}", e)))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::types::UnlockTrack;
    use tempfile::TempDir;

    #[tokio::test]
    async fn missing_profile_is_default() {
        let dir = TempDir::new().unwrap();
        let store = FileProfileStore::new(dir.path()).unwrap();
        let record = store.fetch("enki").await.unwrap();
        assert_eq!(record, ProgressRecord::new("enki"));
    }

    #[tokio::test]
    async fn stored_profile_is_fetched_back() {
        let dir = TempDir::new().unwrap();
        let store = FileProfileStore::new(dir.path()).unwrap();
        let mut record = ProgressRecord::new("enki");
        record.insert(UnlockTrack::Artifact, "AR001");
        record.set_score(30);
        store.store(&record).await.unwrap();

        let fetched = store.fetch("enki").await.unwrap();
        assert_eq!(fetched, record);
        assert!(store.profile_path("enki").exists());
    }

    #[tokio::test]
    async fn oversized_profile_is_refused() {
        let dir = TempDir::new().unwrap();
        let store = FileProfileStore::with_limit(dir.path(), 64).unwrap();
        let mut record = ProgressRecord::new("enki");
        for i in 0..20 {
            record.insert(UnlockTrack::Chapter, &format!("chapter-{}", i));
        }
        assert!(matches!(store.store(&record).await, Err(ProgressError::Remote(_))));
    }

    #[tokio::test]
    async fn offline_store_always_fails() {
        assert!(OfflineProfileStore.fetch("enki").await.is_err());
        assert!(OfflineProfileStore
            .store(&ProgressRecord::new("enki"))
            .await
            .is_err());
    }
}
