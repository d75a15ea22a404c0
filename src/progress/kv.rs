//! Flat, process-wide key-value store that outlives sessions.
//!
//! Values are typed (string, int, float). Reading a key with the wrong type
//! behaves like reading a missing key and yields the caller's default. Writes
//! land in sled's page cache and are only guaranteed durable after
//! [`KeyValueStore::save`].

use std::path::Path;

use serde::{Deserialize, Serialize};
use sled::IVec;

use crate::progress::errors::ProgressError;

const TREE_VALUES: &str = "civprogress_kv";

/// A value as it sits in the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StoredValue {
    Str(String),
    Int(i64),
    Float(f64),
}

/// Persistent key-value collaborator.
///
/// Implementors provide raw value access; the typed getters and setters are
/// derived from it.
pub trait KeyValueStore: Send + Sync {
    fn get_value(&self, key: &str) -> Result<Option<StoredValue>, ProgressError>;
    fn set_value(&self, key: &str, value: StoredValue) -> Result<(), ProgressError>;
    fn has_key(&self, key: &str) -> Result<bool, ProgressError>;
    /// Removing a missing key is not an error.
    fn delete_key(&self, key: &str) -> Result<(), ProgressError>;
    /// Flush batched writes to durable storage.
    fn save(&self) -> Result<(), ProgressError>;
    /// All keys beginning with `prefix`, in byte order.
    fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>, ProgressError>;

    fn get_string(&self, key: &str, default: &str) -> Result<String, ProgressError> {
        Ok(match self.get_value(key)? {
            Some(StoredValue::Str(value)) => value,
            _ => default.to_string(),
        })
    }

    fn get_int(&self, key: &str, default: i64) -> Result<i64, ProgressError> {
        Ok(match self.get_value(key)? {
            Some(StoredValue::Int(value)) => value,
            _ => default,
        })
    }

    fn get_float(&self, key: &str, default: f64) -> Result<f64, ProgressError> {
        Ok(match self.get_value(key)? {
            Some(StoredValue::Float(value)) => value,
            _ => default,
        })
    }

    fn set_string(&self, key: &str, value: &str) -> Result<(), ProgressError> {
        self.set_value(key, StoredValue::Str(value.to_string()))
    }

    fn set_int(&self, key: &str, value: i64) -> Result<(), ProgressError> {
        self.set_value(key, StoredValue::Int(value))
    }

    fn set_float(&self, key: &str, value: f64) -> Result<(), ProgressError> {
        self.set_value(key, StoredValue::Float(value))
    }
}

/// Sled-backed implementation used by the CLI and the tests.
pub struct SledKvStore {
    _db: sled::Db,
    values: sled::Tree,
}

impl SledKvStore {
    /// Open (or create) the store rooted at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, ProgressError> {
        let path_ref = path.as_ref();
        std::fs::create_dir_all(path_ref)?;
        let db = sled::open(path_ref)?;
        let values = db.open_tree(TREE_VALUES)?;
        Ok(Self { _db: db, values })
    }

    /// In-memory store that disappears on drop.
    pub fn temporary() -> Result<Self, ProgressError> {
        let db = sled::Config::new().temporary(true).open()?;
        let values = db.open_tree(TREE_VALUES)?;
        Ok(Self { _db: db, values })
    }

    fn serialize(value: &StoredValue) -> Result<Vec<u8>, ProgressError> {
        Ok(bincode::serialize(value)?)
    }

    fn deserialize(bytes: IVec) -> Result<StoredValue, ProgressError> {
        Ok(bincode::deserialize::<StoredValue>(&bytes)?)
    }
}

impl KeyValueStore for SledKvStore {
    fn get_value(&self, key: &str) -> Result<Option<StoredValue>, ProgressError> {
        match self.values.get(key.as_bytes())? {
            Some(bytes) => Ok(Some(Self::deserialize(bytes)?)),
            None => Ok(None),
        }
    }

    fn set_value(&self, key: &str, value: StoredValue) -> Result<(), ProgressError> {
        let bytes = Self::serialize(&value)?;
        self.values.insert(key.as_bytes(), bytes)?;
        Ok(())
    }

    fn has_key(&self, key: &str) -> Result<bool, ProgressError> {
        Ok(self.values.contains_key(key.as_bytes())?)
    }

    fn delete_key(&self, key: &str) -> Result<(), ProgressError> {
        self.values.remove(key.as_bytes())?;
        Ok(())
    }

    fn save(&self) -> Result<(), ProgressError> {
        self.values.flush()?;
        Ok(())
    }

    fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>, ProgressError> {
        let mut keys = Vec::new();
        for entry in self.values.scan_prefix(prefix.as_bytes()) {
            let (key, _) = entry?;
            keys.push(String::from_utf8_lossy(&key).into_owned());
        }
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn typed_round_trip_and_defaults() {
        let store = SledKvStore::temporary().expect("store");
        store.set_int("ACH_AC001_unlocked", 1).expect("set");
        store.set_string("UserRole", "teacher").expect("set");
        store.set_float("volume", 0.5).expect("set");

        assert_eq!(store.get_int("ACH_AC001_unlocked", 0).unwrap(), 1);
        assert_eq!(store.get_string("UserRole", "").unwrap(), "teacher");
        assert_eq!(store.get_float("volume", 1.0).unwrap(), 0.5);
        assert_eq!(store.get_int("missing", 7).unwrap(), 7);
    }

    #[test]
    fn mismatched_type_reads_as_default() {
        let store = SledKvStore::temporary().expect("store");
        store.set_string("ACH_AC001_unlocked", "yes").expect("set");
        assert_eq!(store.get_int("ACH_AC001_unlocked", 0).unwrap(), 0);
        assert!(store.has_key("ACH_AC001_unlocked").unwrap());
    }

    #[test]
    fn delete_is_idempotent() {
        let store = SledKvStore::temporary().expect("store");
        store.set_int("k", 3).expect("set");
        store.delete_key("k").expect("delete");
        store.delete_key("k").expect("delete again");
        assert!(!store.has_key("k").unwrap());
    }

    #[test]
    fn saved_values_survive_reopen() {
        let dir = TempDir::new().expect("tempdir");
        {
            let store = SledKvStore::open(dir.path()).expect("store");
            store.set_int("s1_ART_AR001_unlocked", 1).expect("set");
            store.save().expect("save");
        }
        let store = SledKvStore::open(dir.path()).expect("reopen");
        assert_eq!(store.get_int("s1_ART_AR001_unlocked", 0).unwrap(), 1);
        assert_eq!(store.keys_with_prefix("s1_").unwrap(), vec!["s1_ART_AR001_unlocked"]);
    }
}
