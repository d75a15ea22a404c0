//! Identity-namespaced view over the flat key-value store.
//!
//! Every operation resolves the current identity *at call time* and rewrites
//! the logical key through [`scoped_key`]. Two consecutive calls may therefore
//! address different namespaces if a login or logout happened in between.
//! Keys of a previous identity are orphaned, never deleted.

use std::sync::Arc;

use crate::progress::errors::ProgressError;
use crate::progress::identity::IdentityResolver;
use crate::progress::kv::KeyValueStore;
use crate::progress::types::Identity;

/// `"{identity_id}_{logical_key}"`. This is the only place the format is built.
pub fn scoped_key(identity_id: &str, logical_key: &str) -> String {
    format!("{}_{}", identity_id, logical_key)
}

#[derive(Clone)]
pub struct ScopedStore {
    store: Arc<dyn KeyValueStore>,
    resolver: IdentityResolver,
}

impl ScopedStore {
    pub fn new(store: Arc<dyn KeyValueStore>, resolver: IdentityResolver) -> Self {
        Self { store, resolver }
    }

    pub fn identity(&self) -> Identity {
        self.resolver.current_identity()
    }

    /// Logical keys of the current scope that start with `logical_prefix`,
    /// with the identity prefix stripped.
    pub fn logical_keys_with_prefix(&self, logical_prefix: &str) -> Result<Vec<String>, ProgressError> {
        let scope = scoped_key(&self.identity().id, "");
        let keys = self
            .store
            .keys_with_prefix(&format!("{}{}", scope, logical_prefix))?;
        Ok(keys
            .into_iter()
            .filter_map(|key| key.strip_prefix(scope.as_str()).map(str::to_string))
            .collect())
    }

    /// The physical key `logical_key` maps to right now.
    pub fn key_for(&self, logical_key: &str) -> String {
        scoped_key(&self.identity().id, logical_key)
    }

    pub fn get_string(&self, logical_key: &str, default: &str) -> Result<String, ProgressError> {
        self.store.get_string(&self.key_for(logical_key), default)
    }

    pub fn get_int(&self, logical_key: &str, default: i64) -> Result<i64, ProgressError> {
        self.store.get_int(&self.key_for(logical_key), default)
    }

    pub fn get_float(&self, logical_key: &str, default: f64) -> Result<f64, ProgressError> {
        self.store.get_float(&self.key_for(logical_key), default)
    }

    pub fn set_string(&self, logical_key: &str, value: &str) -> Result<(), ProgressError> {
        self.store.set_string(&self.key_for(logical_key), value)
    }

    pub fn set_int(&self, logical_key: &str, value: i64) -> Result<(), ProgressError> {
        self.store.set_int(&self.key_for(logical_key), value)
    }

    pub fn set_float(&self, logical_key: &str, value: f64) -> Result<(), ProgressError> {
        self.store.set_float(&self.key_for(logical_key), value)
    }

    pub fn has_key(&self, logical_key: &str) -> Result<bool, ProgressError> {
        self.store.has_key(&self.key_for(logical_key))
    }

    pub fn delete_key(&self, logical_key: &str) -> Result<(), ProgressError> {
        self.store.delete_key(&self.key_for(logical_key))
    }

    pub fn save(&self) -> Result<(), ProgressError> {
        self.store.save()
    }
}
