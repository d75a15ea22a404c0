//! Civilization-level content gate.
//!
//! Separate from the achievement system. Flags live in the *unscoped* store
//! under `"{name}_unlocked"` and are therefore shared by every identity on
//! the device. The first civilization of the whitelist is open for everyone
//! even without a stored flag.

use std::sync::Arc;

use log::{info, warn};

use crate::logutil::escape_log;
use crate::progress::kv::KeyValueStore;
use crate::progress::session::ProgressSession;
use crate::progress::types::UnlockTrack;
use crate::progress::unlock::{LOCKED, UNLOCKED};

pub const DEFAULT_CIVILIZATIONS: [&str; 4] = ["Sumerian", "Akkadian", "Babylonian", "Assyrian"];

pub struct CivilizationGate {
    store: Arc<dyn KeyValueStore>,
    names: Vec<String>,
    session: Option<Arc<ProgressSession>>,
}

impl CivilizationGate {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self::with_names(store, DEFAULT_CIVILIZATIONS.iter().map(|s| s.to_string()).collect())
    }

    /// `names` is the whitelist in narrative order; the first entry is open by default.
    pub fn with_names(store: Arc<dyn KeyValueStore>, names: Vec<String>) -> Self {
        Self {
            store,
            names,
            session: None,
        }
    }

    /// Also note unlocks in the loaded record so they reach the remote profile.
    pub fn with_session(mut self, session: Arc<ProgressSession>) -> Self {
        self.session = Some(session);
        self
    }

    pub fn is_known(&self, name: &str) -> bool {
        self.names.iter().any(|known| known == name)
    }

    fn is_default_open(&self, name: &str) -> bool {
        self.names.first().map(|first| first == name).unwrap_or(false)
    }

    pub fn is_civilization_unlocked(&self, name: &str) -> bool {
        if !self.is_known(name) {
            warn!("Unknown civilization '{}'", escape_log(name));
            return false;
        }
        if self.is_default_open(name) {
            return true;
        }
        match self.store.get_int(&UnlockTrack::Civilization.unlock_key(name), LOCKED) {
            Ok(value) => value == UNLOCKED,
            Err(e) => {
                warn!("Civilization flag for {} unreadable: {}", name, e);
                false
            }
        }
    }

    /// Returns false for names outside the whitelist or when the flag could not be stored.
    pub fn unlock_civilization(&self, name: &str) -> bool {
        if !self.is_known(name) {
            warn!("Cannot unlock unknown civilization '{}'", escape_log(name));
            return false;
        }
        let key = UnlockTrack::Civilization.unlock_key(name);
        if let Err(e) = self.store.set_int(&key, UNLOCKED).and_then(|_| self.store.save()) {
            warn!("Civilization flag for {} could not be written: {}", name, e);
            return false;
        }
        if let Some(session) = &self.session {
            session.update(|record| record.insert(UnlockTrack::Civilization, name));
        }
        info!("Civilization {} unlocked", name);
        true
    }

    /// Unlocked civilizations in whitelist order.
    pub fn available_civilizations(&self) -> Vec<&str> {
        self.names
            .iter()
            .map(String::as_str)
            .filter(|name| self.is_civilization_unlocked(name))
            .collect()
    }
}
