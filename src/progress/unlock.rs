//! Read/write API for achievement, artifact, chapter and story unlocks.
//!
//! Two copies of every unlock exist: membership in the loaded
//! [`ProgressRecord`](crate::progress::types::ProgressRecord) (authoritative)
//! and a scoped `"{PREFIX}{id}_unlocked"` flag in the local cache, where `1`
//! means unlocked and `0`/absent means locked. Writes go to both. Reads prefer
//! the record and repair the flag when it lags behind. Without a record the
//! flag is all there is (degraded mode), so unlocks made before login are not
//! lost: a flag set to `1` for an id the record lacks is treated as a pending
//! unlock until [`UnlockCoordinator::absorb_scoped_unlocks`] folds it in.
//!
//! Nothing here returns an error. Store failures are logged and the call
//! falls back to "locked" / "not applied".

use std::sync::Arc;

use log::{debug, info, warn};

use crate::logutil::escape_log;
use crate::progress::kv::KeyValueStore;
use crate::progress::registry::Registry;
use crate::progress::scoped::ScopedStore;
use crate::progress::session::ProgressSession;
use crate::progress::types::{AchievementDefinition, UnlockTrack};

/// Value stored in a scoped flag for an unlocked entry.
pub const UNLOCKED: i64 = 1;
/// Value stored in a scoped flag for a locked entry.
pub const LOCKED: i64 = 0;

/// Steps run by [`UnlockCoordinator::on_session_ready`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnlockOptions {
    pub migrate_legacy_on_ready: bool,
    pub sync_after_load: bool,
}

impl Default for UnlockOptions {
    fn default() -> Self {
        Self {
            migrate_legacy_on_ready: true,
            sync_after_load: true,
        }
    }
}

pub struct UnlockCoordinator {
    registry: Arc<Registry>,
    session: Arc<ProgressSession>,
    scoped: ScopedStore,
    legacy: Arc<dyn KeyValueStore>,
    options: UnlockOptions,
}

impl UnlockCoordinator {
    /// `scoped` should resolve identities through `session` first; `legacy` is
    /// the unscoped store that pre-namespacing builds wrote flags into.
    pub fn new(
        registry: Arc<Registry>,
        session: Arc<ProgressSession>,
        scoped: ScopedStore,
        legacy: Arc<dyn KeyValueStore>,
    ) -> Self {
        Self {
            registry,
            session,
            scoped,
            legacy,
            options: UnlockOptions::default(),
        }
    }

    pub fn with_options(mut self, options: UnlockOptions) -> Self {
        self.options = options;
        self
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn session(&self) -> &Arc<ProgressSession> {
        &self.session
    }

    pub fn scoped(&self) -> &ScopedStore {
        &self.scoped
    }

    // ------------------------------------------------------------------
    // Achievements and artifacts
    // ------------------------------------------------------------------

    /// Unlock a catalog entry by id or display name. Returns false for names
    /// the catalog does not know (nothing is written in that case).
    pub fn unlock(&self, id_or_name: &str) -> bool {
        let Some(definition) = self.registry.resolve(id_or_name) else {
            warn!("Unlock ignored: unknown achievement or artifact '{}'", escape_log(id_or_name));
            return false;
        };
        self.apply_unlock(definition.kind.track(), &definition.id);
        true
    }

    pub fn is_unlocked(&self, id_or_name: &str) -> bool {
        let Some(definition) = self.registry.resolve(id_or_name) else {
            debug!("Unlock query for unknown entry '{}'", escape_log(id_or_name));
            return false;
        };
        self.check(definition.kind.track(), &definition.id)
    }

    /// Catalog entries currently unlocked, in catalog order.
    pub fn unlocked_definitions(&self) -> Vec<&AchievementDefinition> {
        self.registry
            .iter()
            .filter(|definition| self.check(definition.kind.track(), &definition.id))
            .collect()
    }

    // ------------------------------------------------------------------
    // Chapters and stories
    // ------------------------------------------------------------------

    pub fn unlock_chapter(&self, chapter_id: &str) {
        self.apply_unlock(UnlockTrack::Chapter, chapter_id);
    }

    pub fn is_chapter_unlocked(&self, chapter_id: &str) -> bool {
        self.check(UnlockTrack::Chapter, chapter_id)
    }

    pub fn unlock_story(&self, story_id: &str) {
        self.apply_unlock(UnlockTrack::Story, story_id);
    }

    pub fn is_story_unlocked(&self, story_id: &str) -> bool {
        self.check(UnlockTrack::Story, story_id)
    }

    // ------------------------------------------------------------------
    // Hearts and score
    // ------------------------------------------------------------------

    pub fn set_hearts(&self, hearts: i64) -> bool {
        let applied = self.session.set_hearts(hearts);
        if !applied {
            warn!("Hearts update ignored: no progress loaded");
        }
        applied
    }

    pub fn set_score(&self, score: i64) -> bool {
        let applied = self.session.set_score(score);
        if !applied {
            warn!("Score update ignored: no progress loaded");
        }
        applied
    }

    pub fn hearts(&self) -> Option<u8> {
        self.session.hearts()
    }

    pub fn score(&self) -> Option<u64> {
        self.session.score()
    }

    // ------------------------------------------------------------------
    // Synchronisation and migration
    // ------------------------------------------------------------------

    /// Move flags written by pre-namespacing builds into the current scope.
    ///
    /// For every catalog entry whose unscoped flag is `1`: write the scoped
    /// flag, apply the unlock to the loaded record, then delete the unscoped
    /// flag. Running it again finds nothing to do. Returns the migrated ids.
    pub fn migrate_legacy(&self) -> Vec<String> {
        let scope = self.scoped.identity();
        if scope.is_sentinel() {
            warn!("Legacy migration skipped: no identity to migrate into (flags left in place)");
            return Vec::new();
        }
        let mut migrated = Vec::new();
        for definition in self.registry.iter() {
            let key = definition.unlock_key();
            let legacy_value = match self.legacy.get_int(&key, LOCKED) {
                Ok(value) => value,
                Err(e) => {
                    warn!("Legacy flag {} unreadable: {}", key, e);
                    continue;
                }
            };
            if legacy_value != UNLOCKED {
                continue;
            }
            self.apply_unlock(definition.kind.track(), &definition.id);
            if let Err(e) = self.legacy.delete_key(&key) {
                warn!("Legacy flag {} could not be removed: {}", key, e);
                continue;
            }
            migrated.push(definition.id.clone());
        }

        if !migrated.is_empty() {
            info!(
                "Migrated {} legacy unlock flag(s) into scope '{}'",
                migrated.len(),
                escape_log(&self.scoped.identity().id)
            );
            self.save();
            if let Err(e) = self.legacy.save() {
                warn!("Legacy store flush failed: {}", e);
            }
        }
        migrated
    }

    /// Push every unlock held by the record into the scoped flags. Returns the
    /// number of flags that had to be rewritten; 0 when no record is loaded.
    pub fn sync_to_scoped_store(&self) -> usize {
        let Some(record) = self.session.current() else {
            debug!("Scoped sync skipped: no progress loaded");
            return 0;
        };
        let mut repaired = 0;
        for track in [
            UnlockTrack::Achievement,
            UnlockTrack::Artifact,
            UnlockTrack::Chapter,
            UnlockTrack::Story,
        ] {
            for id in record.set(track) {
                if self.write_through(&track.unlock_key(id), true) {
                    repaired += 1;
                }
            }
        }
        if repaired > 0 {
            debug!("Scoped sync rewrote {} flag(s)", repaired);
        }
        self.save();
        repaired
    }

    /// Fold flags set in the current scope (typically by degraded-mode unlocks
    /// before login) into the loaded record: catalog entries plus any chapter
    /// or story flag found in the scope. Returns the absorbed ids.
    pub fn absorb_scoped_unlocks(&self) -> Vec<String> {
        if !self.session.is_loaded() {
            return Vec::new();
        }
        let mut candidates: Vec<(UnlockTrack, String)> = self
            .registry
            .iter()
            .map(|definition| (definition.kind.track(), definition.id.clone()))
            .collect();
        for track in [UnlockTrack::Chapter, UnlockTrack::Story] {
            candidates.extend(self.scoped_ids(track).into_iter().map(|id| (track, id)));
        }

        let mut absorbed = Vec::new();
        for (track, id) in candidates {
            let held = self
                .session
                .with_record(|record| record.contains(track, &id))
                .unwrap_or(false);
            if held || !self.read_flag(&track.unlock_key(&id)) {
                continue;
            }
            self.session.update(|record| record.insert(track, &id));
            absorbed.push(id);
        }
        if !absorbed.is_empty() {
            info!("Absorbed {} pending unlock(s) into progress", absorbed.len());
        }
        absorbed
    }

    /// Post-load hook, run once the session reports Ready: legacy migration,
    /// absorption of pending flags, scoped sync and an integrity audit.
    pub fn on_session_ready(&self) {
        if !self.session.is_loaded() {
            warn!("Session-ready hook called without progress loaded");
            return;
        }
        if self.options.migrate_legacy_on_ready {
            self.migrate_legacy();
        }
        self.absorb_scoped_unlocks();
        if self.options.sync_after_load {
            self.sync_to_scoped_store();
        }
        if let Some(record) = self.session.current() {
            for id in self.registry.unknown_ids(&record) {
                warn!(
                    "Progress for '{}' references unknown catalog id '{}'",
                    escape_log(&record.student_id),
                    escape_log(&id)
                );
            }
        }
        self.save();
    }

    /// Start over: fresh record and every flag of the current scope cleared,
    /// so stale flags cannot come back as pending unlocks.
    pub fn reset_progress(&self) -> bool {
        let Some(previous) = self.session.current() else {
            warn!("Reset ignored: no progress loaded");
            return false;
        };
        self.session.reset();
        for definition in self.registry.iter() {
            self.write_through(&definition.unlock_key(), false);
        }
        for track in [UnlockTrack::Chapter, UnlockTrack::Story] {
            let mut ids = previous.set(track).clone();
            ids.extend(self.scoped_ids(track));
            for id in ids {
                self.write_through(&track.unlock_key(&id), false);
            }
        }
        self.save();
        info!("Progress reset for '{}'", escape_log(&previous.student_id));
        true
    }

    pub fn save(&self) {
        if let Err(e) = self.scoped.save() {
            warn!("Scoped store flush failed: {}", e);
        }
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn apply_unlock(&self, track: UnlockTrack, id: &str) {
        let in_record = self.session.update(|record| record.insert(track, id));
        if in_record.is_none() {
            debug!(
                "No progress loaded; recording {} '{}' in the local cache only",
                track.label(),
                escape_log(id)
            );
        }
        self.write_through(&track.unlock_key(id), true);
    }

    fn check(&self, track: UnlockTrack, id: &str) -> bool {
        let key = track.unlock_key(id);
        match self.session.with_record(|record| record.contains(track, id)) {
            Some(true) => {
                self.write_through(&key, true);
                true
            }
            Some(false) => {
                let pending = self.read_flag(&key);
                if pending {
                    debug!("{} '{}' unlocked in cache, pending absorption", track.label(), escape_log(id));
                }
                pending
            }
            None => self.read_flag(&key),
        }
    }

    /// Ids of every `track` flag present in the current scope, set or not.
    fn scoped_ids(&self, track: UnlockTrack) -> Vec<String> {
        match self.scoped.logical_keys_with_prefix(track.key_prefix()) {
            Ok(keys) => keys
                .iter()
                .filter_map(|key| track.id_from_key(key))
                .map(str::to_string)
                .collect(),
            Err(e) => {
                warn!("Could not list {} flags: {}", track.label(), e);
                Vec::new()
            }
        }
    }

    fn read_flag(&self, key: &str) -> bool {
        match self.scoped.get_int(key, LOCKED) {
            Ok(value) => value == UNLOCKED,
            Err(e) => {
                warn!("Scoped flag {} unreadable: {}", key, e);
                false
            }
        }
    }

    /// The single write-through path shared by reads and writes: make the
    /// scoped flag for `key` say `unlocked`. Returns true when a write happened.
    fn write_through(&self, key: &str, unlocked: bool) -> bool {
        let wanted = if unlocked { UNLOCKED } else { LOCKED };
        match self.scoped.get_int(key, LOCKED) {
            Ok(current) if current == wanted => return false,
            Ok(_) => {}
            Err(e) => debug!("Scoped flag {} unreadable before write: {}", key, e),
        }
        match self.scoped.set_int(key, wanted) {
            Ok(()) => true,
            Err(e) => {
                warn!("Scoped flag {} could not be written: {}", key, e);
                false
            }
        }
    }
}
