//! Schema migration for persisted progress documents.
//!
//! Every [`ProgressRecord`] carries a `schema_version`. Documents written by
//! older builds are upgraded step by step when they are read back; documents
//! from a newer build are refused instead of being silently truncated.
//!
//! # Adding New Migrations
//!
//! 1. Increment `PROGRESS_SCHEMA_VERSION`
//! 2. Add a `migrate_progress_from_vN_to_vM()` step
//! 3. Call it from `Migratable::migrate`
//! 4. Add a test with a document in the old shape

use log::info;
use serde::de::DeserializeOwned;

use crate::logutil::escape_log;
use crate::progress::errors::ProgressError;
use crate::progress::types::{ProgressRecord, MAX_HEARTS, PROGRESS_SCHEMA_VERSION};

/// Types that support schema migration.
pub trait Migratable: Sized {
    /// Entity name used in errors and logs.
    const ENTITY: &'static str;

    fn current_schema_version() -> u8;

    fn schema_version(&self) -> u8;

    /// Upgrade this instance to the current schema version.
    fn migrate(self) -> Result<Self, ProgressError>;

    fn needs_migration(&self) -> bool {
        self.schema_version() < Self::current_schema_version()
    }

    fn is_from_future(&self) -> bool {
        self.schema_version() > Self::current_schema_version()
    }
}

impl Migratable for ProgressRecord {
    const ENTITY: &'static str = "progress";

    fn current_schema_version() -> u8 {
        PROGRESS_SCHEMA_VERSION
    }

    fn schema_version(&self) -> u8 {
        self.schema_version
    }

    fn migrate(mut self) -> Result<Self, ProgressError> {
        if self.is_from_future() {
            return Err(ProgressError::SchemaMismatch {
                entity: Self::ENTITY,
                expected: Self::current_schema_version(),
                found: self.schema_version,
            });
        }
        if !self.needs_migration() {
            return Ok(self);
        }

        let original_version = self.schema_version;
        if self.schema_version < 2 {
            self = migrate_progress_from_v1_to_v2(self);
        }

        info!(
            "Migrated progress for '{}' from schema v{} to v{}",
            escape_log(&self.student_id),
            original_version,
            self.schema_version
        );
        Ok(self)
    }
}

/// v1 documents came from the five-heart prototype and could also carry
/// blank ids left behind by the old comma-separated unlock lists.
fn migrate_progress_from_v1_to_v2(mut record: ProgressRecord) -> ProgressRecord {
    record.hearts = record.hearts.min(MAX_HEARTS);
    for set in [
        &mut record.unlocked_chapters,
        &mut record.unlocked_stories,
        &mut record.unlocked_civilizations,
        &mut record.unlocked_achievements,
        &mut record.unlocked_artifacts,
    ] {
        set.retain(|id| !id.trim().is_empty());
    }
    record.schema_version = 2;
    record
}

/// Parse a JSON document and bring it to the current schema.
/// Returns the record and whether a migration was applied.
pub fn load_and_migrate<T>(json: &str) -> Result<(T, bool), ProgressError>
where
    T: Migratable + DeserializeOwned,
{
    let record: T = serde_json::from_str(json)?;
    let migrated = record.needs_migration();
    Ok((record.migrate()?, migrated))
}
