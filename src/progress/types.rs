use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Upper bound for [`ProgressRecord::hearts`]; fresh records start full.
pub const MAX_HEARTS: u8 = 3;

/// Schema version written into every [`ProgressRecord`] this build produces.
pub const PROGRESS_SCHEMA_VERSION: u8 = 2;

/// Identity used for the student namespace when nobody is logged in.
pub const DEFAULT_STUDENT_ID: &str = "DefaultStudent";
/// Identity used for the teacher namespace when nobody is logged in.
pub const DEFAULT_TEACHER_ID: &str = "DefaultTeacher";

/// Unscoped key holding the role of the last authenticated user.
pub const ROLE_FLAG_KEY: &str = "UserRole";

/// Who a session belongs to. Students and teachers live in separate key namespaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Student,
    Teacher,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Student => "student",
            Role::Teacher => "teacher",
        }
    }

    /// Parse the stored role flag. Anything unrecognised yields `None`.
    pub fn parse(value: &str) -> Option<Role> {
        match value.trim().to_ascii_lowercase().as_str() {
            "student" => Some(Role::Student),
            "teacher" => Some(Role::Teacher),
            _ => None,
        }
    }

    pub fn sentinel_id(self) -> &'static str {
        match self {
            Role::Student => DEFAULT_STUDENT_ID,
            Role::Teacher => DEFAULT_TEACHER_ID,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The active student or teacher whose id namespaces persisted keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identity {
    pub id: String,
    pub role: Role,
}

impl Identity {
    pub fn new(id: &str, role: Role) -> Self {
        Self {
            id: id.to_string(),
            role,
        }
    }

    pub fn student(id: &str) -> Self {
        Self::new(id, Role::Student)
    }

    pub fn teacher(id: &str) -> Self {
        Self::new(id, Role::Teacher)
    }

    /// The fallback identity for `role` ("DefaultStudent" / "DefaultTeacher").
    pub fn sentinel(role: Role) -> Self {
        Self::new(role.sentinel_id(), role)
    }

    pub fn is_sentinel(&self) -> bool {
        self.id == self.role.sentinel_id()
    }
}

/// Catalog entry flavour. Each kind owns the prefix of its unlock key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DefinitionKind {
    Achievement,
    Artifact,
}

impl DefinitionKind {
    /// Logical (unscoped) key recording whether `id` is unlocked.
    pub fn unlock_key(self, id: &str) -> String {
        self.track().unlock_key(id)
    }

    /// Which progress set holds unlocked entries of this kind.
    pub fn track(self) -> UnlockTrack {
        match self {
            DefinitionKind::Achievement => UnlockTrack::Achievement,
            DefinitionKind::Artifact => UnlockTrack::Artifact,
        }
    }
}

/// One of the unlock sets carried by a [`ProgressRecord`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnlockTrack {
    Chapter,
    Story,
    Civilization,
    Achievement,
    Artifact,
}

impl UnlockTrack {
    pub fn key_prefix(self) -> &'static str {
        match self {
            UnlockTrack::Chapter => "CHAPTER_",
            UnlockTrack::Story => "STORY_",
            UnlockTrack::Civilization => "",
            UnlockTrack::Achievement => "ACH_",
            UnlockTrack::Artifact => "ART_",
        }
    }

    /// `"{prefix}{id}_unlocked"`. The format is shared with data persisted by
    /// earlier releases and must not change.
    pub fn unlock_key(self, id: &str) -> String {
        format!("{}{}_unlocked", self.key_prefix(), id)
    }

    /// Inverse of [`unlock_key`](Self::unlock_key).
    pub fn id_from_key(self, key: &str) -> Option<&str> {
        key.strip_prefix(self.key_prefix())?
            .strip_suffix("_unlocked")
            .filter(|id| !id.is_empty())
    }

    pub fn label(self) -> &'static str {
        match self {
            UnlockTrack::Chapter => "chapter",
            UnlockTrack::Story => "story",
            UnlockTrack::Civilization => "civilization",
            UnlockTrack::Achievement => "achievement",
            UnlockTrack::Artifact => "artifact",
        }
    }
}

/// Immutable description of an unlockable achievement or artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AchievementDefinition {
    pub id: String,
    pub name: String,
    pub title: String,
    pub description: String,
    pub kind: DefinitionKind,
}

impl AchievementDefinition {
    pub fn new(
        id: &str,
        name: &str,
        title: &str,
        description: &str,
        kind: DefinitionKind,
    ) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            title: title.to_string(),
            description: description.to_string(),
            kind,
        }
    }

    pub fn achievement(id: &str, name: &str, title: &str, description: &str) -> Self {
        Self::new(id, name, title, description, DefinitionKind::Achievement)
    }

    pub fn artifact(id: &str, name: &str, title: &str, description: &str) -> Self {
        Self::new(id, name, title, description, DefinitionKind::Artifact)
    }

    pub fn unlock_key(&self) -> String {
        self.kind.unlock_key(&self.id)
    }
}

/// Authoritative snapshot of one student's progress.
///
/// Created with defaults at login, merged with the remote profile, then
/// mutated in place. The whole record is what travels to and from the remote
/// profile store. A record that was never written carries the Unix epoch as
/// `last_updated`, so any remote copy counts as newer during a merge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressRecord {
    pub student_id: String,
    #[serde(default = "default_hearts")]
    pub hearts: u8,
    #[serde(default)]
    pub score: u64,
    #[serde(default)]
    pub unlocked_chapters: BTreeSet<String>,
    #[serde(default)]
    pub unlocked_stories: BTreeSet<String>,
    #[serde(default)]
    pub unlocked_civilizations: BTreeSet<String>,
    #[serde(default)]
    pub unlocked_achievements: BTreeSet<String>,
    #[serde(default)]
    pub unlocked_artifacts: BTreeSet<String>,
    pub last_updated: DateTime<Utc>,
    /// When hearts were last set explicitly; the epoch when they never were.
    #[serde(default)]
    pub hearts_updated: DateTime<Utc>,
    /// Set by the profile backend when the account was deleted remotely.
    #[serde(default)]
    pub is_removed: bool,
    /// Records written before versioning was introduced deserialize as v1.
    #[serde(default = "legacy_schema_version")]
    pub schema_version: u8,
}

fn default_hearts() -> u8 {
    MAX_HEARTS
}

fn legacy_schema_version() -> u8 {
    1
}

impl ProgressRecord {
    pub fn new(student_id: &str) -> Self {
        Self {
            student_id: student_id.to_string(),
            hearts: MAX_HEARTS,
            score: 0,
            unlocked_chapters: BTreeSet::new(),
            unlocked_stories: BTreeSet::new(),
            unlocked_civilizations: BTreeSet::new(),
            unlocked_achievements: BTreeSet::new(),
            unlocked_artifacts: BTreeSet::new(),
            last_updated: DateTime::<Utc>::default(),
            hearts_updated: DateTime::<Utc>::default(),
            is_removed: false,
            schema_version: PROGRESS_SCHEMA_VERSION,
        }
    }

    pub fn touch(&mut self) {
        self.last_updated = Utc::now();
    }

    /// Clamp into `[0, MAX_HEARTS]`.
    pub fn set_hearts(&mut self, hearts: i64) {
        self.hearts = hearts.clamp(0, MAX_HEARTS as i64) as u8;
        self.touch();
        self.hearts_updated = self.last_updated;
    }

    /// Negative scores are stored as 0.
    pub fn set_score(&mut self, score: i64) {
        self.score = score.max(0) as u64;
        self.touch();
    }

    pub fn set(&self, track: UnlockTrack) -> &BTreeSet<String> {
        match track {
            UnlockTrack::Chapter => &self.unlocked_chapters,
            UnlockTrack::Story => &self.unlocked_stories,
            UnlockTrack::Civilization => &self.unlocked_civilizations,
            UnlockTrack::Achievement => &self.unlocked_achievements,
            UnlockTrack::Artifact => &self.unlocked_artifacts,
        }
    }

    fn set_mut(&mut self, track: UnlockTrack) -> &mut BTreeSet<String> {
        match track {
            UnlockTrack::Chapter => &mut self.unlocked_chapters,
            UnlockTrack::Story => &mut self.unlocked_stories,
            UnlockTrack::Civilization => &mut self.unlocked_civilizations,
            UnlockTrack::Achievement => &mut self.unlocked_achievements,
            UnlockTrack::Artifact => &mut self.unlocked_artifacts,
        }
    }

    pub fn contains(&self, track: UnlockTrack, id: &str) -> bool {
        self.set(track).contains(id)
    }

    /// Insert `id` into the set for `track`. Returns true when it was not
    /// already present; `last_updated` moves forward either way.
    pub fn insert(&mut self, track: UnlockTrack, id: &str) -> bool {
        let added = self.set_mut(track).insert(id.to_string());
        self.touch();
        added
    }

    /// Fold a freshly fetched remote record into this one.
    ///
    /// Unlock sets are unioned and the higher score wins. Hearts stay local
    /// only when they were set locally after the remote copy last set them;
    /// unrelated local changes such as unlocks do not count. Records flagged
    /// `is_removed` are ignored.
    pub fn merge_remote(&mut self, remote: ProgressRecord) {
        if remote.is_removed {
            return;
        }
        if remote.hearts_updated >= self.hearts_updated {
            self.hearts = remote.hearts.min(MAX_HEARTS);
            self.hearts_updated = remote.hearts_updated;
        }
        let remote_newer = remote.last_updated > self.last_updated;
        self.score = self.score.max(remote.score);
        self.unlocked_chapters.extend(remote.unlocked_chapters);
        self.unlocked_stories.extend(remote.unlocked_stories);
        self.unlocked_civilizations
            .extend(remote.unlocked_civilizations);
        self.unlocked_achievements
            .extend(remote.unlocked_achievements);
        self.unlocked_artifacts.extend(remote.unlocked_artifacts);
        if remote_newer {
            self.last_updated = remote.last_updated;
        }
    }
}
