//! Catalog of unlockable achievements and artifacts.
//!
//! The catalog is assembled once at startup through [`RegistryBuilder`] and is
//! immutable afterwards; share it behind an `Arc`. Ids are chosen by content
//! authors and are append-only: once shipped, an id is never reused for a
//! different definition. Lookups by id and by display name always land on the
//! same entry.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::progress::errors::ProgressError;
use crate::progress::types::{AchievementDefinition, DefinitionKind, ProgressRecord};

#[derive(Debug, Default)]
pub struct RegistryBuilder {
    definitions: Vec<AchievementDefinition>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(mut self, definition: AchievementDefinition) -> Self {
        self.definitions.push(definition);
        self
    }

    pub fn extend<I>(mut self, definitions: I) -> Self
    where
        I: IntoIterator<Item = AchievementDefinition>,
    {
        self.definitions.extend(definitions);
        self
    }

    /// Freeze the catalog. Fails on the first duplicated id or name.
    pub fn build(self) -> Result<Registry, ProgressError> {
        let mut by_id = HashMap::with_capacity(self.definitions.len());
        let mut by_name = HashMap::with_capacity(self.definitions.len());
        for (index, definition) in self.definitions.iter().enumerate() {
            if by_id.insert(definition.id.clone(), index).is_some() {
                return Err(ProgressError::DuplicateDefinition {
                    field: "id",
                    value: definition.id.clone(),
                });
            }
            if by_name.insert(definition.name.clone(), index).is_some() {
                return Err(ProgressError::DuplicateDefinition {
                    field: "name",
                    value: definition.name.clone(),
                });
            }
        }
        Ok(Registry {
            definitions: self.definitions,
            by_id,
            by_name,
        })
    }
}

#[derive(Debug)]
pub struct Registry {
    definitions: Vec<AchievementDefinition>,
    by_id: HashMap<String, usize>,
    by_name: HashMap<String, usize>,
}

impl Registry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    /// The catalog compiled into the binary.
    pub fn builtin() -> Result<Self, ProgressError> {
        RegistryBuilder::new()
            .extend(builtin_definitions())
            .build()
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, ProgressError> {
        RegistryBuilder::new()
            .extend(load_definitions_from_json(path)?)
            .build()
    }

    pub fn by_id(&self, id: &str) -> Option<&AchievementDefinition> {
        self.by_id.get(id).map(|&index| &self.definitions[index])
    }

    pub fn by_name(&self, name: &str) -> Option<&AchievementDefinition> {
        self.by_name.get(name).map(|&index| &self.definitions[index])
    }

    /// Id first, then display name.
    pub fn resolve(&self, id_or_name: &str) -> Option<&AchievementDefinition> {
        self.by_id(id_or_name).or_else(|| self.by_name(id_or_name))
    }

    /// Definitions in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &AchievementDefinition> {
        self.definitions.iter()
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Ids in the record's achievement/artifact sets that the catalog does not
    /// know, or that sit in the set of the other kind.
    pub fn unknown_ids(&self, record: &ProgressRecord) -> Vec<String> {
        let mut unknown = Vec::new();
        for (kind, set) in [
            (DefinitionKind::Achievement, &record.unlocked_achievements),
            (DefinitionKind::Artifact, &record.unlocked_artifacts),
        ] {
            for id in set {
                match self.by_id(id) {
                    Some(definition) if definition.kind == kind => {}
                    _ => unknown.push(id.clone()),
                }
            }
        }
        unknown
    }
}

#[derive(Debug, Deserialize)]
struct DefinitionSeed {
    id: String,
    name: String,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    description: String,
    kind: DefinitionKind,
}

/// Load catalog entries from a JSON array of
/// `{id, name, title?, description?, kind: "achievement"|"artifact"}`.
/// A missing title falls back to the name.
pub fn load_definitions_from_json<P: AsRef<Path>>(
    path: P,
) -> Result<Vec<AchievementDefinition>, ProgressError> {
    let contents = fs::read_to_string(path.as_ref())?;
    let seeds: Vec<DefinitionSeed> = serde_json::from_str(&contents)?;
    Ok(seeds
        .into_iter()
        .map(|seed| {
            let title = seed.title.unwrap_or_else(|| seed.name.clone());
            AchievementDefinition::new(&seed.id, &seed.name, &title, &seed.description, seed.kind)
        })
        .collect())
}

/// Shipped catalog. Append only.
pub fn builtin_definitions() -> Vec<AchievementDefinition> {
    vec![
        AchievementDefinition::achievement(
            "AC001",
            "Scribe",
            "First Scribe",
            "Press your first cuneiform sign into wet clay",
        ),
        AchievementDefinition::achievement(
            "AC002",
            "Farmer",
            "Tiller of the Two Rivers",
            "Help plant barley along the Euphrates",
        ),
        AchievementDefinition::achievement(
            "AC003",
            "Builder",
            "Ziggurat Builder",
            "Raise the ziggurat of Ur",
        ),
        AchievementDefinition::achievement(
            "AC004",
            "Merchant",
            "Caravan Trader",
            "Close a trade in the market of Akkad",
        ),
        AchievementDefinition::achievement(
            "AC005",
            "Lawgiver",
            "Keeper of the Code",
            "Read every law on the stele of Hammurabi",
        ),
        AchievementDefinition::achievement(
            "AC006",
            "Astronomer",
            "Star Watcher",
            "Chart the wandering stars from the temple roof",
        ),
        AchievementDefinition::achievement(
            "AC007",
            "Storyteller",
            "Teller of Gilgamesh",
            "Finish the epic of Gilgamesh",
        ),
        AchievementDefinition::achievement(
            "AC008",
            "Librarian",
            "Keeper of Nineveh",
            "Catalogue the library of Ashurbanipal",
        ),
        AchievementDefinition::achievement(
            "AC009",
            "Unbroken",
            "Steady Heart",
            "Finish a chapter without losing a heart",
        ),
        AchievementDefinition::achievement(
            "AC010",
            "Historian",
            "Master Historian",
            "Complete the story of every civilization",
        ),
        AchievementDefinition::artifact(
            "AR001",
            "Tablet",
            "Clay Tablet",
            "A tablet covered in wedge-shaped signs",
        ),
        AchievementDefinition::artifact(
            "AR002",
            "Cylinder Seal",
            "Cylinder Seal",
            "A carved stone roller used to sign contracts",
        ),
        AchievementDefinition::artifact(
            "AR003",
            "Standard",
            "Standard of Ur",
            "An inlaid box showing scenes of war and peace",
        ),
        AchievementDefinition::artifact(
            "AR004",
            "Stele",
            "Stele of Hammurabi",
            "A basalt pillar inscribed with the laws of Babylon",
        ),
        AchievementDefinition::artifact(
            "AR005",
            "Lamassu",
            "Lamassu",
            "A winged guardian from an Assyrian palace gate",
        ),
        AchievementDefinition::artifact(
            "AR006",
            "Glazed Brick",
            "Ishtar Gate Brick",
            "A blue brick from the Ishtar Gate",
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::types::UnlockTrack;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn id_and_name_lookups_agree() {
        let registry = Registry::builtin().expect("catalog");
        for definition in registry.iter() {
            let by_id = registry.by_id(&definition.id).expect("by id");
            let by_name = registry.by_name(&definition.name).expect("by name");
            assert!(std::ptr::eq(by_id, by_name), "{} diverged", definition.id);
        }
    }

    #[test]
    fn resolve_prefers_id_then_name() {
        let registry = Registry::builtin().unwrap();
        assert_eq!(registry.resolve("AC001").unwrap().name, "Scribe");
        assert_eq!(registry.resolve("Tablet").unwrap().id, "AR001");
        assert!(registry.resolve("Pyramid").is_none());
    }

    #[test]
    fn iteration_follows_registration_order() {
        let registry = Registry::builtin().unwrap();
        let ids: Vec<_> = registry.iter().take(3).map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["AC001", "AC002", "AC003"]);
        assert_eq!(
            registry
                .iter()
                .filter(|d| d.kind == DefinitionKind::Artifact)
                .count(),
            6
        );
    }

    #[test]
    fn duplicates_are_rejected() {
        let err = Registry::builder()
            .register(AchievementDefinition::achievement("X1", "One", "One", ""))
            .register(AchievementDefinition::artifact("X1", "Two", "Two", ""))
            .build()
            .unwrap_err();
        assert!(matches!(err, ProgressError::DuplicateDefinition { field: "id", .. }));

        let err = Registry::builder()
            .register(AchievementDefinition::achievement("X1", "Same", "", ""))
            .register(AchievementDefinition::achievement("X2", "Same", "", ""))
            .build()
            .unwrap_err();
        assert!(matches!(err, ProgressError::DuplicateDefinition { field: "name", .. }));
    }

    #[test]
    fn unknown_ids_are_reported() {
        let registry = Registry::builtin().unwrap();
        let mut record = ProgressRecord::new("s1");
        record.insert(UnlockTrack::Achievement, "AC001");
        record.insert(UnlockTrack::Achievement, "AC999");
        record.insert(UnlockTrack::Achievement, "AR001");
        let unknown = registry.unknown_ids(&record);
        assert_eq!(unknown, vec!["AC999".to_string(), "AR001".to_string()]);
    }

    #[test]
    fn loads_seed_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[
                {{"id": "EG001", "name": "Papyrus", "kind": "artifact"}},
                {{"id": "EG002", "name": "Pharaoh", "title": "Lord of Two Lands", "description": "Crowned", "kind": "achievement"}}
            ]"#
        )
        .unwrap();
        let registry = Registry::from_json_file(file.path()).unwrap();
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.by_id("EG001").unwrap().title, "Papyrus");
        assert_eq!(registry.by_name("Pharaoh").unwrap().kind, DefinitionKind::Achievement);
    }
}
