//! Saved character loader.

use std::path::Path;

use sheet_core::{Character, CharacterSnapshot, SheetConfig};

use crate::loaders::{LoadResult, read_file};

/// Loads and saves character snapshots as RON.
pub struct CharacterLoader;

impl CharacterLoader {
    /// Load a snapshot without rebuilding the character.
    pub fn load_snapshot(path: &Path) -> LoadResult<CharacterSnapshot> {
        let content = read_file(path)?;
        ron::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Failed to parse character RON {}: {}", path.display(), e))
    }

    /// Load a snapshot and rebuild the live character under `config`.
    pub fn load(path: &Path, config: SheetConfig) -> LoadResult<(String, Character)> {
        let snapshot = Self::load_snapshot(path)?;
        let character = Character::from_snapshot(&snapshot, config)?;
        Ok((snapshot.name, character))
    }

    pub fn to_ron(snapshot: &CharacterSnapshot) -> LoadResult<String> {
        ron::ser::to_string_pretty(snapshot, ron::ser::PrettyConfig::default())
            .map_err(|e| anyhow::anyhow!("Failed to serialize character: {}", e))
    }

    /// Write `snapshot` to `path` as pretty RON.
    pub fn save(path: &Path, snapshot: &CharacterSnapshot) -> LoadResult<()> {
        let content = Self::to_ron(snapshot)?;
        std::fs::write(path, content)
            .map_err(|e| anyhow::anyhow!("Failed to write file {}: {}", path.display(), e))?;
        tracing::debug!(path = %path.display(), name = %snapshot.name, "character saved");
        Ok(())
    }
}
