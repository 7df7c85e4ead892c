//! Content factory for loading rule data from a data directory.

use std::path::{Path, PathBuf};

use sheet_core::{Character, SheetConfig};

use crate::loaders::{
    CharacterLoader, LoadResult, MetatypeCatalog, MetatypeLoader, OptionsLoader, WeaponCatalog,
    WeaponLoader,
};

/// Content factory that loads all rule content from a data directory.
///
/// # Directory Structure
///
/// ```text
/// data_dir/
/// ├── options.toml
/// ├── metatypes.ron
/// ├── weapons.ron
/// └── characters/
///     └── street_samurai.ron
/// ```
pub struct ContentFactory {
    data_dir: PathBuf,
}

impl ContentFactory {
    /// Creates a new content factory pointing to a data directory.
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    /// Load house rules from `options.toml`, or the defaults if the file is
    /// absent.
    pub fn load_options(&self) -> LoadResult<SheetConfig> {
        let path = self.data_dir.join("options.toml");
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no options file, using defaults");
            return Ok(SheetConfig::default());
        }
        OptionsLoader::load(&path)
    }

    /// Load the metatype catalog from `metatypes.ron`.
    pub fn load_metatypes(&self) -> LoadResult<MetatypeCatalog> {
        let path = self.data_dir.join("metatypes.ron");
        MetatypeLoader::load(&path)
    }

    /// Load the weapon catalog from `weapons.ron`.
    pub fn load_weapons(&self) -> LoadResult<WeaponCatalog> {
        let path = self.data_dir.join("weapons.ron");
        WeaponLoader::load(&path)
    }

    /// Resolves a character reference: an existing path is used as is,
    /// anything else names `characters/{name}.ron`.
    pub fn character_path(&self, reference: &str) -> PathBuf {
        let direct = PathBuf::from(reference);
        if direct.is_file() {
            return direct;
        }
        self.data_dir
            .join("characters")
            .join(format!("{}.ron", reference))
    }

    /// Load a saved character under this directory's options.
    pub fn load_character(&self, reference: &str) -> LoadResult<(String, Character)> {
        let config = self.load_options()?;
        CharacterLoader::load(&self.character_path(reference), config)
    }

    /// Creates a blank character of the named metatype.
    pub fn new_character(&self, metatype: &str) -> LoadResult<Character> {
        let config = self.load_options()?;
        let catalog = self.load_metatypes()?;
        let definition = catalog
            .find(metatype)
            .ok_or_else(|| anyhow::anyhow!("Unknown metatype: {}", metatype))?;
        Ok(definition.instantiate(config))
    }

    /// Returns the data directory path.
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_factory_paths() {
        let factory = ContentFactory::new("/tmp/data");
        assert_eq!(factory.data_dir(), Path::new("/tmp/data"));
        assert_eq!(
            factory.character_path("sam"),
            Path::new("/tmp/data/characters/sam.ron")
        );
    }

    #[test]
    fn missing_options_fall_back_to_defaults() {
        let factory = ContentFactory::new("/nonexistent/sheet-data");
        assert_eq!(factory.load_options().unwrap(), SheetConfig::default());
    }
}
