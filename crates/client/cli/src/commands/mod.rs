//! Command implementations.
//!
//! Each command is a separate module that implements its own CLI args and
//! execution logic against a shared [`Session`].

mod eval;
mod expenses;
mod new;
mod show;
mod upgrade;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use sheet_content::{CharacterLoader, ContentFactory};
use sheet_core::Character;

use crate::config::CliConfig;

pub use eval::Eval;
pub use expenses::{Expenses, Undo};
pub use new::New;
pub use show::Show;
pub use upgrade::Upgrade;

/// Resolved configuration plus the content factory for one invocation.
pub struct Session {
    config: CliConfig,
    factory: ContentFactory,
}

/// A character opened from disk, remembering where it came from.
pub struct OpenCharacter {
    pub name: String,
    pub path: PathBuf,
    pub character: Character,
}

impl OpenCharacter {
    /// Writes the character back to the file it was loaded from.
    pub fn save(&self) -> Result<()> {
        CharacterLoader::save(&self.path, &self.character.snapshot(&self.name))
    }
}

impl Session {
    pub fn new(config: CliConfig, data_dir: PathBuf) -> Self {
        Self {
            config,
            factory: ContentFactory::new(data_dir),
        }
    }

    pub fn factory(&self) -> &ContentFactory {
        &self.factory
    }

    pub fn data_dir(&self) -> &Path {
        self.factory.data_dir()
    }

    /// Opens the character named by `flag`, falling back to
    /// `SHEET_CHARACTER`.
    pub fn open(&self, flag: Option<String>) -> Result<OpenCharacter> {
        let reference = self.config.resolve_character(flag)?;
        let path = self.factory.character_path(&reference);
        let (name, character) = self
            .factory
            .load_character(&reference)
            .with_context(|| format!("Failed to open character: {}", path.display()))?;
        tracing::debug!(name = %name, path = %path.display(), "character opened");
        Ok(OpenCharacter {
            name,
            path,
            character,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use clap::Parser;
    use sheet_core::SheetConfig;

    use super::*;

    fn bundled(file: &str) -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("../../sheet/content/data")
            .join(file)
    }

    fn reload(path: &Path) -> Character {
        let (_, character) = CharacterLoader::load(path, SheetConfig::default()).unwrap();
        character
    }

    #[test]
    fn upgrade_and_undo_persist_to_disk() {
        let dir = tempfile::tempdir().unwrap();
        fs::copy(bundled("metatypes.ron"), dir.path().join("metatypes.ron")).unwrap();
        let session = Session::new(CliConfig::default(), dir.path().to_path_buf());

        New::try_parse_from(["new", "Kestrel", "--karma", "50", "--career"])
            .unwrap()
            .execute(&session)
            .unwrap();
        let path = dir.path().join("characters").join("Kestrel.ron");
        assert_eq!(reload(&path).attribute_total("AGI"), Some(1));

        Upgrade::try_parse_from(["upgrade", "agi", "--character", "Kestrel"])
            .unwrap()
            .execute(&session)
            .unwrap();
        let upgraded = reload(&path);
        assert_eq!(upgraded.attribute_total("AGI"), Some(2));
        assert_eq!(upgraded.karma(), 40);
        assert_eq!(upgraded.expenses().len(), 1);

        Undo::try_parse_from(["undo", "1", "--character", "Kestrel"])
            .unwrap()
            .execute(&session)
            .unwrap();
        let undone = reload(&path);
        assert_eq!(undone.attribute_total("AGI"), Some(1));
        assert_eq!(undone.karma(), 50);
        assert!(undone.expenses().is_empty());
    }

    #[test]
    fn dry_run_leaves_file_untouched() {
        let dir = tempfile::tempdir().unwrap();
        fs::copy(bundled("metatypes.ron"), dir.path().join("metatypes.ron")).unwrap();
        let session = Session::new(CliConfig::default(), dir.path().to_path_buf());

        New::try_parse_from(["new", "Kestrel", "--karma", "50", "--career"])
            .unwrap()
            .execute(&session)
            .unwrap();
        let path = dir.path().join("characters").join("Kestrel.ron");
        let before = fs::read_to_string(&path).unwrap();

        Upgrade::try_parse_from(["upgrade", "AGI", "-c", "Kestrel", "--dry-run"])
            .unwrap()
            .execute(&session)
            .unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), before);
    }
}
