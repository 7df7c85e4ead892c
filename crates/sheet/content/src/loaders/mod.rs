//! Content loaders for reading rule data and characters from files.
//!
//! Each loader turns one RON/TOML file into `sheet-core` types.
//! [`ContentFactory`] ties them to a data directory.

pub mod character;
pub mod factory;
pub mod metatype;
pub mod options;
pub mod weapon;

pub use character::CharacterLoader;
pub use factory::ContentFactory;
pub use metatype::{MetatypeCatalog, MetatypeDefinition, MetatypeLoader};
pub use options::OptionsLoader;
pub use weapon::{WeaponCatalog, WeaponLoader};

use std::path::Path;

/// Common result type for loaders.
pub type LoadResult<T> = anyhow::Result<T>;

/// Helper function to read file contents.
pub(crate) fn read_file(path: &Path) -> LoadResult<String> {
    std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("Failed to read file {}: {}", path.display(), e))
}
