//! Sheet options loader.

use std::path::Path;

use sheet_core::SheetConfig;

use crate::loaders::{LoadResult, read_file};

/// Loader for house rules from TOML files.
pub struct OptionsLoader;

impl OptionsLoader {
    /// Load options from a TOML file. Missing keys keep their defaults.
    pub fn load(path: &Path) -> LoadResult<SheetConfig> {
        let content = read_file(path)?;
        let config: SheetConfig = toml::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Failed to parse options TOML: {}", e))?;

        anyhow::ensure!(
            config.karma_attribute > 0,
            "karma_attribute must be positive, got {}",
            config.karma_attribute
        );
        Ok(config)
    }
}
