//! Weapon catalog loader.

use std::path::Path;

use serde::{Deserialize, Serialize};
use sheet_core::{WeaponAccessory, WeaponTemplate};

use crate::loaders::{LoadResult, read_file};

/// Weapon catalog structure for RON files.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WeaponCatalog {
    pub weapons: Vec<WeaponTemplate>,
    #[serde(default)]
    pub accessories: Vec<WeaponAccessory>,
}

impl WeaponCatalog {
    /// Case-insensitive lookup by name.
    pub fn weapon(&self, name: &str) -> Option<&WeaponTemplate> {
        self.weapons
            .iter()
            .find(|weapon| weapon.name.eq_ignore_ascii_case(name))
    }

    pub fn accessory(&self, name: &str) -> Option<&WeaponAccessory> {
        self.accessories
            .iter()
            .find(|accessory| accessory.name.eq_ignore_ascii_case(name))
    }
}

/// Loader for the weapon catalog from RON files.
pub struct WeaponLoader;

impl WeaponLoader {
    /// Load the weapon catalog from a RON file.
    pub fn load(path: &Path) -> LoadResult<WeaponCatalog> {
        let content = read_file(path)?;
        let catalog: WeaponCatalog = ron::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Failed to parse weapon catalog RON: {}", e))?;

        tracing::debug!(
            weapons = catalog.weapons.len(),
            accessories = catalog.accessories.len(),
            "weapon catalog loaded"
        );
        Ok(catalog)
    }
}
