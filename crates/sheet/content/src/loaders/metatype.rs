//! Metatype catalog loader.

use std::path::Path;

use serde::{Deserialize, Serialize};
use sheet_core::{AttributeTemplate, Character, MetatypeCategory, SheetConfig};

use crate::loaders::{LoadResult, read_file};

/// One metatype and its attribute ranges.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetatypeDefinition {
    pub name: String,
    #[serde(default)]
    pub category: MetatypeCategory,
    pub attributes: Vec<AttributeTemplate>,
}

impl MetatypeDefinition {
    /// Creates a blank character of this metatype.
    pub fn instantiate(&self, config: SheetConfig) -> Character {
        let mut character = Character::new(config);
        character.set_metatype(self.category);
        for template in &self.attributes {
            character.add_attribute(template.clone());
        }
        character
    }
}

/// Metatype catalog structure for RON files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetatypeCatalog {
    pub metatypes: Vec<MetatypeDefinition>,
}

impl MetatypeCatalog {
    /// Case-insensitive lookup by name.
    pub fn find(&self, name: &str) -> Option<&MetatypeDefinition> {
        self.metatypes
            .iter()
            .find(|metatype| metatype.name.eq_ignore_ascii_case(name))
    }
}

/// Loader for the metatype catalog from RON files.
pub struct MetatypeLoader;

impl MetatypeLoader {
    /// Load the metatype catalog from a RON file.
    ///
    /// Rejects catalogs where an attribute minimum exceeds its maximum.
    pub fn load(path: &Path) -> LoadResult<MetatypeCatalog> {
        let content = read_file(path)?;
        let catalog: MetatypeCatalog = ron::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Failed to parse metatype catalog RON: {}", e))?;

        for metatype in &catalog.metatypes {
            for attribute in &metatype.attributes {
                anyhow::ensure!(
                    attribute.minimum <= attribute.maximum,
                    "Metatype {}: {} minimum {} exceeds maximum {}",
                    metatype.name,
                    attribute.abbrev,
                    attribute.minimum,
                    attribute.maximum
                );
            }
        }
        tracing::debug!(count = catalog.metatypes.len(), "metatypes loaded");
        Ok(catalog)
    }
}
