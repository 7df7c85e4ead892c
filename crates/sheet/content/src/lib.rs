//! Data-driven rule content and character files.
//!
//! This crate loads the rule templates the engine computes against:
//! - Metatype attribute ranges (RON)
//! - Weapon catalog (RON)
//! - House-rule options (TOML)
//! - Saved characters (RON snapshots)
//!
//! All loaders deserialize `sheet-core` types directly through their `serde`
//! derives; this crate adds only the catalog wrappers around them.

#[cfg(feature = "loaders")]
pub mod loaders;

#[cfg(feature = "loaders")]
pub use loaders::{
    CharacterLoader, ContentFactory, MetatypeCatalog, MetatypeDefinition, MetatypeLoader,
    OptionsLoader, WeaponCatalog, WeaponLoader,
};
