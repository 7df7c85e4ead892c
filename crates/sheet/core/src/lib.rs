//! Improvement-driven character sheet engine.
//!
//! `sheet-core` computes every numeric trait of a character (attribute
//! values and limits, karma costs, weapon damage, AP, accuracy, cost and
//! availability) from purchased base values, rule templates and a pool of
//! [`Improvement`]s. All state lives in a [`Character`]; derived numbers are
//! read through [`AttributeView`] and [`WeaponView`], and changes are
//! announced to subscribers through static per-entity dependency graphs.
//!
//! The crate performs no I/O. Rule data and persisted characters are loaded
//! by `sheet-content`; snapshot types are available behind the `serde`
//! feature.
pub mod attribute;
pub mod cache;
pub mod character;
pub mod config;
pub mod error;
pub mod expense;
pub mod formula;
pub mod improvement;
pub mod initiation;
pub mod notify;
pub mod weapon;

pub use attribute::{
    ATTRIBUTE_GRAPH, Attribute, AttributeCategory, AttributeProperty, AttributeTemplate,
    AttributeView, SPECIAL_ATTRIBUTES,
};
pub use cache::DerivedCache;
pub use character::{Character, CharacterError, MetatypeCategory};
#[cfg(feature = "serde")]
pub use character::{AttributeSnapshot, CharacterSnapshot, SnapshotError, WeaponSnapshot};
pub use config::SheetConfig;
pub use error::{ErrorSeverity, SheetError};
pub use expense::{ExpenseEntry, ExpenseId, ExpenseKind, ExpenseLedger, ExpenseUndo};
pub use formula::{FormulaError, FormulaValue, Rounding, VariableSource};
pub use improvement::{
    Condition, Explanation, Improvement, ImprovementEvent, ImprovementId, ImprovementKind,
    ImprovementQuery, ImprovementSource, ImprovementStore, SessionPhase,
};
pub use initiation::InitiationGrade;
pub use notify::{CycleError, DependencyGraph, Notifier, Subscription};
pub use weapon::{
    AmmoBonus, AvailSuffix, AvailabilityValue, DamageCode, WEAPON_GRAPH, Weapon, WeaponAccessory,
    WeaponId, WeaponProperty, WeaponTemplate, WeaponType, WeaponView,
};
