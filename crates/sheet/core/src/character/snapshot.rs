//! Serializable character state.
//!
//! Snapshots carry only persisted input state. Caches, notifiers and store
//! subscriptions are rebuilt by [`Character::from_snapshot`].

use serde::{Deserialize, Serialize};

use crate::attribute::{AttributeCategory, AttributeTemplate};
use crate::config::SheetConfig;
use crate::error::{ErrorSeverity, SheetError};
use crate::expense::{ExpenseEntry, ExpenseLedger};
use crate::improvement::{Improvement, SessionPhase};
use crate::initiation::InitiationGrade;
use crate::weapon::{AmmoBonus, Weapon, WeaponAccessory, WeaponId, WeaponTemplate, WeaponView};

use super::{Character, CharacterError, MetatypeCategory};

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum SnapshotError {
    #[error("attribute '{0}' appears more than once")]
    DuplicateAttribute(String),

    #[error("attribute '{abbrev}' has minimum {minimum} above maximum {maximum}")]
    InvalidRange {
        abbrev: String,
        minimum: i32,
        maximum: i32,
    },

    #[error(transparent)]
    Character(#[from] CharacterError),
}

impl SheetError for SnapshotError {
    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::DuplicateAttribute(_) => ErrorSeverity::Internal,
            Self::InvalidRange { .. } => ErrorSeverity::Validation,
            Self::Character(err) => err.severity(),
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::DuplicateAttribute(_) => "SNAPSHOT_DUPLICATE_ATTRIBUTE",
            Self::InvalidRange { .. } => "SNAPSHOT_INVALID_RANGE",
            Self::Character(err) => err.error_code(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeSnapshot {
    pub abbrev: String,
    #[serde(default)]
    pub category: Option<AttributeCategory>,
    pub minimum: i32,
    pub maximum: i32,
    pub augmented_maximum: i32,
    #[serde(default)]
    pub base: i32,
    #[serde(default)]
    pub karma: i32,
    #[serde(default)]
    pub augment_modifier: i32,
}

impl AttributeSnapshot {
    fn template(&self) -> AttributeTemplate {
        AttributeTemplate {
            abbrev: self.abbrev.clone(),
            minimum: self.minimum,
            maximum: self.maximum,
            augmented_maximum: self.augmented_maximum,
            category: self.category,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeaponSnapshot {
    pub template: WeaponTemplate,
    #[serde(default)]
    pub accessories: Vec<WeaponAccessory>,
    #[serde(default)]
    pub ammo: Option<AmmoBonus>,
    #[serde(default)]
    pub underbarrel: Vec<WeaponSnapshot>,
}

impl WeaponSnapshot {
    pub fn new(template: WeaponTemplate) -> Self {
        Self {
            template,
            accessories: Vec::new(),
            ammo: None,
            underbarrel: Vec::new(),
        }
    }

    fn capture(weapon: &Weapon) -> Self {
        Self {
            template: weapon.template().clone(),
            accessories: weapon.accessories().to_vec(),
            ammo: weapon.ammo().cloned(),
            underbarrel: weapon.underbarrel().iter().map(Self::capture).collect(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CharacterSnapshot {
    pub name: String,
    pub metatype: MetatypeCategory,
    pub phase: SessionPhase,
    pub karma: i32,
    pub attributes: Vec<AttributeSnapshot>,
    pub improvements: Vec<Improvement>,
    pub weapons: Vec<WeaponSnapshot>,
    pub initiation: Vec<InitiationGrade>,
    pub expenses: Vec<ExpenseEntry>,
}

impl Character {
    /// Rebuilds a character. Improvement ids are reassigned by the store.
    pub fn from_snapshot(
        snapshot: &CharacterSnapshot,
        config: SheetConfig,
    ) -> Result<Self, SnapshotError> {
        let mut character = Character::new(config);
        character.metatype = snapshot.metatype;
        character.phase = snapshot.phase;
        character.karma = snapshot.karma;

        for attribute in &snapshot.attributes {
            if character.attribute_index(&attribute.abbrev).is_ok() {
                return Err(SnapshotError::DuplicateAttribute(attribute.abbrev.clone()));
            }
            if attribute.minimum > attribute.maximum {
                return Err(SnapshotError::InvalidRange {
                    abbrev: attribute.abbrev.clone(),
                    minimum: attribute.minimum,
                    maximum: attribute.maximum,
                });
            }
            character.add_attribute(attribute.template());
            character.set_base(&attribute.abbrev, attribute.base)?;
            character.set_attribute_karma(&attribute.abbrev, attribute.karma)?;
            character.set_augment_modifier(&attribute.abbrev, attribute.augment_modifier)?;
        }

        character.add_improvements(snapshot.improvements.iter().cloned());

        for weapon in &snapshot.weapons {
            let id = character.add_weapon(weapon.template.clone());
            character.restore_weapon_parts(id, weapon)?;
        }

        character.grades = snapshot.initiation.clone();
        character.expenses = ExpenseLedger::from_entries(snapshot.expenses.clone());

        tracing::debug!(
            name = %snapshot.name,
            attributes = character.attributes.len(),
            weapons = character.weapons.len(),
            improvements = character.improvements.len(),
            "character restored"
        );
        Ok(character)
    }

    fn restore_weapon_parts(
        &mut self,
        id: WeaponId,
        snapshot: &WeaponSnapshot,
    ) -> Result<(), CharacterError> {
        for accessory in &snapshot.accessories {
            self.add_accessory(id, accessory.clone())?;
        }
        self.load_ammo(id, snapshot.ammo.clone())?;
        for child in &snapshot.underbarrel {
            let child_id = self.add_underbarrel(id, child.template.clone())?;
            self.restore_weapon_parts(child_id, child)?;
        }
        Ok(())
    }

    pub fn snapshot(&self, name: impl Into<String>) -> CharacterSnapshot {
        CharacterSnapshot {
            name: name.into(),
            metatype: self.metatype,
            phase: self.phase,
            karma: self.karma,
            attributes: self
                .attributes
                .iter()
                .map(|attribute| AttributeSnapshot {
                    abbrev: attribute.abbrev().to_string(),
                    category: Some(attribute.category()),
                    minimum: attribute.raw_metatype_minimum(),
                    maximum: attribute.raw_metatype_maximum(),
                    augmented_maximum: attribute.metatype_augmented_maximum(),
                    base: attribute.base(),
                    karma: attribute.karma(),
                    augment_modifier: attribute.augment_modifier(),
                })
                .collect(),
            improvements: self.improvements.iter().cloned().collect(),
            weapons: self.weapons.iter().map(WeaponSnapshot::capture).collect(),
            initiation: self.grades.clone(),
            expenses: self.expenses.entries().to_vec(),
        }
    }
}

impl WeaponView<'_> {
    pub fn snapshot(&self) -> WeaponSnapshot {
        WeaponSnapshot::capture(self.weapon())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::improvement::ImprovementKind;

    fn sample() -> CharacterSnapshot {
        CharacterSnapshot {
            name: "Sam".into(),
            karma: 12,
            attributes: vec![AttributeSnapshot {
                abbrev: "STR".into(),
                category: None,
                minimum: 1,
                maximum: 6,
                augmented_maximum: 10,
                base: 2,
                karma: 1,
                augment_modifier: 0,
            }],
            improvements: vec![Improvement::attribute("STR", 1)],
            weapons: vec![WeaponSnapshot {
                accessories: vec![WeaponAccessory::new("Silencer")],
                underbarrel: vec![WeaponSnapshot::new(WeaponTemplate::new(
                    "Grenade Launcher",
                    "Grenade Launchers",
                ))],
                ..WeaponSnapshot::new(WeaponTemplate {
                    damage: "(STR+2)P".into(),
                    ..WeaponTemplate::new("Combat Knife", "Blades")
                })
            }],
            ..CharacterSnapshot::default()
        }
    }

    #[test]
    fn restore_rebuilds_derived_values() {
        let character = Character::from_snapshot(&sample(), SheetConfig::default()).unwrap();
        let strength = character.attribute("STR").unwrap();
        assert_eq!(strength.value(), 4);
        assert_eq!(strength.total_value(), 5);
        assert_eq!(character.karma(), 12);

        let knife = character.weapons().next().unwrap();
        assert_eq!(knife.display_damage(), "7P");
        assert_eq!(knife.underbarrel().count(), 1);
    }

    #[test]
    fn snapshot_survives_json() {
        let character = Character::from_snapshot(&sample(), SheetConfig::default()).unwrap();
        let snapshot = character.snapshot("Sam");
        let json = serde_json::to_string(&snapshot).unwrap();
        let back: CharacterSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back.attributes, snapshot.attributes);
        assert_eq!(back.weapons, snapshot.weapons);
        assert_eq!(back.improvements[0].kind, ImprovementKind::Attribute);
    }

    #[test]
    fn duplicate_attributes_are_rejected() {
        let mut snapshot = sample();
        snapshot.attributes.push(snapshot.attributes[0].clone());
        let err = Character::from_snapshot(&snapshot, SheetConfig::default()).unwrap_err();
        assert_eq!(err, SnapshotError::DuplicateAttribute("STR".into()));
        assert!(err.severity().is_internal());
    }
}
