//! The character context.
//!
//! [`Character`] owns everything a derived value can depend on: the
//! improvement store, attributes, weapons, karma pool, session phase and
//! house rules. Entities never hold a back-reference to their character;
//! reads go through [`AttributeView`] / [`WeaponView`], which borrow the
//! context for the duration of the read.
//!
//! # Mutation
//!
//! Every mutation goes through `&mut Character`. After a change the context
//! re-announces whatever other entities observe:
//!
//! ```text
//! set_base / upgrade ──► Attribute graph ──► weapons: Attributes
//!                    └─► CanUpgradeCareer re-check (only flips are announced)
//! add_improvement    ──► ImprovementEvent ──► attribute caches + weapons
//! set_phase          ──► every attribute cache dropped
//! ```

#[cfg(feature = "serde")]
mod snapshot;

#[cfg(feature = "serde")]
pub use snapshot::{AttributeSnapshot, CharacterSnapshot, SnapshotError, WeaponSnapshot};

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

use crate::attribute::{Attribute, AttributeProperty, AttributeTemplate, AttributeView};
use crate::config::SheetConfig;
use crate::error::{ErrorSeverity, SheetError};
use crate::expense::{ExpenseId, ExpenseKind, ExpenseLedger, ExpenseUndo};
use crate::formula::VariableSource;
use crate::improvement::{
    Improvement, ImprovementEvent, ImprovementId, ImprovementSource, ImprovementStore,
    SessionPhase,
};
use crate::initiation::InitiationGrade;
use crate::notify::Subscription;
use crate::weapon::{
    AmmoBonus, Weapon, WeaponAccessory, WeaponId, WeaponProperty, WeaponTemplate, WeaponView,
};

/// Broad metatype family; some attribute rules depend on it.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    Hash,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[strum(ascii_case_insensitive)]
pub enum MetatypeCategory {
    #[default]
    Standard,
    Critter,
    /// Magic fixed at 1.
    Cyberzombie,
    /// Depth may drop to 0.
    ArtificialIntelligence,
}

// ============================================================================
// Errors
// ============================================================================

/// Mutation referencing something the character does not have.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum CharacterError {
    #[error("unknown attribute '{0}'")]
    UnknownAttribute(String),

    #[error("unknown weapon {0}")]
    UnknownWeapon(WeaponId),

    #[error("unknown accessory '{name}' on {weapon}")]
    UnknownAccessory { weapon: WeaponId, name: String },

    #[error("unknown improvement {0}")]
    UnknownImprovement(ImprovementId),

    #[error("unknown expense {0}")]
    UnknownExpense(ExpenseId),

    #[error("{0} cannot be undone")]
    NotUndoable(ExpenseId),
}

impl SheetError for CharacterError {
    fn severity(&self) -> ErrorSeverity {
        ErrorSeverity::Validation
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::UnknownAttribute(_) => "CHARACTER_UNKNOWN_ATTRIBUTE",
            Self::UnknownWeapon(_) => "CHARACTER_UNKNOWN_WEAPON",
            Self::UnknownAccessory { .. } => "CHARACTER_UNKNOWN_ACCESSORY",
            Self::UnknownImprovement(_) => "CHARACTER_UNKNOWN_IMPROVEMENT",
            Self::UnknownExpense(_) => "CHARACTER_UNKNOWN_EXPENSE",
            Self::NotUndoable(_) => "CHARACTER_NOT_UNDOABLE",
        }
    }
}

// ============================================================================
// Character
// ============================================================================

#[derive(Debug, Default)]
pub struct Character {
    config: SheetConfig,
    metatype: MetatypeCategory,
    phase: SessionPhase,
    /// Unspent karma.
    karma: i32,
    improvements: ImprovementStore,
    attributes: Vec<Attribute>,
    weapons: Vec<Weapon>,
    next_weapon_id: u32,
    grades: Vec<InitiationGrade>,
    expenses: ExpenseLedger,
}

impl Character {
    pub fn new(config: SheetConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    // ===== context =====

    pub fn config(&self) -> &SheetConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: SheetConfig) {
        if self.config == config {
            return;
        }
        self.config = config;
        for attribute in &self.attributes {
            attribute.announce(AttributeProperty::Value);
            attribute.announce(AttributeProperty::TotalKarmaCost);
        }
        self.announce_weapons(WeaponProperty::Attributes);
        self.refresh_can_upgrade();
    }

    pub fn metatype(&self) -> MetatypeCategory {
        self.metatype
    }

    pub fn is_critter(&self) -> bool {
        self.metatype == MetatypeCategory::Critter
    }

    pub fn set_metatype(&mut self, metatype: MetatypeCategory) {
        if self.metatype != metatype {
            self.metatype = metatype;
            for attribute in &self.attributes {
                attribute.announce(AttributeProperty::TotalMinimum);
                attribute.announce(AttributeProperty::TotalMaximum);
            }
            self.attributes_changed();
        }
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    /// Switches between creation and career mode. Conditional improvements
    /// flip, so every memoized modifier is dropped.
    pub fn set_phase(&mut self, phase: SessionPhase) {
        if self.phase == phase {
            return;
        }
        tracing::info!(from = %self.phase, to = %phase, "session phase changed");
        self.phase = phase;
        for attribute in &self.attributes {
            attribute.invalidate_modifiers();
            attribute.announce(AttributeProperty::UpgradeKarmaCost);
            attribute.announce(AttributeProperty::TotalKarmaCost);
        }
        self.announce_weapons(WeaponProperty::Improvements);
        self.refresh_can_upgrade();
    }

    /// Unspent karma.
    pub fn karma(&self) -> i32 {
        self.karma
    }

    pub fn set_karma(&mut self, karma: i32) {
        if self.karma != karma {
            self.karma = karma;
            self.refresh_can_upgrade();
        }
    }

    // ===== improvements =====

    pub fn improvements(&self) -> &ImprovementStore {
        &self.improvements
    }

    pub fn add_improvement(&mut self, improvement: Improvement) -> ImprovementId {
        let id = self.improvements.add(improvement);
        self.improvements_changed();
        id
    }

    pub fn add_improvements(
        &mut self,
        improvements: impl IntoIterator<Item = Improvement>,
    ) -> Vec<ImprovementId> {
        let ids = self.improvements.extend(improvements);
        self.improvements_changed();
        ids
    }

    pub fn remove_improvement(&mut self, id: ImprovementId) -> Result<Improvement, CharacterError> {
        let removed = self
            .improvements
            .remove(id)
            .ok_or(CharacterError::UnknownImprovement(id))?;
        self.improvements_changed();
        Ok(removed)
    }

    /// Removes everything granted by one source, e.g. uninstalled cyberware.
    pub fn remove_improvements_from(
        &mut self,
        source: ImprovementSource,
        source_name: &str,
    ) -> Vec<Improvement> {
        let removed = self.improvements.remove_by_source(source, source_name);
        if !removed.is_empty() {
            self.improvements_changed();
        }
        removed
    }

    pub fn set_improvement_enabled(
        &mut self,
        id: ImprovementId,
        enabled: bool,
    ) -> Result<(), CharacterError> {
        if !self.improvements.set_enabled(id, enabled) {
            return Err(CharacterError::UnknownImprovement(id));
        }
        self.improvements_changed();
        Ok(())
    }

    /// Listens for every change to the improvement pool.
    #[must_use = "dropping the subscription immediately unregisters the listener"]
    pub fn subscribe_improvements(
        &self,
        listener: impl Fn(&ImprovementEvent) + 'static,
    ) -> Subscription {
        self.improvements.subscribe(listener)
    }

    // ===== attributes =====

    /// Adds an attribute with its metatype range. An existing attribute with
    /// the same abbreviation is replaced.
    pub fn add_attribute(&mut self, template: AttributeTemplate) {
        let attribute = Attribute::attach(&template, &self.improvements);
        match self.attribute_index(&template.abbrev) {
            Ok(index) => {
                tracing::debug!(attribute = %template.abbrev, "attribute replaced");
                self.attributes[index] = attribute;
            }
            Err(_) => self.attributes.push(attribute),
        }
        self.attributes_changed();
    }

    pub fn attribute(&self, abbrev: &str) -> Result<AttributeView<'_>, CharacterError> {
        let index = self.attribute_index(abbrev)?;
        Ok(AttributeView::new(self, &self.attributes[index]))
    }

    pub fn attributes(&self) -> impl Iterator<Item = AttributeView<'_>> {
        self.attributes
            .iter()
            .map(move |attribute| AttributeView::new(self, attribute))
    }

    /// Total value of `abbrev`, if the character has it.
    pub fn attribute_total(&self, abbrev: &str) -> Option<i32> {
        self.attribute(abbrev).ok().map(|view| view.total_value())
    }

    pub fn set_base(&mut self, abbrev: &str, base: i32) -> Result<(), CharacterError> {
        let index = self.attribute_index(abbrev)?;
        self.attributes[index].set_base(base.max(0));
        self.attributes_changed();
        Ok(())
    }

    pub fn set_attribute_karma(&mut self, abbrev: &str, karma: i32) -> Result<(), CharacterError> {
        let index = self.attribute_index(abbrev)?;
        self.attributes[index].set_karma(karma.max(0));
        self.attributes_changed();
        Ok(())
    }

    /// Temporary bonus applied on top of the natural value (e.g. a drug).
    pub fn set_augment_modifier(&mut self, abbrev: &str, modifier: i32) -> Result<(), CharacterError> {
        let index = self.attribute_index(abbrev)?;
        self.attributes[index].set_augment_modifier(modifier);
        self.attributes_changed();
        Ok(())
    }

    pub fn set_metatype_range(
        &mut self,
        abbrev: &str,
        minimum: i32,
        maximum: i32,
        augmented_maximum: i32,
    ) -> Result<(), CharacterError> {
        let index = self.attribute_index(abbrev)?;
        self.attributes[index].set_metatype_range(minimum, maximum, augmented_maximum);
        self.attributes_changed();
        Ok(())
    }

    /// Buys up to `amount` points with karma. Stops at the first point that
    /// cannot be afforded or would exceed the maximum; returns how many were
    /// bought.
    pub fn upgrade_attribute(&mut self, abbrev: &str, amount: u32) -> Result<u32, CharacterError> {
        let index = self.attribute_index(abbrev)?;
        let mut bought = 0;
        for _ in 0..amount {
            let view = AttributeView::new(self, &self.attributes[index]);
            if !view.can_upgrade_career() {
                break;
            }
            let price = view.upgrade_karma_cost();
            let value = view.value();

            let reason = format!("Attribute {abbrev} {value} -> {}", value + 1);
            self.expenses.record(
                price.saturating_neg(),
                reason,
                ExpenseKind::Karma,
                Some(ExpenseUndo::ImproveAttribute(abbrev.to_string())),
            );
            let karma = self.attributes[index].karma().saturating_add(1);
            self.attributes[index].set_karma(karma);
            self.karma = self.karma.saturating_sub(price);
            bought += 1;
            tracing::info!(attribute = abbrev, value = value + 1, price, "attribute upgraded");
        }
        if bought > 0 {
            self.attributes_changed();
        }
        Ok(bought)
    }

    /// Lowers the attribute up to `amount` times: karma levels first, then
    /// bought base, then (Edge only) the metatype minimum. Returns how many
    /// points were removed.
    pub fn degrade_attribute(&mut self, abbrev: &str, amount: u32) -> Result<u32, CharacterError> {
        let index = self.attribute_index(abbrev)?;
        let mut removed = 0;
        for _ in 0..amount {
            let attribute = &self.attributes[index];
            if attribute.karma() > 0 {
                let karma = attribute.karma() - 1;
                self.attributes[index].set_karma(karma);
            } else if attribute.base() > 0 {
                let base = attribute.base() - 1;
                self.attributes[index].set_base(base);
            } else if attribute.abbrev() == "EDG"
                && AttributeView::new(self, attribute).total_minimum() > 0
            {
                let (minimum, maximum, augmented_maximum) = (
                    attribute.raw_metatype_minimum().saturating_sub(1),
                    attribute.raw_metatype_maximum(),
                    attribute.metatype_augmented_maximum(),
                );
                self.attributes[index].set_metatype_range(minimum, maximum, augmented_maximum);
            } else {
                break;
            }
            removed += 1;
        }
        if removed > 0 {
            tracing::info!(attribute = abbrev, removed, "attribute degraded");
            self.attributes_changed();
        }
        Ok(removed)
    }

    #[must_use = "dropping the subscription immediately unregisters the listener"]
    pub fn subscribe_attribute(
        &self,
        abbrev: &str,
        listener: impl Fn(&AttributeProperty) + 'static,
    ) -> Result<Subscription, CharacterError> {
        let index = self.attribute_index(abbrev)?;
        Ok(self.attributes[index].subscribe(listener))
    }

    /// `ceil((2·STR + BOD + REA) / 3)`.
    pub fn physical_limit(&self) -> i32 {
        let total = |abbrev| self.attribute_total(abbrev).unwrap_or(0);
        let sum = total("STR")
            .saturating_mul(2)
            .saturating_add(total("BOD"))
            .saturating_add(total("REA"));
        (Decimal::from(sum) / Decimal::from(3))
            .ceil()
            .to_i32()
            .unwrap_or(0)
    }

    fn attribute_index(&self, abbrev: &str) -> Result<usize, CharacterError> {
        self.attributes
            .iter()
            .position(|attribute| attribute.abbrev() == abbrev)
            .ok_or_else(|| CharacterError::UnknownAttribute(abbrev.to_string()))
    }

    // ===== expenses =====

    pub fn expenses(&self) -> &ExpenseLedger {
        &self.expenses
    }

    /// Reverses a karma purchase: the point is removed and the karma refunded.
    pub fn undo_expense(&mut self, id: ExpenseId) -> Result<(), CharacterError> {
        let entry = self
            .expenses
            .get(id)
            .ok_or(CharacterError::UnknownExpense(id))?;
        let Some(ExpenseUndo::ImproveAttribute(abbrev)) = entry.undo.clone() else {
            return Err(CharacterError::NotUndoable(id));
        };
        self.attribute_index(&abbrev)?;

        let amount = entry.amount;
        self.expenses.remove(id);
        self.degrade_attribute(&abbrev, 1)?;
        self.karma = self.karma.saturating_sub(amount);
        tracing::info!(expense = %id, attribute = %abbrev, refund = amount.saturating_neg(), "expense undone");
        self.refresh_can_upgrade();
        Ok(())
    }

    // ===== weapons =====

    pub fn add_weapon(&mut self, template: WeaponTemplate) -> WeaponId {
        let weapon = self.create_weapon(template);
        let id = weapon.id();
        self.weapons.push(weapon);
        id
    }

    /// Mounts an underbarrel weapon under `parent`.
    pub fn add_underbarrel(
        &mut self,
        parent: WeaponId,
        template: WeaponTemplate,
    ) -> Result<WeaponId, CharacterError> {
        self.find_weapon(parent)?;
        let child = self.create_weapon(template);
        let id = child.id();
        self.find_weapon_mut(parent)?.add_underbarrel(child);
        Ok(id)
    }

    /// Removes a top-level weapon and its underbarrel weapons.
    pub fn remove_weapon(&mut self, id: WeaponId) -> Result<(), CharacterError> {
        let index = self
            .weapons
            .iter()
            .position(|weapon| weapon.id() == id)
            .ok_or(CharacterError::UnknownWeapon(id))?;
        self.weapons.remove(index);
        Ok(())
    }

    pub fn weapon(&self, id: WeaponId) -> Result<WeaponView<'_>, CharacterError> {
        Ok(WeaponView::new(self, self.find_weapon(id)?))
    }

    /// Top-level weapons.
    pub fn weapons(&self) -> impl Iterator<Item = WeaponView<'_>> {
        self.weapons
            .iter()
            .map(move |weapon| WeaponView::new(self, weapon))
    }

    pub fn add_accessory(
        &mut self,
        weapon: WeaponId,
        accessory: WeaponAccessory,
    ) -> Result<(), CharacterError> {
        self.find_weapon_mut(weapon)?.add_accessory(accessory);
        Ok(())
    }

    pub fn remove_accessory(
        &mut self,
        weapon: WeaponId,
        name: &str,
    ) -> Result<WeaponAccessory, CharacterError> {
        self.find_weapon_mut(weapon)?
            .remove_accessory(name)
            .ok_or_else(|| CharacterError::UnknownAccessory {
                weapon,
                name: name.to_string(),
            })
    }

    /// Loads (or with `None`, unloads) ammunition.
    pub fn load_ammo(&mut self, weapon: WeaponId, ammo: Option<AmmoBonus>) -> Result<(), CharacterError> {
        self.find_weapon_mut(weapon)?.load_ammo(ammo);
        Ok(())
    }

    pub fn set_weapon_discount(&mut self, weapon: WeaponId, discount: bool) -> Result<(), CharacterError> {
        self.find_weapon_mut(weapon)?.set_discount(discount);
        Ok(())
    }

    #[must_use = "dropping the subscription immediately unregisters the listener"]
    pub fn subscribe_weapon(
        &self,
        id: WeaponId,
        listener: impl Fn(&WeaponProperty) + 'static,
    ) -> Result<Subscription, CharacterError> {
        Ok(self.find_weapon(id)?.subscribe(listener))
    }

    fn create_weapon(&mut self, template: WeaponTemplate) -> Weapon {
        self.next_weapon_id += 1;
        Weapon::attach(WeaponId(self.next_weapon_id), template, &self.improvements)
    }

    fn find_weapon(&self, id: WeaponId) -> Result<&Weapon, CharacterError> {
        self.weapons
            .iter()
            .find_map(|weapon| weapon.find(id))
            .ok_or(CharacterError::UnknownWeapon(id))
    }

    fn find_weapon_mut(&mut self, id: WeaponId) -> Result<&mut Weapon, CharacterError> {
        self.weapons
            .iter_mut()
            .find_map(|weapon| weapon.find_mut(id))
            .ok_or(CharacterError::UnknownWeapon(id))
    }

    // ===== initiation =====

    pub fn initiation_grades(&self) -> &[InitiationGrade] {
        &self.grades
    }

    pub fn add_initiation_grade(&mut self, grade: InitiationGrade) {
        self.grades.push(grade);
    }

    /// Highest grade reached, 0 when uninitiated.
    pub fn initiate_grade(&self) -> i32 {
        self.grades.iter().map(|grade| grade.grade).max().unwrap_or(0)
    }

    pub fn initiation_karma_cost(&self) -> i32 {
        self.grades
            .iter()
            .map(|grade| grade.karma_cost(&self.config))
            .sum()
    }

    // ===== propagation =====

    fn improvements_changed(&self) {
        self.refresh_can_upgrade();
    }

    fn attributes_changed(&self) {
        self.announce_weapons(WeaponProperty::Attributes);
        self.refresh_can_upgrade();
    }

    fn announce_weapons(&self, property: WeaponProperty) {
        for weapon in &self.weapons {
            weapon.announce(property);
        }
    }

    /// Re-evaluates `CanUpgradeCareer` everywhere; only flips are announced.
    fn refresh_can_upgrade(&self) {
        for attribute in &self.attributes {
            let can_upgrade = AttributeView::new(self, attribute).can_upgrade_career();
            attribute.refresh_can_upgrade(can_upgrade);
        }
    }
}

/// `ABBR` resolves to the total value, `ABBRBase` to the total base.
impl VariableSource for Character {
    fn lookup(&self, name: &str) -> Option<Decimal> {
        self.attributes().find_map(|view| {
            if name == view.abbrev() {
                Some(Decimal::from(view.total_value()))
            } else if name == view.attribute().base_name() {
                Some(Decimal::from(view.total_base()))
            } else {
                None
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formula;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn character() -> Character {
        let mut character = Character::new(SheetConfig::default());
        character.add_attribute(AttributeTemplate::new("STR", 1, 6, 10));
        character.add_attribute(AttributeTemplate::new("EDG", 1, 7, 7));
        character
    }

    #[test]
    fn unknown_ids_are_validation_errors() {
        let mut character = character();
        let err = character.set_base("XYZ", 1).unwrap_err();
        assert_eq!(err, CharacterError::UnknownAttribute("XYZ".into()));
        assert_eq!(err.severity(), ErrorSeverity::Validation);
        assert!(character.weapon(WeaponId(42)).is_err());
        assert!(character.remove_improvement(ImprovementId(7)).is_err());
    }

    #[test]
    fn upgrade_spends_karma_and_records_expenses() {
        let mut character = character();
        character.set_base("STR", 2).unwrap();
        character.set_karma(100);

        // value 3: costs 4×5 then 5×5
        assert_eq!(character.upgrade_attribute("STR", 2).unwrap(), 2);
        assert_eq!(character.karma(), 55);
        assert_eq!(character.attribute("STR").unwrap().value(), 5);
        assert_eq!(character.expenses().len(), 2);
        assert_eq!(character.expenses().total(ExpenseKind::Karma), -45);
    }

    #[test]
    fn upgrade_stops_when_karma_runs_out() {
        let mut character = character();
        character.set_base("STR", 2).unwrap();
        character.set_karma(25);
        assert_eq!(character.upgrade_attribute("STR", 3).unwrap(), 1);
        assert_eq!(character.karma(), 5);
        assert!(!character.attribute("STR").unwrap().can_upgrade_career());
    }

    #[test]
    fn undo_refunds_and_degrades() {
        let mut character = character();
        character.set_karma(100);
        character.upgrade_attribute("STR", 1).unwrap();
        let id = character.expenses().entries()[0].id;

        character.undo_expense(id).unwrap();
        assert_eq!(character.karma(), 100);
        assert_eq!(character.attribute("STR").unwrap().karma(), 0);
        assert!(character.expenses().is_empty());
        assert_eq!(
            character.undo_expense(id),
            Err(CharacterError::UnknownExpense(id))
        );
    }

    #[test]
    fn edge_degrade_lowers_the_metatype_minimum() {
        let mut character = character();
        assert_eq!(character.degrade_attribute("STR", 1).unwrap(), 0);

        assert_eq!(character.degrade_attribute("EDG", 2).unwrap(), 1);
        let edge = character.attribute("EDG").unwrap();
        assert_eq!(edge.metatype_minimum(), 0);
        assert_eq!(edge.total_minimum(), 0);
    }

    #[test]
    fn karma_changes_announce_only_guard_flips() {
        let mut character = character();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let _sub = {
            let seen = Rc::clone(&seen);
            character
                .subscribe_attribute("STR", move |p| seen.borrow_mut().push(*p))
                .unwrap()
        };

        character.set_karma(100);
        assert_eq!(*seen.borrow(), vec![AttributeProperty::CanUpgradeCareer]);
        character.set_karma(90);
        assert_eq!(seen.borrow().len(), 1);
    }

    #[test]
    fn character_resolves_formula_variables() {
        let mut character = character();
        character.set_base("STR", 3).unwrap();
        assert_eq!(
            formula::evaluate("STR + {STRBase} * 2", &character),
            Ok(Decimal::from(12))
        );
        assert!(formula::evaluate("AGI", &character).is_err());
    }

    #[test]
    fn phase_change_flips_conditional_improvements() {
        let mut character = character();
        character.add_improvement(
            Improvement::attribute("STR", 2).with_condition(crate::improvement::Condition::Career),
        );
        assert_eq!(character.attribute("STR").unwrap().total_value(), 1);
        character.set_phase(SessionPhase::Career);
        assert_eq!(character.attribute("STR").unwrap().total_value(), 3);
    }

    #[test]
    fn initiation_costs_sum() {
        let mut character = character();
        character.add_initiation_grade(InitiationGrade::new(1));
        character.add_initiation_grade(InitiationGrade::new(2).with_group());
        assert_eq!(character.initiate_grade(), 2);
        // 13 + ceil(16 × 0.9)
        assert_eq!(character.initiation_karma_cost(), 13 + 15);
    }
}
