//! Weapons: catalog templates, installed accessories, loaded ammunition and
//! underbarrel children.
//!
//! Derived numbers (damage, AP, accuracy, cost, availability, ...) are read
//! through a [`WeaponView`] borrowing the owning character, the same way
//! attributes are.

mod damage;
mod view;

pub use damage::{
    AvailSuffix, AvailabilityValue, DAMAGE_EITHER, DAMAGE_PHYSICAL, DAMAGE_STUN, DamageCode,
    DamageParts,
};
pub use view::WeaponView;

use core::fmt;
use std::sync::LazyLock;

use crate::improvement::ImprovementStore;
use crate::notify::{self, DependencyGraph, Notifier, Subscription};

/// Character-scoped weapon identifier.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WeaponId(pub u32);

impl fmt::Display for WeaponId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "weapon#{}", self.0)
    }
}

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
pub enum WeaponType {
    Melee,
    #[default]
    Ranged,
}

/// Observable weapon properties.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
)]
pub enum WeaponProperty {
    /// An attribute of the wielder changed.
    Attributes,
    /// The improvement pool changed.
    Improvements,
    Accessories,
    AmmoLoaded,
    DiscountCost,
    TotalDamage,
    DisplayDamage,
    TotalAp,
    TotalAccuracy,
    TotalConcealability,
    TotalReach,
    TotalCost,
    TotalAvail,
}

pub static WEAPON_GRAPH: LazyLock<DependencyGraph<WeaponProperty>> = LazyLock::new(|| {
    use WeaponProperty::*;
    DependencyGraph::new(&[
        (
            Attributes,
            &[TotalDamage, TotalAccuracy, TotalAp, TotalCost, TotalAvail],
        ),
        (
            Improvements,
            &[
                TotalDamage,
                TotalAccuracy,
                TotalAp,
                TotalConcealability,
                TotalReach,
            ],
        ),
        (
            Accessories,
            &[
                TotalDamage,
                TotalAp,
                TotalAccuracy,
                TotalConcealability,
                TotalCost,
                TotalAvail,
            ],
        ),
        (AmmoLoaded, &[TotalDamage, TotalAp]),
        (DiscountCost, &[TotalCost]),
        (TotalDamage, &[DisplayDamage]),
    ])
});

// ============================================================================
// Templates
// ============================================================================

/// Catalog entry. String fields hold formulas over attribute abbreviations.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct WeaponTemplate {
    pub name: String,
    pub category: String,
    pub weapon_type: WeaponType,
    /// Skill override, e.g. `"Throwing Weapons"`.
    pub use_skill: String,
    /// Damage code, e.g. `"(STR+2)P"`.
    pub damage: String,
    /// Armor penetration, e.g. `"-2"`, `"-"`, `"-half"`.
    pub ap: String,
    /// Accuracy, e.g. `"Physical"`, `"5"`.
    pub accuracy: String,
    pub rc: String,
    pub concealability: i32,
    /// Availability, e.g. `"12F"`, `"+2R"`.
    pub avail: String,
    /// Cost formula in nuyen.
    pub cost: String,
    pub reach: i32,
    /// Built into cyberware; its cost is paid through the parent item.
    pub cyberware: bool,
    /// 10% discount.
    pub discount_cost: bool,
}

impl WeaponTemplate {
    pub fn new(name: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            category: category.into(),
            ..Self::default()
        }
    }

    pub fn is_throwing(&self) -> bool {
        self.category == THROWING_WEAPONS || self.use_skill == THROWING_WEAPONS
    }
}

pub const THROWING_WEAPONS: &str = "Throwing Weapons";
pub const UNARMED_ATTACK: &str = "Unarmed Attack";
pub const UNARMED_SMASHING_BLOW: &str = "Unarmed Attack (Smashing Blow)";
pub const UNARMED_COMBAT: &str = "Unarmed Combat";

/// Installed weapon modification.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct WeaponAccessory {
    pub name: String,
    pub installed: bool,
    /// Added to the damage expression.
    pub damage: String,
    /// Replaces the damage expression.
    pub damage_replacement: String,
    /// Replaces the damage type, e.g. `"S(e)"`.
    pub damage_type: String,
    pub ap: i32,
    pub ap_replacement: String,
    pub accuracy: i32,
    pub concealability: i32,
    /// Cost formula; `WeaponCost` resolves to the weapon's own cost.
    pub cost: String,
    pub avail: String,
    /// Part of the weapon's catalog entry, so already priced in.
    pub included_in_weapon: bool,
}

impl Default for WeaponAccessory {
    fn default() -> Self {
        Self {
            name: String::new(),
            installed: true,
            damage: String::new(),
            damage_replacement: String::new(),
            damage_type: String::new(),
            ap: 0,
            ap_replacement: String::new(),
            accuracy: 0,
            concealability: 0,
            cost: String::new(),
            avail: String::new(),
            included_in_weapon: false,
        }
    }
}

impl WeaponAccessory {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

/// Damage/AP bonus of the loaded ammunition.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct AmmoBonus {
    pub name: String,
    pub damage: String,
    pub damage_replacement: String,
    pub damage_type: String,
    pub ap: i32,
    pub ap_replacement: String,
}

impl AmmoBonus {
    /// Flechette ammunition has no effect on weapons already firing flechettes.
    pub(crate) fn is_flechette(&self) -> bool {
        self.damage_type.contains("(f)")
            || self.damage.contains("(f)")
            || self.damage_replacement.contains("(f)")
    }
}

// ============================================================================
// Entity
// ============================================================================

/// A weapon carried by the character.
#[derive(Debug)]
pub struct Weapon {
    id: WeaponId,
    template: WeaponTemplate,
    accessories: Vec<WeaponAccessory>,
    ammo: Option<AmmoBonus>,
    underbarrel: Vec<Weapon>,
    notifier: Notifier<WeaponProperty>,
    _improvements: Subscription,
}

impl Weapon {
    pub(crate) fn attach(id: WeaponId, template: WeaponTemplate, store: &ImprovementStore) -> Self {
        let notifier = Notifier::new();
        let subscription = {
            let notifier = notifier.clone();
            store.subscribe(move |_event| {
                notify::announce_all(
                    &WEAPON_GRAPH,
                    &notifier,
                    [WeaponProperty::Improvements, WeaponProperty::Attributes],
                );
            })
        };
        Self {
            id,
            template,
            accessories: Vec::new(),
            ammo: None,
            underbarrel: Vec::new(),
            notifier,
            _improvements: subscription,
        }
    }

    pub fn id(&self) -> WeaponId {
        self.id
    }

    pub fn template(&self) -> &WeaponTemplate {
        &self.template
    }

    pub fn name(&self) -> &str {
        &self.template.name
    }

    pub fn accessories(&self) -> &[WeaponAccessory] {
        &self.accessories
    }

    pub fn installed_accessories(&self) -> impl Iterator<Item = &WeaponAccessory> {
        self.accessories.iter().filter(|acc| acc.installed)
    }

    pub fn ammo(&self) -> Option<&AmmoBonus> {
        self.ammo.as_ref()
    }

    pub fn underbarrel(&self) -> &[Weapon] {
        &self.underbarrel
    }

    /// Finds this weapon or a nested underbarrel weapon by id.
    pub fn find(&self, id: WeaponId) -> Option<&Weapon> {
        if self.id == id {
            return Some(self);
        }
        self.underbarrel.iter().find_map(|child| child.find(id))
    }

    pub(crate) fn find_mut(&mut self, id: WeaponId) -> Option<&mut Weapon> {
        if self.id == id {
            return Some(self);
        }
        self.underbarrel
            .iter_mut()
            .find_map(|child| child.find_mut(id))
    }

    #[must_use = "dropping the subscription immediately unregisters the listener"]
    pub fn subscribe(&self, listener: impl Fn(&WeaponProperty) + 'static) -> Subscription {
        self.notifier.subscribe(listener)
    }

    // ===== mutation (through `Character`) =====

    pub(crate) fn add_accessory(&mut self, accessory: WeaponAccessory) {
        self.accessories.push(accessory);
        self.announce(WeaponProperty::Accessories);
    }

    pub(crate) fn remove_accessory(&mut self, name: &str) -> Option<WeaponAccessory> {
        let index = self.accessories.iter().position(|acc| acc.name == name)?;
        let removed = self.accessories.remove(index);
        self.announce(WeaponProperty::Accessories);
        Some(removed)
    }

    pub(crate) fn load_ammo(&mut self, ammo: Option<AmmoBonus>) {
        if self.ammo != ammo {
            self.ammo = ammo;
            self.announce(WeaponProperty::AmmoLoaded);
        }
    }

    pub(crate) fn set_discount(&mut self, discount: bool) {
        if self.template.discount_cost != discount {
            self.template.discount_cost = discount;
            self.announce(WeaponProperty::DiscountCost);
        }
    }

    pub(crate) fn add_underbarrel(&mut self, child: Weapon) {
        self.underbarrel.push(child);
        self.announce(WeaponProperty::Accessories);
    }

    /// Announces `property` here and in every underbarrel weapon.
    pub(crate) fn announce(&self, property: WeaponProperty) {
        notify::announce(&WEAPON_GRAPH, &self.notifier, property);
        for child in &self.underbarrel {
            child.announce(property);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn ammo_change_reaches_display_damage() {
        assert_eq!(
            WEAPON_GRAPH.propagate(WeaponProperty::AmmoLoaded),
            vec![
                WeaponProperty::AmmoLoaded,
                WeaponProperty::TotalDamage,
                WeaponProperty::TotalAp,
                WeaponProperty::DisplayDamage,
            ]
        );
    }

    #[test]
    fn store_changes_are_announced_until_weapon_drops() {
        let mut store = ImprovementStore::new();
        let weapon = Weapon::attach(WeaponId(1), WeaponTemplate::new("Knife", "Blades"), &store);
        let seen: Rc<RefCell<Vec<WeaponProperty>>> = Rc::default();
        let _sub = {
            let seen = Rc::clone(&seen);
            weapon.subscribe(move |p| seen.borrow_mut().push(*p))
        };

        store.add(crate::Improvement::new(crate::ImprovementKind::Reach, "").with_value(1));
        assert!(seen.borrow().contains(&WeaponProperty::TotalReach));
        assert!(seen.borrow().contains(&WeaponProperty::DisplayDamage));

        drop(weapon);
        seen.borrow_mut().clear();
        store.add(crate::Improvement::new(crate::ImprovementKind::Reach, "").with_value(1));
        assert!(seen.borrow().is_empty());
    }
}
