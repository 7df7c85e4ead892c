//! End-to-end character scenarios.
//!
//! These tests drive a [`Character`] only through its public API: buying
//! attributes, stacking improvements, reading weapons and listening for
//! property changes.

use std::cell::RefCell;
use std::rc::Rc;

use sheet_core::{
    AttributeProperty, AttributeTemplate, Character, Improvement, ImprovementKind,
    ImprovementSource, SessionPhase, SheetConfig, WeaponAccessory, WeaponProperty, WeaponTemplate,
    WeaponType,
};

fn human() -> Character {
    let mut character = Character::new(SheetConfig::default());
    for abbrev in ["BOD", "AGI", "REA", "STR", "CHA", "INT", "LOG", "WIL"] {
        character.add_attribute(AttributeTemplate::new(abbrev, 1, 6, 10));
    }
    character.add_attribute(AttributeTemplate::new("EDG", 2, 7, 7));
    character
}

fn recorder<P: Copy + 'static>() -> (Rc<RefCell<Vec<P>>>, impl Fn(&P) + 'static) {
    let seen: Rc<RefCell<Vec<P>>> = Rc::default();
    let sink = Rc::clone(&seen);
    (seen, move |p: &P| sink.borrow_mut().push(*p))
}

#[test]
fn base_two_gives_value_three() {
    let mut character = human();
    character.set_base("STR", 2).expect("STR exists");

    let strength = character.attribute("STR").expect("STR exists");
    assert_eq!(strength.value(), 3);
    assert_eq!(strength.total_value(), 3);
    assert_eq!(strength.total_maximum(), 6);
    assert_eq!(strength.total_augmented_maximum(), 10);
    assert_eq!(strength.display_value(), "3");
    assert_eq!(strength.augmented_metatype_limits(), "1 / 6 (10)");
}

#[test]
fn improvements_stack_by_group() {
    let mut character = human();
    character.add_improvements([
        Improvement::attribute("STR", 1).with_source(ImprovementSource::Cyberware, "Muscle Replacement"),
        Improvement::attribute("STR", 2)
            .with_unique_name("strength-spell")
            .with_source(ImprovementSource::Spell, "Increase Strength"),
        Improvement::attribute("STR", 3)
            .with_unique_name("strength-spell")
            .with_source(ImprovementSource::Spell, "Increase Strength"),
    ]);

    let strength = character.attribute("STR").expect("STR exists");
    assert_eq!(strength.attribute_modifiers(), 4);
    assert_eq!(strength.total_value(), 5);
    assert_eq!(strength.display_value(), "1 (5)");
    assert_eq!(
        strength.tooltip(),
        "STR (1) + Muscle Replacement (1) + Increase Strength (3)"
    );
}

#[test]
fn override_group_beats_smaller_ungrouped_sum() {
    let mut character = human();
    character.add_improvements([
        Improvement::attribute("AGI", 1),
        Improvement::attribute("AGI", 3).with_unique_name("precedence0"),
        Improvement::attribute("AGI", 2).with_unique_name("precedence0"),
    ]);
    assert_eq!(character.attribute("AGI").expect("AGI").attribute_modifiers(), 3);
}

#[test]
fn total_value_is_capped_by_augmented_maximum() {
    let mut character = human();
    character.set_base("BOD", 5).expect("BOD");
    character.add_improvement(Improvement::attribute("BOD", 9));
    assert_eq!(character.attribute("BOD").expect("BOD").total_value(), 10);
}

#[test]
fn upgrade_then_degrade_round_trips() {
    let mut character = human();
    character.set_base("WIL", 1).expect("WIL");
    character.set_karma(200);

    let before = {
        let will = character.attribute("WIL").expect("WIL");
        (will.base(), will.karma())
    };
    assert_eq!(character.upgrade_attribute("WIL", 3).expect("WIL"), 3);
    assert_eq!(character.attribute("WIL").expect("WIL").value(), 5);
    assert_eq!(character.degrade_attribute("WIL", 3).expect("WIL"), 3);

    let will = character.attribute("WIL").expect("WIL");
    assert_eq!((will.base(), will.karma()), before);
}

#[test]
fn upgrade_refuses_at_maximum() {
    let mut character = human();
    character.set_base("LOG", 5).expect("LOG");
    character.set_karma(1_000);
    let logic = character.attribute("LOG").expect("LOG");
    assert_eq!(logic.upgrade_karma_cost(), -1);
    assert!(!logic.can_upgrade_career());
    assert_eq!(character.upgrade_attribute("LOG", 1).expect("LOG"), 0);
    assert_eq!(character.karma(), 1_000);
}

#[test]
fn karma_cost_improvements_apply_in_career() {
    let mut character = human();
    character.set_base("CHA", 2).expect("CHA");
    character.add_improvement(
        Improvement::new(ImprovementKind::AttributeKarmaCostMultiplier, "CHA")
            .with_value(50)
            .with_condition(sheet_core::Condition::Career),
    );
    assert_eq!(character.attribute("CHA").expect("CHA").upgrade_karma_cost(), 20);

    character.set_phase(SessionPhase::Career);
    assert_eq!(character.attribute("CHA").expect("CHA").upgrade_karma_cost(), 10);
}

#[test]
fn attribute_listeners_hear_derived_properties_until_dropped() {
    let mut character = human();
    let (seen, listener) = recorder::<AttributeProperty>();
    let subscription = character
        .subscribe_attribute("STR", listener)
        .expect("STR exists");

    character.set_base("STR", 3).expect("STR");
    for property in [
        AttributeProperty::Base,
        AttributeProperty::Value,
        AttributeProperty::TotalValue,
        AttributeProperty::Augmented,
        AttributeProperty::DisplayValue,
        AttributeProperty::ToolTip,
    ] {
        assert!(seen.borrow().contains(&property), "{property} not announced");
    }

    drop(subscription);
    seen.borrow_mut().clear();
    character.set_base("STR", 4).expect("STR");
    assert!(seen.borrow().is_empty());
}

#[test]
fn weapon_damage_follows_strength() {
    let mut character = human();
    character.set_base("STR", 4).expect("STR");
    let knife = character.add_weapon(WeaponTemplate {
        weapon_type: WeaponType::Melee,
        damage: "(STR+2)P".into(),
        ap: "-1".into(),
        accuracy: "Physical".into(),
        avail: "4".into(),
        cost: "300".into(),
        ..WeaponTemplate::new("Combat Knife", "Blades")
    });

    let view = character.weapon(knife).expect("knife");
    assert_eq!(view.display_damage(), "7P");
    assert_eq!(view.total_ap(), "-1");

    let (seen, listener) = recorder::<WeaponProperty>();
    let _subscription = character.subscribe_weapon(knife, listener).expect("knife");
    character.add_improvement(Improvement::attribute("STR", 2));

    assert!(seen.borrow().contains(&WeaponProperty::DisplayDamage));
    assert_eq!(character.weapon(knife).expect("knife").display_damage(), "9P");
}

#[test]
fn removing_gear_removes_its_improvements() {
    let mut character = human();
    character.add_improvements([
        Improvement::attribute("REA", 1).with_source(ImprovementSource::Cyberware, "Wired Reflexes"),
        Improvement::attribute("REA", 1).with_source(ImprovementSource::Cyberware, "Wired Reflexes"),
    ]);
    assert_eq!(character.attribute("REA").expect("REA").total_value(), 3);

    let removed = character.remove_improvements_from(ImprovementSource::Cyberware, "Wired Reflexes");
    assert_eq!(removed.len(), 2);
    assert_eq!(character.attribute("REA").expect("REA").total_value(), 1);
}

#[test]
fn accessories_change_cost_and_concealability() {
    let mut character = human();
    let pistol = character.add_weapon(WeaponTemplate {
        damage: "8P".into(),
        cost: "725".into(),
        concealability: 0,
        ..WeaponTemplate::new("Ares Predator V", "Heavy Pistols")
    });
    character
        .add_accessory(
            pistol,
            WeaponAccessory {
                cost: "500".into(),
                concealability: 1,
                ..WeaponAccessory::new("Silencer")
            },
        )
        .expect("pistol");

    let view = character.weapon(pistol).expect("pistol");
    assert_eq!(view.total_cost(), rust_decimal::Decimal::from(1_225));
    assert_eq!(view.display_concealability(), "+1");

    character.remove_accessory(pistol, "Silencer").expect("installed");
    assert_eq!(
        character.weapon(pistol).expect("pistol").display_concealability(),
        "+0"
    );
}

#[test]
fn huge_karma_purchase_saturates_cost() {
    let mut character = human();
    character.set_attribute_karma("STR", 50_000).expect("STR");

    let strength = character.attribute("STR").expect("STR");
    assert_eq!(strength.karma(), 50_000);
    assert_eq!(strength.total_karma_cost(), i32::MAX);
}

#[test]
fn extreme_range_improvement_saturates_limits() {
    let mut character = human();
    character.add_improvement(
        Improvement::attribute("STR", 0)
            .with_range(0, i32::MAX, 0)
            .with_rating(2),
    );

    let strength = character.attribute("STR").expect("STR");
    assert_eq!(strength.maximum_modifiers(), i32::MAX);
    assert_eq!(strength.total_maximum(), i32::MAX);
    assert_eq!(strength.total_value(), 1);
}
