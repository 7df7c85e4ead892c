//! Character attributes (STR, AGI, ..., EDG, MAG, RES).
//!
//! An [`Attribute`] owns only its purchased state (`base`, `karma`) and the
//! metatype range it was created with. Every derived number is read through an
//! [`AttributeView`], which borrows the owning [`Character`](crate::Character)
//! for improvements, options and session phase.
//!
//! # Change propagation
//!
//! Mutations announce the changed property and its fan-out from
//! [`ATTRIBUTE_GRAPH`]. Each attribute also subscribes to the character's
//! improvement store; the subscription lives exactly as long as the attribute.

mod view;

pub use view::AttributeView;

use std::cell::Cell;
use std::rc::Rc;
use std::sync::LazyLock;

use crate::cache::DerivedCache;
use crate::improvement::{ImprovementEvent, ImprovementKind, ImprovementStore};
use crate::notify::{self, DependencyGraph, Notifier, Subscription};

/// Attributes whose floor is 0 and whose augmented maximum gets no +4.
pub const SPECIAL_ATTRIBUTES: [&str; 5] = ["EDG", "MAG", "MAGAdept", "RES", "DEP"];

/// Rules grouping of an attribute.
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
pub enum AttributeCategory {
    #[default]
    Standard,
    /// Edge, Essence, Magic, Resonance, Depth.
    Special,
    /// Attributes of a shapeshifter's alternate form.
    Shapeshifter,
}

impl AttributeCategory {
    pub fn for_abbrev(abbrev: &str) -> Self {
        match abbrev {
            "DEP" | "EDG" | "ESS" | "MAG" | "MAGAdept" | "RES" => Self::Special,
            _ => Self::Standard,
        }
    }
}

/// Observable attribute properties, announced by name to listeners.
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
    strum::EnumIter,
)]
pub enum AttributeProperty {
    AttributeModifiers,
    AugmentModifier,
    Base,
    Karma,
    Value,
    TotalValue,
    Augmented,
    DisplayValue,
    ToolTip,
    TotalMinimum,
    TotalMaximum,
    TotalAugmentedMaximum,
    AugmentedMetatypeLimits,
    UpgradeKarmaCost,
    TotalKarmaCost,
    CanUpgradeCareer,
}

/// Which properties must be re-announced when a property changes.
pub static ATTRIBUTE_GRAPH: LazyLock<DependencyGraph<AttributeProperty>> = LazyLock::new(|| {
    use AttributeProperty::*;
    DependencyGraph::new(&[
        (AttributeModifiers, &[TotalValue]),
        (Karma, &[Value, TotalKarmaCost]),
        (Base, &[Value]),
        (Value, &[TotalValue, UpgradeKarmaCost]),
        (TotalMinimum, &[AugmentedMetatypeLimits]),
        (TotalMaximum, &[AugmentedMetatypeLimits]),
        (TotalAugmentedMaximum, &[AugmentedMetatypeLimits]),
        (AugmentedMetatypeLimits, &[TotalValue]),
        (TotalValue, &[Augmented]),
        (AugmentModifier, &[Augmented]),
        (Augmented, &[DisplayValue]),
        (DisplayValue, &[ToolTip]),
        (UpgradeKarmaCost, &[CanUpgradeCareer]),
    ])
});

/// Memoized aggregator results.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(crate) enum ModifierSlot {
    /// Bonuses on `ABBR` (do not raise karma costs).
    Modifiers,
    /// Bonuses on `ABBRBase` (raise the value and its karma cost).
    ValueModifiers,
}

// ============================================================================
// Template
// ============================================================================

/// Metatype range for one attribute, as read from rule data.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AttributeTemplate {
    pub abbrev: String,
    pub minimum: i32,
    pub maximum: i32,
    pub augmented_maximum: i32,
    #[cfg_attr(feature = "serde", serde(default))]
    pub category: Option<AttributeCategory>,
}

impl AttributeTemplate {
    pub fn new(abbrev: impl Into<String>, minimum: i32, maximum: i32, augmented_maximum: i32) -> Self {
        Self {
            abbrev: abbrev.into(),
            minimum,
            maximum,
            augmented_maximum,
            category: None,
        }
    }
}

// ============================================================================
// Entity
// ============================================================================

/// Purchased state of one attribute.
#[derive(Debug)]
pub struct Attribute {
    abbrev: String,
    /// `ABBRBase`, the target of value-raising bonuses.
    base_name: String,
    category: AttributeCategory,
    metatype_minimum: i32,
    metatype_maximum: i32,
    metatype_augmented_maximum: i32,
    base: i32,
    karma: i32,
    augment_modifier: i32,
    cache: Rc<DerivedCache<ModifierSlot>>,
    notifier: Notifier<AttributeProperty>,
    /// Last announced `CanUpgradeCareer`, so karma changes only re-announce flips.
    can_upgrade: Cell<bool>,
    _improvements: Subscription,
}

impl Attribute {
    /// Creates the attribute and subscribes it to `store`.
    pub(crate) fn attach(template: &AttributeTemplate, store: &ImprovementStore) -> Self {
        let cache: Rc<DerivedCache<ModifierSlot>> = Rc::default();
        let notifier = Notifier::new();

        let subscription = {
            let abbrev = template.abbrev.clone();
            let cache = Rc::clone(&cache);
            let notifier = notifier.clone();
            store.subscribe(move |event| {
                let changed = affected_properties(&abbrev, event);
                if changed.is_empty() {
                    return;
                }
                tracing::debug!(attribute = %abbrev, ?changed, "improvements changed");
                cache.invalidate_all();
                notify::announce_all(&ATTRIBUTE_GRAPH, &notifier, changed);
            })
        };

        Self {
            abbrev: template.abbrev.clone(),
            base_name: format!("{}Base", template.abbrev),
            category: template
                .category
                .unwrap_or_else(|| AttributeCategory::for_abbrev(&template.abbrev)),
            metatype_minimum: template.minimum,
            metatype_maximum: template.maximum,
            metatype_augmented_maximum: template.augmented_maximum,
            base: 0,
            karma: 0,
            augment_modifier: 0,
            cache,
            notifier,
            can_upgrade: Cell::new(false),
            _improvements: subscription,
        }
    }

    pub fn abbrev(&self) -> &str {
        &self.abbrev
    }

    pub fn base_name(&self) -> &str {
        &self.base_name
    }

    pub fn category(&self) -> AttributeCategory {
        self.category
    }

    /// EDG, MAG, MAGAdept, RES or DEP.
    pub fn is_special(&self) -> bool {
        SPECIAL_ATTRIBUTES.contains(&self.abbrev.as_str())
    }

    pub fn base(&self) -> i32 {
        self.base
    }

    pub fn karma(&self) -> i32 {
        self.karma
    }

    pub fn augment_modifier(&self) -> i32 {
        self.augment_modifier
    }

    /// Metatype minimum before `ReplaceAttribute` overrides.
    pub fn raw_metatype_minimum(&self) -> i32 {
        self.metatype_minimum
    }

    /// Metatype maximum before `ReplaceAttribute` overrides.
    pub fn raw_metatype_maximum(&self) -> i32 {
        self.metatype_maximum
    }

    pub fn metatype_augmented_maximum(&self) -> i32 {
        self.metatype_augmented_maximum
    }

    /// Listens for property changes until the subscription is dropped.
    #[must_use = "dropping the subscription immediately unregisters the listener"]
    pub fn subscribe(&self, listener: impl Fn(&AttributeProperty) + 'static) -> Subscription {
        self.notifier.subscribe(listener)
    }

    // ===== mutation (through `Character`) =====

    pub(crate) fn set_base(&mut self, base: i32) {
        if self.base != base {
            self.base = base;
            self.announce(AttributeProperty::Base);
        }
    }

    pub(crate) fn set_karma(&mut self, karma: i32) {
        if self.karma != karma {
            self.karma = karma;
            self.announce(AttributeProperty::Karma);
        }
    }

    pub(crate) fn set_augment_modifier(&mut self, augment_modifier: i32) {
        if self.augment_modifier != augment_modifier {
            self.augment_modifier = augment_modifier;
            self.announce(AttributeProperty::AugmentModifier);
        }
    }

    pub(crate) fn set_metatype_range(&mut self, minimum: i32, maximum: i32, augmented_maximum: i32) {
        let mut changed = Vec::new();
        if self.metatype_minimum != minimum {
            self.metatype_minimum = minimum;
            changed.push(AttributeProperty::TotalMinimum);
        }
        if self.metatype_maximum != maximum {
            self.metatype_maximum = maximum;
            changed.push(AttributeProperty::TotalMaximum);
        }
        if self.metatype_augmented_maximum != augmented_maximum {
            self.metatype_augmented_maximum = augmented_maximum;
            changed.push(AttributeProperty::TotalAugmentedMaximum);
        }
        if !changed.is_empty() {
            notify::announce_all(&ATTRIBUTE_GRAPH, &self.notifier, changed);
        }
    }

    /// Drops memoized modifiers (e.g. after a session phase change).
    pub(crate) fn invalidate_modifiers(&self) {
        self.cache.invalidate_all();
        self.announce(AttributeProperty::AttributeModifiers);
    }

    /// Re-announces `CanUpgradeCareer` if it differs from the last announced
    /// state.
    pub(crate) fn refresh_can_upgrade(&self, can_upgrade: bool) {
        if self.can_upgrade.replace(can_upgrade) != can_upgrade {
            self.announce(AttributeProperty::CanUpgradeCareer);
        }
    }

    pub(crate) fn announce(&self, property: AttributeProperty) {
        notify::announce(&ATTRIBUTE_GRAPH, &self.notifier, property);
    }

    pub(crate) fn cache(&self) -> &DerivedCache<ModifierSlot> {
        &self.cache
    }
}

/// Properties of `abbrev` invalidated by a store change.
fn affected_properties(abbrev: &str, event: &ImprovementEvent) -> Vec<AttributeProperty> {
    let mut changed = Vec::new();
    let mut push = |property| {
        if !changed.contains(&property) {
            changed.push(property);
        }
    };

    for imp in &event.changed {
        let targets_self = crate::improvement::is_attribute_target(&imp.improved_name, abbrev);
        match imp.kind {
            ImprovementKind::Attribute if targets_self => {
                push(AttributeProperty::AttributeModifiers);
                if imp.minimum != 0 {
                    push(AttributeProperty::TotalMinimum);
                }
                if imp.maximum != 0 {
                    push(AttributeProperty::TotalMaximum);
                }
                if imp.augmented_maximum != 0 {
                    push(AttributeProperty::TotalAugmentedMaximum);
                }
            }
            ImprovementKind::ReplaceAttribute if imp.improved_name == abbrev => {
                push(AttributeProperty::TotalMinimum);
                push(AttributeProperty::TotalMaximum);
            }
            ImprovementKind::AttributeLevel if imp.improved_name == abbrev => {
                push(AttributeProperty::Base);
            }
            ImprovementKind::AttributeKarmaCost | ImprovementKind::AttributeKarmaCostMultiplier
                if imp.improved_name.is_empty() || imp.improved_name == abbrev =>
            {
                push(AttributeProperty::UpgradeKarmaCost);
                push(AttributeProperty::TotalKarmaCost);
            }
            _ => {}
        }
    }
    changed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::improvement::Improvement;

    #[test]
    fn karma_change_reaches_tooltip() {
        let reached = ATTRIBUTE_GRAPH.propagate(AttributeProperty::Karma);
        assert_eq!(reached[0], AttributeProperty::Karma);
        for property in [
            AttributeProperty::Value,
            AttributeProperty::TotalValue,
            AttributeProperty::Augmented,
            AttributeProperty::DisplayValue,
            AttributeProperty::ToolTip,
            AttributeProperty::UpgradeKarmaCost,
            AttributeProperty::CanUpgradeCareer,
            AttributeProperty::TotalKarmaCost,
        ] {
            assert!(reached.contains(&property), "{property} not reached");
        }
        assert!(!reached.contains(&AttributeProperty::TotalMinimum));
    }

    #[test]
    fn properties_display_by_name() {
        assert_eq!(AttributeProperty::ToolTip.to_string(), "ToolTip");
        assert_eq!(
            "CanUpgradeCareer".parse::<AttributeProperty>().unwrap(),
            AttributeProperty::CanUpgradeCareer
        );
    }

    #[test]
    fn store_changes_map_to_properties() {
        let event = ImprovementEvent {
            changed: vec![
                Improvement::attribute("STRBase", 1).with_range(0, 1, 0),
                Improvement::new(ImprovementKind::AttributeLevel, "STR").with_value(1),
                Improvement::attribute("AGI", 3),
            ],
        };
        assert_eq!(
            affected_properties("STR", &event),
            vec![
                AttributeProperty::AttributeModifiers,
                AttributeProperty::TotalMaximum,
                AttributeProperty::Base,
            ]
        );
        assert!(affected_properties("BOD", &event).is_empty());
    }

    #[test]
    fn category_from_abbrev() {
        assert_eq!(AttributeCategory::for_abbrev("MAGAdept"), AttributeCategory::Special);
        assert_eq!(AttributeCategory::for_abbrev("BOD"), AttributeCategory::Standard);
    }
}
