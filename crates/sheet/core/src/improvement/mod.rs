//! Improvements - sourced modifiers that feed every derived value.
//!
//! An [`Improvement`] is a single bonus, penalty or override attached to a
//! character by a quality, a piece of cyberware, a spell, a power or the user.
//! Improvements live in the [`ImprovementStore`] and are collapsed into one
//! number per (target, kind) by the [`aggregate`] module.
//!
//! ```text
//! [ ImprovementStore ] --query--> [ aggregate() ] --> i32 contribution
//!          │
//!          └── ImprovementEvent --> subscribed entities (cache invalidation)
//! ```

pub mod aggregate;
pub mod store;

pub use aggregate::{
    Explanation, ImprovementQuery, Magnitude, PRECEDENCE_ADDITIVE, PRECEDENCE_OVERRIDE,
    PRECEDENCE_STACKED, TOOLTIP_EXCLUDED_GROUP, TargetMatch, aggregate, aggregate_explained,
    value_of,
};
pub use store::{ImprovementEvent, ImprovementStore};

use core::fmt;

/// Identifier assigned by the [`ImprovementStore`] when a record is added.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ImprovementId(pub u32);

impl fmt::Display for ImprovementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "imp#{}", self.0)
    }
}

/// What an improvement modifies.
///
/// The set is open-ended in the rules; only the kinds the engine reads are
/// listed here.
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
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[strum(ascii_case_insensitive)]
pub enum ImprovementKind {
    /// Attribute bonus (`augmented`) and range modifiers (`minimum`,
    /// `maximum`, `augmented_maximum`). Targets `ABBR` or `ABBRBase`.
    Attribute,
    /// Free attribute levels that do not cost points.
    AttributeLevel,
    /// Flat change to the priority-point cost per level in a window.
    AttributePointCost,
    /// Percentage multiplier on priority-point costs.
    AttributePointCostMultiplier,
    /// Flat change to the karma cost per level in a window.
    AttributeKarmaCost,
    /// Percentage multiplier on karma costs.
    AttributeKarmaCostMultiplier,
    /// Replaces the metatype minimum and maximum of an attribute.
    ReplaceAttribute,
    /// Damage value bonus for a weapon category or skill.
    WeaponCategoryDv,
    /// Accuracy bonus for every weapon, a named weapon or `[contains]text`.
    WeaponAccuracy,
    /// Concealability modifier applied to every weapon.
    Concealability,
    /// Reach bonus for melee weapons.
    Reach,
    /// Damage value bonus for unarmed attacks.
    UnarmedDv,
    /// Turns unarmed damage into physical damage.
    UnarmedDvPhysical,
    /// Armor penetration bonus for unarmed attacks.
    UnarmedAp,
    /// Reach bonus for unarmed attacks.
    UnarmedReach,
    /// Strength bonus for throwing weapons.
    ThrowStr,
}

/// Where an improvement came from.
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
pub enum ImprovementSource {
    #[default]
    Quality,
    Cyberware,
    Bioware,
    Gear,
    Spell,
    Power,
    Metatype,
    Initiation,
    EssenceLoss,
    EssenceLossChargen,
    Custom,
}

impl ImprovementSource {
    /// Essence loss is tracked separately from the metatype range.
    pub const fn is_essence_loss(self) -> bool {
        matches!(self, Self::EssenceLoss | Self::EssenceLossChargen)
    }
}

/// Character lifecycle phase used to gate conditional improvements.
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
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum SessionPhase {
    /// Character creation (priority points, build karma).
    #[default]
    Create,
    /// Career mode (karma earned in play).
    Career,
}

/// Textual applicability gate carried by an improvement.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Condition {
    /// Always applies.
    #[default]
    None,
    /// Only applies once the character is in career mode.
    Career,
    /// Only applies during character creation.
    Create,
    /// Free-text condition evaluated by the player; never applied automatically.
    Other(String),
}

impl Condition {
    /// Parses the rule-data spelling (`""`, `"career"`, `"create"`, anything else).
    pub fn parse(text: &str) -> Self {
        match text.trim() {
            "" => Self::None,
            t if t.eq_ignore_ascii_case("career") => Self::Career,
            t if t.eq_ignore_ascii_case("create") => Self::Create,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    /// Whether the improvement applies in the given phase.
    pub fn is_satisfied(&self, phase: SessionPhase) -> bool {
        match self {
            Self::None => true,
            Self::Career => phase == SessionPhase::Career,
            Self::Create => phase == SessionPhase::Create,
            Self::Other(_) => false,
        }
    }
}

/// A single modifier record.
///
/// Records are immutable once added to the store apart from the `enabled`
/// flag, which the store toggles and announces like any other change.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Improvement {
    #[cfg_attr(feature = "serde", serde(default))]
    pub id: ImprovementId,
    pub kind: ImprovementKind,
    #[cfg_attr(feature = "serde", serde(default))]
    pub source: ImprovementSource,
    /// Human-readable origin, used when explaining contributions.
    #[cfg_attr(feature = "serde", serde(default))]
    pub source_name: String,
    /// Target abbreviation, category or name.
    #[cfg_attr(feature = "serde", serde(default))]
    pub improved_name: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub value: i32,
    #[cfg_attr(feature = "serde", serde(default))]
    pub augmented: i32,
    #[cfg_attr(feature = "serde", serde(default = "default_rating"))]
    pub rating: i32,
    #[cfg_attr(feature = "serde", serde(default))]
    pub minimum: i32,
    #[cfg_attr(feature = "serde", serde(default))]
    pub maximum: i32,
    #[cfg_attr(feature = "serde", serde(default))]
    pub augmented_maximum: i32,
    /// Stacking group; empty means always additive.
    #[cfg_attr(feature = "serde", serde(default))]
    pub unique_name: String,
    #[cfg_attr(feature = "serde", serde(default = "default_enabled"))]
    pub enabled: bool,
    #[cfg_attr(feature = "serde", serde(default))]
    pub custom: bool,
    #[cfg_attr(feature = "serde", serde(default))]
    pub condition: Condition,
}

#[cfg(feature = "serde")]
fn default_rating() -> i32 {
    1
}

#[cfg(feature = "serde")]
fn default_enabled() -> bool {
    true
}

impl Improvement {
    /// Creates an enabled, ungrouped improvement with rating 1.
    pub fn new(kind: ImprovementKind, improved_name: impl Into<String>) -> Self {
        Self {
            id: ImprovementId::default(),
            kind,
            source: ImprovementSource::default(),
            source_name: String::new(),
            improved_name: improved_name.into(),
            value: 0,
            augmented: 0,
            rating: 1,
            minimum: 0,
            maximum: 0,
            augmented_maximum: 0,
            unique_name: String::new(),
            enabled: true,
            custom: false,
            condition: Condition::None,
        }
    }

    /// Shorthand for an attribute bonus (`augmented`) on `abbrev`.
    pub fn attribute(abbrev: impl Into<String>, augmented: i32) -> Self {
        Self::new(ImprovementKind::Attribute, abbrev).with_augmented(augmented)
    }

    #[must_use]
    pub fn with_source(mut self, source: ImprovementSource, name: impl Into<String>) -> Self {
        self.source = source;
        self.source_name = name.into();
        self
    }

    #[must_use]
    pub fn with_value(mut self, value: i32) -> Self {
        self.value = value;
        self
    }

    #[must_use]
    pub fn with_augmented(mut self, augmented: i32) -> Self {
        self.augmented = augmented;
        self
    }

    #[must_use]
    pub fn with_rating(mut self, rating: i32) -> Self {
        self.rating = rating;
        self
    }

    #[must_use]
    pub fn with_range(mut self, minimum: i32, maximum: i32, augmented_maximum: i32) -> Self {
        self.minimum = minimum;
        self.maximum = maximum;
        self.augmented_maximum = augmented_maximum;
        self
    }

    #[must_use]
    pub fn with_unique_name(mut self, unique_name: impl Into<String>) -> Self {
        self.unique_name = unique_name.into();
        self
    }

    #[must_use]
    pub fn with_condition(mut self, condition: Condition) -> Self {
        self.condition = condition;
        self
    }

    #[must_use]
    pub fn custom(mut self) -> Self {
        self.custom = true;
        self.source = ImprovementSource::Custom;
        self
    }

    #[must_use]
    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Whether this record targets `abbrev` or its `ABBRBase` twin.
    pub fn targets_attribute(&self, abbrev: &str) -> bool {
        self.kind == ImprovementKind::Attribute && is_attribute_target(&self.improved_name, abbrev)
    }

    /// Whether this record carries any range modifier.
    pub fn has_range(&self) -> bool {
        self.minimum != 0 || self.maximum != 0 || self.augmented_maximum != 0
    }

    /// `true` when the record applies in `phase`.
    pub fn applies(&self, phase: SessionPhase) -> bool {
        self.enabled && self.condition.is_satisfied(phase)
    }

    /// Upper bound of the cost window; `0` means unbounded.
    pub(crate) fn window_maximum(&self) -> i32 {
        if self.maximum == 0 { i32::MAX } else { self.maximum }
    }
}

/// `ABBR` or `ABBRBase`.
pub(crate) fn is_attribute_target(improved_name: &str, abbrev: &str) -> bool {
    improved_name
        .strip_prefix(abbrev)
        .is_some_and(|rest| rest.is_empty() || rest == "Base")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn condition_parses_rule_spellings() {
        assert_eq!(Condition::parse(""), Condition::None);
        assert_eq!(Condition::parse("career"), Condition::Career);
        assert_eq!(Condition::parse("Create"), Condition::Create);
        assert_eq!(
            Condition::parse("while flying"),
            Condition::Other("while flying".into())
        );
    }

    #[test]
    fn condition_gates_by_phase() {
        assert!(Condition::None.is_satisfied(SessionPhase::Career));
        assert!(Condition::Career.is_satisfied(SessionPhase::Career));
        assert!(!Condition::Career.is_satisfied(SessionPhase::Create));
        assert!(Condition::Create.is_satisfied(SessionPhase::Create));
        assert!(!Condition::Other("x".into()).is_satisfied(SessionPhase::Create));
    }

    #[test]
    fn attribute_target_matches_base_twin_only() {
        let imp = Improvement::attribute("STRBase", 1);
        assert!(imp.targets_attribute("STR"));
        assert!(!imp.targets_attribute("ST"));
        assert!(!Improvement::attribute("STRX", 1).targets_attribute("STR"));
    }

    #[test]
    fn kind_parses_case_insensitively() {
        let kind: ImprovementKind = "weaponcategorydv".parse().unwrap();
        assert_eq!(kind, ImprovementKind::WeaponCategoryDv);
    }
}
