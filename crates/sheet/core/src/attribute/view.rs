use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

use crate::character::{Character, MetatypeCategory};
use crate::improvement::{
    Explanation, Improvement, ImprovementKind, ImprovementQuery, aggregate, aggregate_explained,
    value_of,
};

use super::{Attribute, ModifierSlot};

/// Read-only derived values of one attribute.
///
/// Borrowing the character for the lifetime of the view guarantees that no
/// improvement or option changes underneath a computation.
#[derive(Clone, Copy)]
pub struct AttributeView<'c> {
    character: &'c Character,
    attribute: &'c Attribute,
}

impl<'c> AttributeView<'c> {
    pub(crate) fn new(character: &'c Character, attribute: &'c Attribute) -> Self {
        Self {
            character,
            attribute,
        }
    }

    pub fn attribute(&self) -> &'c Attribute {
        self.attribute
    }

    pub fn abbrev(&self) -> &'c str {
        self.attribute.abbrev()
    }

    pub fn base(&self) -> i32 {
        self.attribute.base()
    }

    pub fn karma(&self) -> i32 {
        self.attribute.karma()
    }

    fn records(&self) -> impl Iterator<Item = &'c Improvement> + 'c {
        self.character.improvements().iter()
    }

    /// Enabled `Attribute` records on `ABBR` or `ABBRBase`.
    fn range_records(&self) -> impl Iterator<Item = &'c Improvement> + 'c {
        let abbrev = self.abbrev();
        self.records()
            .filter(move |imp| imp.enabled && imp.targets_attribute(abbrev))
    }

    /// Cyberzombies have MAG fixed at 1.
    fn fixed_magic(&self) -> bool {
        self.character.metatype() == MetatypeCategory::Cyberzombie
            && matches!(self.abbrev(), "MAG" | "MAGAdept")
    }

    /// Whether the attribute may sit at 0 instead of 1.
    fn zero_floor(&self) -> bool {
        self.character.is_critter()
            || self.attribute.raw_metatype_maximum() == 0
            || self.attribute.is_special()
    }

    // ========================================================================
    // Metatype range
    // ========================================================================

    fn replacement(&self) -> Option<&'c Improvement> {
        let abbrev = self.abbrev();
        self.records()
            .filter(|imp| {
                imp.kind == ImprovementKind::ReplaceAttribute
                    && imp.enabled
                    && imp.improved_name == abbrev
            })
            .last()
    }

    /// Metatype minimum, replaced by the last enabled `ReplaceAttribute`.
    pub fn metatype_minimum(&self) -> i32 {
        self.replacement()
            .map_or(self.attribute.raw_metatype_minimum(), |imp| imp.minimum)
    }

    /// Metatype maximum, replaced by the last enabled `ReplaceAttribute`.
    pub fn metatype_maximum(&self) -> i32 {
        self.replacement()
            .map_or(self.attribute.raw_metatype_maximum(), |imp| imp.maximum)
    }

    pub fn metatype_augmented_maximum(&self) -> i32 {
        self.attribute.metatype_augmented_maximum()
    }

    /// Free levels granted by `AttributeLevel`, capped by the metatype span.
    pub fn free_base(&self) -> i32 {
        let granted = value_of(
            self.records(),
            ImprovementKind::AttributeLevel,
            self.abbrev(),
            self.character.phase(),
        );
        granted.min(self.metatype_maximum().saturating_sub(self.metatype_minimum()))
    }

    pub fn minimum_modifiers(&self) -> i32 {
        saturating_sum(
            self.range_records()
                .map(|imp| imp.minimum.saturating_mul(imp.rating)),
        )
    }

    pub fn maximum_modifiers(&self) -> i32 {
        saturating_sum(
            self.range_records()
                .map(|imp| imp.maximum.saturating_mul(imp.rating)),
        )
    }

    /// Augmented-maximum modifiers only count on `ABBR`, never `ABBRBase`.
    pub fn augmented_maximum_modifiers(&self) -> i32 {
        let abbrev = self.abbrev();
        saturating_sum(
            self.range_records()
                .filter(|imp| imp.improved_name == abbrev)
                .map(|imp| imp.augmented_maximum.saturating_mul(imp.rating)),
        )
    }

    pub fn raw_minimum(&self) -> i32 {
        self.metatype_minimum().saturating_add(self.minimum_modifiers())
    }

    pub fn total_minimum(&self) -> i32 {
        if self.fixed_magic() {
            return 1;
        }
        let minimum = self.raw_minimum();
        if minimum < 1 {
            if self.zero_floor() { 0 } else { 1 }
        } else {
            minimum
        }
    }

    pub fn total_maximum(&self) -> i32 {
        if self.fixed_magic() {
            return 1;
        }
        self.metatype_maximum()
            .saturating_add(self.maximum_modifiers())
            .max(0)
    }

    pub fn total_augmented_maximum(&self) -> i32 {
        if self.fixed_magic() {
            return 1;
        }
        let headroom = if self.attribute.is_special() { 0 } else { 4 };
        self.total_maximum()
            .saturating_add(headroom)
            .saturating_add(self.augmented_maximum_modifiers())
            .max(0)
    }

    /// Maximum ignoring essence-loss penalties.
    pub fn maximum_no_essence_loss(&self) -> i32 {
        if self.fixed_magic() {
            return 1;
        }
        let (minimum, maximum) = self
            .range_records()
            .filter(|imp| !imp.source.is_essence_loss())
            .fold(
                (self.metatype_minimum(), self.metatype_maximum()),
                |(min, max), imp| {
                    (
                        min.saturating_add(imp.minimum.saturating_mul(imp.rating)),
                        max.saturating_add(imp.maximum.saturating_mul(imp.rating)),
                    )
                },
            );
        let minimum = if minimum < 1 && !self.zero_floor() {
            1
        } else {
            minimum.max(0)
        };
        maximum.max(minimum)
    }

    /// `"min / max (augmented max)"` from the metatype.
    pub fn metatype_limits(&self) -> String {
        format!(
            "{} / {} ({})",
            self.metatype_minimum(),
            self.metatype_maximum(),
            self.metatype_augmented_maximum()
        )
    }

    /// `"min / max (augmented max)"` after modifiers.
    pub fn augmented_metatype_limits(&self) -> String {
        format!(
            "{} / {} ({})",
            self.total_minimum(),
            self.total_maximum(),
            self.total_augmented_maximum()
        )
    }

    // ========================================================================
    // Values
    // ========================================================================

    fn query(&self, slot: ModifierSlot) -> ImprovementQuery<'c> {
        let target: &'c str = match slot {
            ModifierSlot::Modifiers => self.abbrev(),
            ModifierSlot::ValueModifiers => self.attribute.base_name(),
        };
        ImprovementQuery::augmented(ImprovementKind::Attribute, target, self.character.phase())
    }

    fn cached(&self, slot: ModifierSlot) -> i32 {
        self.attribute
            .cache()
            .get_or_compute(slot, || aggregate(self.records(), &self.query(slot)))
    }

    /// Bonuses on `ABBR`; they raise the total but not karma costs.
    pub fn attribute_modifiers(&self) -> i32 {
        self.cached(ModifierSlot::Modifiers)
    }

    /// Bonuses on `ABBRBase`; they raise the value itself.
    pub fn attribute_value_modifiers(&self) -> i32 {
        self.cached(ModifierSlot::ValueModifiers)
    }

    pub fn total_base(&self) -> i32 {
        self.base()
            .saturating_add(self.free_base())
            .saturating_add(self.raw_minimum())
            .max(self.total_minimum())
    }

    /// Natural rating before `ABBR` bonuses.
    pub fn value(&self) -> i32 {
        let bought = self
            .base()
            .saturating_add(self.free_base())
            .saturating_add(self.raw_minimum())
            .saturating_add(self.attribute_value_modifiers());
        bought
            .max(self.total_minimum())
            .saturating_add(self.karma())
            .min(self.total_maximum())
    }

    /// Rating including bonuses, clamped to the augmented maximum.
    pub fn total_value(&self) -> i32 {
        if self.fixed_magic() {
            return 1;
        }
        let total = self
            .value()
            .saturating_add(self.attribute_modifiers())
            .min(self.total_augmented_maximum());
        if total >= 1 {
            return total;
        }
        let zero_floor = self.character.is_critter()
            || self.attribute.raw_metatype_maximum() == 0
            || match self.abbrev() {
                "EDG" | "RES" | "MAG" | "MAGAdept" => true,
                "DEP" => self.character.metatype() != MetatypeCategory::ArtificialIntelligence,
                _ => false,
            };
        if zero_floor { 0 } else { 1 }
    }

    pub fn augmented(&self) -> i32 {
        self.value().saturating_add(self.attribute.augment_modifier())
    }

    /// Whether any bonus makes the total differ from the natural value.
    pub fn has_modifiers(&self) -> bool {
        let magic_like = matches!(self.abbrev(), "MAG" | "MAGAdept" | "RES" | "DEP");
        self.range_records().any(|imp| {
            imp.augmented != 0 || (magic_like && imp.source.is_essence_loss())
        })
    }

    /// `"V"`, or `"V (T)"` when bonuses apply.
    pub fn display_value(&self) -> String {
        if self.has_modifiers() {
            format!("{} ({})", self.value(), self.total_value())
        } else {
            self.value().to_string()
        }
    }

    /// Contributions behind [`attribute_modifiers`](Self::attribute_modifiers).
    pub fn explain_modifiers(&self) -> Explanation {
        let mut explanation = Explanation::new();
        aggregate_explained(
            self.records(),
            &self.query(ModifierSlot::Modifiers),
            &mut explanation,
        );
        explanation
    }

    /// `"STR (4) + Muscle Toner (2)"`.
    pub fn tooltip(&self) -> String {
        let mut tip = format!("{} ({})", self.abbrev(), self.value());
        for (label, value) in self.explain_modifiers().entries() {
            tip.push_str(&format!(" + {label} ({value})"));
        }
        tip
    }

    // ========================================================================
    // Costs
    // ========================================================================

    /// Cost improvements of `flat`/`multiplier` kinds that apply at `level`.
    fn cost_records(
        &self,
        flat: ImprovementKind,
        multiplier: ImprovementKind,
    ) -> impl Iterator<Item = &'c Improvement> + 'c {
        let abbrev = self.abbrev();
        let phase = self.character.phase();
        self.records().filter(move |imp| {
            (imp.kind == flat || imp.kind == multiplier)
                && (imp.improved_name.is_empty() || imp.improved_name == abbrev)
                && imp.applies(phase)
        })
    }

    pub fn base_unlocked(&self) -> bool {
        self.character.config().build_method_has_skill_points
    }

    /// Priority points spent on `base`.
    pub fn spent_priority_points(&self) -> i32 {
        let base = self.base();
        let mut extra: i32 = 0;
        let mut multiplier = Decimal::ONE;
        for imp in self.cost_records(
            ImprovementKind::AttributePointCost,
            ImprovementKind::AttributePointCostMultiplier,
        ) {
            if imp.minimum > base {
                continue;
            }
            if imp.kind == ImprovementKind::AttributePointCost {
                let levels = base.min(imp.window_maximum()).saturating_sub(imp.minimum);
                extra = extra.saturating_add(imp.value.saturating_mul(levels));
            } else {
                multiplier = compound(multiplier, imp.value);
            }
        }
        scale_up(base, multiplier).saturating_add(extra).max(0)
    }

    /// Karma for the next point, or `-1` at the maximum.
    pub fn upgrade_karma_cost(&self) -> i32 {
        let value = self.value();
        if value >= self.total_maximum() {
            return -1;
        }
        let per_point = self.character.config().karma_attribute;
        let mut upgrade = if value == 0 {
            per_point
        } else {
            value.saturating_add(1).saturating_mul(per_point)
        };
        if self.character.config().alternate_metatype_attribute_karma {
            let discount = self.metatype_minimum().saturating_sub(1).saturating_mul(per_point);
            upgrade = upgrade.saturating_sub(discount);
        }

        let mut extra: i32 = 0;
        let mut multiplier = Decimal::ONE;
        for imp in self.cost_records(
            ImprovementKind::AttributeKarmaCost,
            ImprovementKind::AttributeKarmaCostMultiplier,
        ) {
            if imp.minimum > value || value > imp.window_maximum() {
                continue;
            }
            if imp.kind == ImprovementKind::AttributeKarmaCost {
                extra = extra.saturating_add(imp.value);
            } else {
                multiplier = compound(multiplier, imp.value);
            }
        }
        let upgrade = scale_up(upgrade, multiplier).saturating_add(extra);
        upgrade.max(per_point.min(1))
    }

    /// Karma spent on `karma` levels, summed from the bought base upwards.
    pub fn total_karma_cost(&self) -> i32 {
        let karma = self.karma();
        if karma == 0 {
            return 0;
        }
        let config = self.character.config();
        let value = self.value();
        let raw_total_base = if config.reverse_attribute_priority_order {
            self.free_base()
                .saturating_add(self.raw_minimum())
                .max(self.total_minimum())
        } else {
            self.total_base()
        };
        let mut total_base = raw_total_base;
        if config.alternate_metatype_attribute_karma {
            let bought = if config.reverse_attribute_priority_order {
                0
            } else {
                self.base()
            };
            let human_minimum = bought
                .saturating_add(self.free_base())
                .saturating_add(1)
                .saturating_add(self.minimum_modifiers());
            total_base = if human_minimum >= 1 {
                human_minimum
            } else if self.zero_floor() {
                0
            } else {
                1
            };
        }

        // Sum of (n × cost) for n in total_base+1 ..= total_base+karma.
        let (total_base, karma_levels) = (i128::from(total_base), i128::from(karma));
        let cost = saturate(
            (2 * total_base + karma_levels + 1) * karma_levels / 2
                * i128::from(config.karma_attribute),
        );

        let mut extra: i32 = 0;
        let mut multiplier = Decimal::ONE;
        for imp in self.cost_records(
            ImprovementKind::AttributeKarmaCost,
            ImprovementKind::AttributeKarmaCostMultiplier,
        ) {
            if imp.minimum > value {
                continue;
            }
            if imp.kind == ImprovementKind::AttributeKarmaCost {
                let levels = value
                    .min(imp.window_maximum())
                    .saturating_sub(raw_total_base.max(imp.minimum.saturating_sub(1)));
                extra = extra.saturating_add(imp.value.saturating_mul(levels));
            } else {
                multiplier = compound(multiplier, imp.value);
            }
        }
        scale_up(cost, multiplier).saturating_add(extra).max(0)
    }

    /// Points that can still be bought with karma.
    pub fn karma_maximum(&self) -> i32 {
        self.total_maximum().saturating_sub(self.total_base())
    }

    /// Points that can still be bought with priority points.
    pub fn priority_maximum(&self) -> i32 {
        self.total_maximum()
            .saturating_sub(self.karma())
            .saturating_sub(self.free_base())
            .saturating_sub(self.raw_minimum())
    }

    pub fn at_metatype_maximum(&self) -> bool {
        self.value() == self.total_maximum() && self.total_minimum() > 0
    }

    /// Enough karma and room below the maximum.
    pub fn can_upgrade_career(&self) -> bool {
        self.character.karma() >= self.upgrade_karma_cost() && self.total_maximum() > self.value()
    }
}

fn percent(value: i32) -> Decimal {
    Decimal::from(value) / Decimal::ONE_HUNDRED
}

/// `ceil(cost × multiplier)`; identity when the multiplier is 1.
fn scale_up(cost: i32, multiplier: Decimal) -> i32 {
    if multiplier == Decimal::ONE {
        return cost;
    }
    Decimal::from(cost)
        .checked_mul(multiplier)
        .and_then(|scaled| scaled.ceil().to_i32())
        .unwrap_or(cost)
}

/// Folds a percentage into a running cost multiplier; an overflowing
/// product leaves the multiplier unchanged.
fn compound(multiplier: Decimal, value: i32) -> Decimal {
    multiplier.checked_mul(percent(value)).unwrap_or(multiplier)
}

fn saturating_sum(values: impl Iterator<Item = i32>) -> i32 {
    values.fold(0, i32::saturating_add)
}

fn saturate(value: i128) -> i32 {
    i32::try_from(value).unwrap_or(if value < 0 { i32::MIN } else { i32::MAX })
}

impl core::fmt::Debug for AttributeView<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AttributeView")
            .field("abbrev", &self.abbrev())
            .field("value", &self.value())
            .field("total_value", &self.total_value())
            .finish()
    }
}
