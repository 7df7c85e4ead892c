//! Improvement aggregation with precedence/stacking rules.
//!
//! One algorithm serves both numeric reads and tooltip explanations: pass an
//! [`Explanation`] to [`aggregate_explained`] to collect the `(label, value)`
//! pairs that produced the result.
//!
//! # Stacking rules
//!
//! Matching records are split into two passes (regular, then user-added
//! `custom`) whose results are summed. Within the regular pass:
//!
//! - Ungrouped records (empty `unique_name`) always add.
//! - `precedence0`: the highest record, plus every `precedence-1` record,
//!   replaces the ungrouped sum when larger (`max`, not `+`).
//! - `precedence1`: the sum of `precedence1` and `precedence-1` records
//!   replaces the ungrouped sum when larger. Only checked when no
//!   `precedence0` record matched.
//! - Any other group contributes its single highest record.
//!
//! The custom pass only applies the ungrouped and highest-per-group rules.

use std::collections::BTreeMap;

use super::{Improvement, ImprovementKind, SessionPhase};

/// Highest record wins and overrides the stacked total when larger.
pub const PRECEDENCE_OVERRIDE: &str = "precedence0";
/// Summed with `precedence-1` and overrides the stacked total when larger.
pub const PRECEDENCE_ADDITIVE: &str = "precedence1";
/// Always stacks on top of whichever reserved group applies.
pub const PRECEDENCE_STACKED: &str = "precedence-1";
/// Gates an attribute's availability; never shown in explanations.
pub const TOOLTIP_EXCLUDED_GROUP: &str = "enableattribute";

// ============================================================================
// Query
// ============================================================================

/// Which number of a record is aggregated.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Magnitude {
    /// `augmented × rating` (attribute bonuses).
    Augmented,
    /// `value` (every other kind).
    Value,
}

impl Magnitude {
    pub fn of(self, improvement: &Improvement) -> i32 {
        match self {
            Self::Augmented => improvement.augmented.saturating_mul(improvement.rating),
            Self::Value => improvement.value,
        }
    }
}

/// How a record's `improved_name` is matched.
#[derive(Clone, Copy)]
pub enum TargetMatch<'a> {
    Exact(&'a str),
    Predicate(&'a dyn Fn(&str) -> bool),
}

impl TargetMatch<'_> {
    fn matches(&self, improved_name: &str) -> bool {
        match self {
            Self::Exact(target) => improved_name == *target,
            Self::Predicate(predicate) => predicate(improved_name),
        }
    }
}

impl core::fmt::Debug for TargetMatch<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Exact(target) => f.debug_tuple("Exact").field(target).finish(),
            Self::Predicate(_) => f.write_str("Predicate(..)"),
        }
    }
}

/// Selects the records that feed one aggregation.
#[derive(Clone, Copy, Debug)]
pub struct ImprovementQuery<'a> {
    pub kind: ImprovementKind,
    pub target: TargetMatch<'a>,
    pub magnitude: Magnitude,
    pub phase: SessionPhase,
}

impl<'a> ImprovementQuery<'a> {
    /// Attribute-bonus query (`augmented × rating`) on an exact target.
    pub fn augmented(kind: ImprovementKind, target: &'a str, phase: SessionPhase) -> Self {
        Self {
            kind,
            target: TargetMatch::Exact(target),
            magnitude: Magnitude::Augmented,
            phase,
        }
    }

    /// `value` query on an exact target.
    pub fn value(kind: ImprovementKind, target: &'a str, phase: SessionPhase) -> Self {
        Self {
            kind,
            target: TargetMatch::Exact(target),
            magnitude: Magnitude::Value,
            phase,
        }
    }

    #[must_use]
    pub fn matching(mut self, predicate: &'a dyn Fn(&str) -> bool) -> Self {
        self.target = TargetMatch::Predicate(predicate);
        self
    }

    fn accepts(&self, improvement: &Improvement) -> bool {
        improvement.kind == self.kind
            && improvement.applies(self.phase)
            && self.target.matches(&improvement.improved_name)
    }
}

// ============================================================================
// Explanation
// ============================================================================

/// `(label, value)` pairs explaining an aggregated number.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Explanation {
    entries: Vec<(String, i32)>,
}

impl Explanation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, label: impl Into<String>, value: i32) {
        self.entries.push((label.into(), value));
    }

    pub fn entries(&self) -> &[(String, i32)] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn total(&self) -> i32 {
        self.entries.iter().map(|(_, value)| value).sum()
    }

    /// `"label (n) + label (n)"`.
    pub fn render(&self) -> String {
        self.entries
            .iter()
            .map(|(label, value)| format!("{label} ({value})"))
            .collect::<Vec<_>>()
            .join(" + ")
    }
}

fn label(improvement: &Improvement) -> String {
    if improvement.source_name.is_empty() {
        improvement.source.to_string()
    } else {
        improvement.source_name.clone()
    }
}

// ============================================================================
// Aggregation
// ============================================================================

/// Collapses every record accepted by `query` into one contribution.
///
/// Returns 0 for an empty or fully filtered set.
pub fn aggregate<'r>(
    records: impl IntoIterator<Item = &'r Improvement>,
    query: &ImprovementQuery<'_>,
) -> i32 {
    aggregate_inner(records, query, None)
}

/// Same as [`aggregate`], also recording the contributing records.
pub fn aggregate_explained<'r>(
    records: impl IntoIterator<Item = &'r Improvement>,
    query: &ImprovementQuery<'_>,
    explanation: &mut Explanation,
) -> i32 {
    aggregate_inner(records, query, Some(explanation))
}

/// Aggregates the `value` of `kind` records targeting `target`.
pub fn value_of<'r>(
    records: impl IntoIterator<Item = &'r Improvement>,
    kind: ImprovementKind,
    target: &str,
    phase: SessionPhase,
) -> i32 {
    aggregate(records, &ImprovementQuery::value(kind, target, phase))
}

fn aggregate_inner<'r>(
    records: impl IntoIterator<Item = &'r Improvement>,
    query: &ImprovementQuery<'_>,
    mut explanation: Option<&mut Explanation>,
) -> i32 {
    let (regular, custom): (Vec<&Improvement>, Vec<&Improvement>) = records
        .into_iter()
        .filter(|imp| query.accepts(imp))
        .partition(|imp| !imp.custom);

    let mut total = pass(&regular, query.magnitude, true, explanation.as_deref_mut());
    total = total.saturating_add(pass(&custom, query.magnitude, false, explanation));
    total
}

type Entry<'r> = (&'r Improvement, i32);

/// One pass over pre-filtered records. `reserved` enables the precedence
/// group rules.
fn pass<'r>(
    records: &[&'r Improvement],
    magnitude: Magnitude,
    reserved: bool,
    explanation: Option<&mut Explanation>,
) -> i32 {
    let mut ungrouped_sum = 0i32;
    let mut ungrouped: Vec<Entry<'r>> = Vec::new();
    let mut groups: BTreeMap<&'r str, Vec<Entry<'r>>> = BTreeMap::new();

    for &imp in records {
        let contribution = magnitude.of(imp);
        if imp.unique_name.is_empty() {
            ungrouped_sum = ungrouped_sum.saturating_add(contribution);
            ungrouped.push((imp, contribution));
        } else {
            groups
                .entry(imp.unique_name.as_str())
                .or_default()
                .push((imp, contribution));
        }
    }

    let stacked = groups.get(PRECEDENCE_STACKED).map(Vec::as_slice).unwrap_or(&[]);

    let (total, explained) = if reserved && groups.contains_key(PRECEDENCE_OVERRIDE) {
        let best = highest(&groups[PRECEDENCE_OVERRIDE]);
        let mut winners: Vec<Entry<'r>> = best.into_iter().collect();
        winners.extend_from_slice(stacked);
        override_if_larger(ungrouped_sum, ungrouped, winners)
    } else if reserved && groups.contains_key(PRECEDENCE_ADDITIVE) {
        let mut winners = groups[PRECEDENCE_ADDITIVE].clone();
        winners.extend_from_slice(stacked);
        override_if_larger(ungrouped_sum, ungrouped, winners)
    } else {
        let mut total = ungrouped_sum;
        let mut explained = ungrouped;
        for entries in groups.values() {
            if let Some(best) = highest(entries) {
                total = total.saturating_add(best.1);
                explained.push(best);
            }
        }
        (total, explained)
    };

    if let Some(explanation) = explanation {
        for (imp, value) in explained {
            if imp.unique_name != TOOLTIP_EXCLUDED_GROUP {
                explanation.push(label(imp), value);
            }
        }
    }
    total
}

fn highest<'r>(entries: &[Entry<'r>]) -> Option<Entry<'r>> {
    // First record wins ties so explanations are stable.
    entries
        .iter()
        .copied()
        .reduce(|best, next| if next.1 > best.1 { next } else { best })
}

fn override_if_larger<'r>(
    ungrouped_sum: i32,
    ungrouped: Vec<Entry<'r>>,
    winners: Vec<Entry<'r>>,
) -> (i32, Vec<Entry<'r>>) {
    let grouped = winners
        .iter()
        .fold(0i32, |acc, (_, value)| acc.saturating_add(*value));
    if grouped > ungrouped_sum {
        (grouped, winners)
    } else {
        (ungrouped_sum, ungrouped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bonus(value: i32, group: &str) -> Improvement {
        Improvement::attribute("STR", value).with_unique_name(group)
    }

    fn str_query() -> ImprovementQuery<'static> {
        ImprovementQuery::augmented(ImprovementKind::Attribute, "STR", SessionPhase::Create)
    }

    #[test]
    fn empty_set_is_zero() {
        let none: [Improvement; 0] = [];
        assert_eq!(aggregate(&none, &str_query()), 0);
    }

    #[test]
    fn single_ungrouped_contribution_passes_through() {
        for v in [-3, 0, 1, 7] {
            assert_eq!(aggregate(&[bonus(v, "")], &str_query()), v);
        }
    }

    #[test]
    fn same_group_takes_highest() {
        let records = [bonus(2, "wired"), bonus(5, "wired"), bonus(1, "")];
        assert_eq!(aggregate(&records, &str_query()), 6);
    }

    #[test]
    fn override_group_takes_max_with_ungrouped() {
        let records = [bonus(3, PRECEDENCE_OVERRIDE), bonus(7, PRECEDENCE_OVERRIDE)];
        assert_eq!(aggregate(&records, &str_query()), 7);

        let with_stack = [
            bonus(3, PRECEDENCE_OVERRIDE),
            bonus(7, PRECEDENCE_OVERRIDE),
            bonus(4, ""),
            bonus(5, ""),
        ];
        assert_eq!(aggregate(&with_stack, &str_query()), 9);
    }

    #[test]
    fn override_group_adds_stacked_group() {
        let records = [
            bonus(7, PRECEDENCE_OVERRIDE),
            bonus(2, PRECEDENCE_STACKED),
            bonus(3, PRECEDENCE_STACKED),
            bonus(1, ""),
        ];
        assert_eq!(aggregate(&records, &str_query()), 12);
    }

    #[test]
    fn negative_ungrouped_sum_loses_to_override() {
        let records = [bonus(-4, ""), bonus(2, PRECEDENCE_OVERRIDE)];
        assert_eq!(aggregate(&records, &str_query()), 2);

        // A negative override still loses to a less negative ungrouped sum.
        let both_negative = [bonus(-1, ""), bonus(-3, PRECEDENCE_OVERRIDE)];
        assert_eq!(aggregate(&both_negative, &str_query()), -1);
    }

    #[test]
    fn additive_group_sums_with_stacked() {
        let records = [
            bonus(2, PRECEDENCE_ADDITIVE),
            bonus(2, PRECEDENCE_ADDITIVE),
            bonus(1, PRECEDENCE_STACKED),
            bonus(4, ""),
        ];
        assert_eq!(aggregate(&records, &str_query()), 5);
    }

    #[test]
    fn override_group_shadows_additive_group() {
        let records = [bonus(3, PRECEDENCE_OVERRIDE), bonus(10, PRECEDENCE_ADDITIVE)];
        assert_eq!(aggregate(&records, &str_query()), 3);
    }

    #[test]
    fn custom_records_use_plain_grouping_and_add() {
        let records = [
            bonus(2, ""),
            bonus(3, PRECEDENCE_OVERRIDE).custom(),
            bonus(1, PRECEDENCE_OVERRIDE).custom(),
            bonus(1, "").custom(),
        ];
        assert_eq!(aggregate(&records, &str_query()), 2 + 3 + 1);
    }

    #[test]
    fn rating_scales_augmented() {
        let records = [Improvement::attribute("STR", 2).with_rating(3)];
        assert_eq!(aggregate(&records, &str_query()), 6);
    }

    #[test]
    fn disabled_and_conditional_records_are_skipped() {
        let records = [
            bonus(2, "").disabled(),
            bonus(3, "").with_condition(super::super::Condition::Career),
            bonus(1, ""),
        ];
        assert_eq!(aggregate(&records, &str_query()), 1);
    }

    #[test]
    fn explanation_follows_the_winning_branch() {
        let records = [
            bonus(1, "").with_source(crate::ImprovementSource::Quality, "Tough"),
            bonus(6, PRECEDENCE_OVERRIDE).with_source(crate::ImprovementSource::Spell, "Buff"),
            bonus(1, TOOLTIP_EXCLUDED_GROUP),
        ];
        let mut explanation = Explanation::new();
        let total = aggregate_explained(&records, &str_query(), &mut explanation);

        assert_eq!(total, 6);
        assert_eq!(explanation.entries(), &[("Buff".to_string(), 6)]);
        assert_eq!(explanation.render(), "Buff (6)");
    }

    #[test]
    fn explanation_matches_numeric_result() {
        let records = [bonus(1, ""), bonus(2, "a"), bonus(4, "a"), bonus(3, "b")];
        let mut explanation = Explanation::new();
        let total = aggregate_explained(&records, &str_query(), &mut explanation);
        assert_eq!(total, aggregate(&records, &str_query()));
        assert_eq!(explanation.total(), total);
    }
}
