//! Initiation (magicians) and submersion (technomancers) grades.

use core::fmt;

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

use crate::config::SheetConfig;

/// One purchased grade and the discounts taken for it.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct InitiationGrade {
    pub grade: i32,
    /// Submersion rather than initiation.
    pub technomancer: bool,
    /// Initiatory group (or technomancer network).
    pub group: bool,
    /// Ordeal (or technomancer task).
    pub ordeal: bool,
    pub schooling: bool,
}

impl InitiationGrade {
    pub fn new(grade: i32) -> Self {
        Self {
            grade,
            ..Self::default()
        }
    }

    pub fn technomancer(mut self) -> Self {
        self.technomancer = true;
        self
    }

    pub fn with_group(mut self) -> Self {
        self.group = true;
        self
    }

    pub fn with_ordeal(mut self) -> Self {
        self.ordeal = true;
        self
    }

    pub fn with_schooling(mut self) -> Self {
        self.schooling = true;
        self
    }

    /// Discount multiplier from group, ordeal and schooling.
    pub fn multiplier(&self) -> Decimal {
        let tenth = Decimal::new(1, 1);
        let mut multiplier = Decimal::ONE;
        if self.group {
            multiplier -= tenth;
        }
        if self.ordeal {
            multiplier -= if self.technomancer {
                Decimal::new(2, 1)
            } else {
                tenth
            };
        }
        if self.schooling {
            multiplier -= tenth;
        }
        multiplier
    }

    /// `ceil((flat + grade × per_grade) × multiplier)`.
    pub fn karma_cost(&self, config: &SheetConfig) -> i32 {
        let cost = config
            .karma_initiation_flat
            .saturating_add(self.grade.saturating_mul(config.karma_initiation));
        Decimal::from(cost)
            .checked_mul(self.multiplier())
            .and_then(|scaled| scaled.ceil().to_i32())
            .unwrap_or(cost)
    }
}

impl fmt::Display for InitiationGrade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Grade {}", self.grade)?;
        let mut notes = Vec::new();
        if self.group {
            notes.push(if self.technomancer { "Network" } else { "Group" });
        }
        if self.ordeal {
            notes.push(if self.technomancer { "Task" } else { "Ordeal" });
        }
        if self.schooling {
            notes.push("Schooling");
        }
        if !notes.is_empty() {
            write!(f, " ({})", notes.join(", "))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_grade_cost() {
        // 10 + 3 × 3
        assert_eq!(InitiationGrade::new(3).karma_cost(&SheetConfig::default()), 19);
    }

    #[test]
    fn discounts_round_up() {
        let config = SheetConfig::default();
        let grade = InitiationGrade::new(1).with_group().with_ordeal();
        // ceil(13 × 0.8) = ceil(10.4)
        assert_eq!(grade.karma_cost(&config), 11);

        let submersion = InitiationGrade::new(1).technomancer().with_ordeal().with_schooling();
        // ceil(13 × 0.7) = ceil(9.1)
        assert_eq!(submersion.karma_cost(&config), 10);
    }

    #[test]
    fn display_names_discounts() {
        let grade = InitiationGrade::new(2).technomancer().with_group().with_ordeal();
        assert_eq!(grade.to_string(), "Grade 2 (Network, Task)");
        assert_eq!(InitiationGrade::new(1).to_string(), "Grade 1");
    }
}
