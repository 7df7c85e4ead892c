//! Damage codes and availability ratings.
//!
//! Template damage strings mix arithmetic with notation: `"(STR+2)P"`,
//! `"10S(e)"`, `"16P (-2/m)"`. [`DamageParts::split`] peels the notation off
//! so only the arithmetic reaches the formula parser.

use core::fmt;

use crate::formula::FormulaValue;

pub const DAMAGE_PHYSICAL: &str = "P";
pub const DAMAGE_STUN: &str = "S";
pub const DAMAGE_EITHER: &str = "P or S";

/// A damage string split into expression, damage type and trailing notes.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DamageParts {
    pub expression: String,
    /// `"P"`, `"S"`, `"P or S"` or empty.
    pub damage_type: String,
    /// `"(e)"`, `"(f)"` and splash notes such as `" (-2/m)"`.
    pub extra: String,
}

impl DamageParts {
    pub fn split(damage: &str) -> Self {
        let mut expression = damage.to_string();
        let mut damage_type = String::new();
        let mut extra = String::new();

        if expression.contains(DAMAGE_EITHER) {
            damage_type = DAMAGE_EITHER.to_string();
            expression = expression.replace(DAMAGE_EITHER, "");
        }

        for marker in ["(e)", "(f)"] {
            if expression.contains(marker) {
                extra = marker.to_string();
                expression = expression.replace(marker, "");
            }
        }

        if let Some(splash) = splash_note(&expression) {
            extra.push(' ');
            extra.push_str(&splash);
            expression = expression.replace(&splash, "");
        }

        if damage_type.is_empty() {
            let trimmed = expression.trim_end();
            if let Some(stripped) = strip_type_suffix(trimmed) {
                damage_type = trimmed[stripped.len()..].to_string();
                expression = stripped.to_string();
            }
        }

        Self {
            expression: expression.trim().to_string(),
            damage_type,
            extra,
        }
    }
}

/// The parenthesised splash note (`(-2/m)`, `(3m Radius)`), if any.
fn splash_note(expression: &str) -> Option<String> {
    let end_marker = expression
        .find("/m)")
        .map(|i| i + "/m)".len())
        .or_else(|| expression.find(" Radius)").map(|i| i + " Radius)".len()))?;
    let start = expression[..end_marker].rfind('(')?;
    Some(expression[start..end_marker].to_string())
}

/// Strips a trailing `P`/`S` damage-type letter that follows a number or a
/// closing bracket. `STR` and other identifiers are left alone.
fn strip_type_suffix(expression: &str) -> Option<&str> {
    let last = expression.chars().last()?;
    if last != 'P' && last != 'S' {
        return None;
    }
    let head = &expression[..expression.len() - 1];
    match head.trim_end().chars().last() {
        None => Some(head),
        Some(c) if c.is_ascii_digit() || c == ')' || c == '}' => Some(head),
        Some(_) => None,
    }
}

/// Evaluated weapon damage: `"7P"`, `"10S(e)"`, or the raw template.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DamageCode {
    pub value: FormulaValue,
    pub damage_type: String,
    pub extra: String,
}

impl DamageCode {
    pub fn is_numeric(&self) -> bool {
        !self.value.is_raw()
    }
}

impl fmt::Display for DamageCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            FormulaValue::Number(_) => {
                write!(f, "{}{}{}", self.value, self.damage_type, self.extra)
            }
            FormulaValue::Raw(text) => f.write_str(text),
        }
    }
}

// ============================================================================
// Availability
// ============================================================================

/// Legality suffix of an availability rating.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AvailSuffix {
    /// `R`
    Restricted,
    /// `F`
    Forbidden,
}

impl AvailSuffix {
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            'R' => Some(Self::Restricted),
            'F' => Some(Self::Forbidden),
            _ => None,
        }
    }

    pub fn as_char(self) -> char {
        match self {
            Self::Restricted => 'R',
            Self::Forbidden => 'F',
        }
    }

    /// Forbidden dominates Restricted.
    pub fn merge(current: Option<Self>, other: Option<Self>) -> Option<Self> {
        current.max(other)
    }
}

/// Availability rating with its legality suffix.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AvailabilityValue {
    pub value: i32,
    pub suffix: Option<AvailSuffix>,
    /// The rating was written as `+n`/`-n` and modifies its parent item.
    pub add_to_parent: bool,
}

impl AvailabilityValue {
    /// Folds a child item's availability in.
    pub fn absorb_suffix(&mut self, child: &AvailabilityValue) {
        self.suffix = AvailSuffix::merge(self.suffix, child.suffix);
    }
}

impl fmt::Display for AvailabilityValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.add_to_parent {
            f.write_str("+")?;
        }
        write!(f, "{}", self.value)?;
        if let Some(suffix) = self.suffix {
            write!(f, "{}", suffix.as_char())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_type_suffix_without_touching_identifiers() {
        let parts = DamageParts::split("(STR+2)P");
        assert_eq!(parts.expression, "(STR+2)");
        assert_eq!(parts.damage_type, "P");

        let parts = DamageParts::split("STR+2");
        assert_eq!(parts.expression, "STR+2");
        assert_eq!(parts.damage_type, "");

        let parts = DamageParts::split("8S(e)");
        assert_eq!(parts.expression, "8");
        assert_eq!(parts.damage_type, "S");
        assert_eq!(parts.extra, "(e)");
    }

    #[test]
    fn splash_and_either_type() {
        let parts = DamageParts::split("16P (-2/m)");
        assert_eq!(parts.expression, "16");
        assert_eq!(parts.damage_type, "P");
        assert_eq!(parts.extra, " (-2/m)");

        let parts = DamageParts::split("10P or S (3m Radius)");
        assert_eq!(parts.expression, "10");
        assert_eq!(parts.damage_type, "P or S");
        assert_eq!(parts.extra, " (3m Radius)");
    }

    #[test]
    fn availability_formatting_and_suffix_merge() {
        let mut avail = AvailabilityValue {
            value: 4,
            suffix: Some(AvailSuffix::Restricted),
            add_to_parent: false,
        };
        avail.absorb_suffix(&AvailabilityValue {
            value: 2,
            suffix: Some(AvailSuffix::Forbidden),
            add_to_parent: true,
        });
        assert_eq!(avail.to_string(), "4F");
        assert_eq!(
            AvailSuffix::merge(Some(AvailSuffix::Forbidden), Some(AvailSuffix::Restricted)),
            Some(AvailSuffix::Forbidden)
        );
    }
}
