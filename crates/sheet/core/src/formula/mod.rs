//! Formula strings: tokenizer, parser and evaluator.
//!
//! Rule templates embed small arithmetic expressions over attribute
//! abbreviations, e.g. weapon damage `"STR+2"` or accuracy `"{Physical}+1"`.
//! A formula is parsed into an [`Expr`] every time it is used and evaluated
//! against a [`VariableSource`] in exact decimal arithmetic.
//!
//! Identifiers are whole tokens, so `ASTRAL` never matches `STR`.
//!
//! ## Failure mode
//!
//! Some template fields hold game concepts rather than numbers (`"Special"`,
//! `"Grenade"`). [`evaluate_or_raw`] returns the original text in that case;
//! callers display it unchanged instead of failing.

mod evaluate;
mod lexer;
mod parser;

pub use lexer::{Spanned, Token, tokenize};
pub use parser::{BinaryOp, Expr, Function, parse};

use std::collections::HashMap;
use std::fmt;

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

use crate::error::{ErrorSeverity, SheetError};

// ============================================================================
// Errors
// ============================================================================

/// Why a formula could not be evaluated.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum FormulaError {
    #[error("unexpected character '{ch}' at {position}")]
    UnexpectedCharacter { ch: char, position: usize },

    #[error("unexpected '{token}' at {position}")]
    UnexpectedToken { token: String, position: usize },

    #[error("unexpected end of formula")]
    UnexpectedEnd,

    #[error("invalid number '{0}'")]
    InvalidNumber(String),

    #[error("unknown variable '{0}'")]
    UnknownVariable(String),

    #[error("unknown function '{0}'")]
    UnknownFunction(String),

    #[error("{0}() needs at least one argument")]
    EmptyArguments(String),

    #[error("division by zero")]
    DivisionByZero,

    #[error("arithmetic overflow")]
    Overflow,

    #[error("formula nested deeper than {0} levels")]
    TooDeep(usize),
}

impl SheetError for FormulaError {
    fn severity(&self) -> ErrorSeverity {
        ErrorSeverity::Recoverable
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::UnexpectedCharacter { .. } => "FORMULA_UNEXPECTED_CHARACTER",
            Self::UnexpectedToken { .. } => "FORMULA_UNEXPECTED_TOKEN",
            Self::UnexpectedEnd => "FORMULA_UNEXPECTED_END",
            Self::InvalidNumber(_) => "FORMULA_INVALID_NUMBER",
            Self::UnknownVariable(_) => "FORMULA_UNKNOWN_VARIABLE",
            Self::UnknownFunction(_) => "FORMULA_UNKNOWN_FUNCTION",
            Self::EmptyArguments(_) => "FORMULA_EMPTY_ARGUMENTS",
            Self::DivisionByZero => "FORMULA_DIVISION_BY_ZERO",
            Self::Overflow => "FORMULA_OVERFLOW",
            Self::TooDeep(_) => "FORMULA_TOO_DEEP",
        }
    }
}

// ============================================================================
// Variables
// ============================================================================

/// Resolves identifiers to numbers during evaluation.
pub trait VariableSource {
    /// Returns the current value of `name`, or `None` if it is unknown.
    fn lookup(&self, name: &str) -> Option<Decimal>;
}

impl<T: VariableSource + ?Sized> VariableSource for &T {
    fn lookup(&self, name: &str) -> Option<Decimal> {
        (**self).lookup(name)
    }
}

impl VariableSource for HashMap<String, i32> {
    fn lookup(&self, name: &str) -> Option<Decimal> {
        self.get(name).copied().map(Decimal::from)
    }
}

impl VariableSource for HashMap<&str, i32> {
    fn lookup(&self, name: &str) -> Option<Decimal> {
        self.get(name).copied().map(Decimal::from)
    }
}

impl VariableSource for HashMap<String, Decimal> {
    fn lookup(&self, name: &str) -> Option<Decimal> {
        self.get(name).copied()
    }
}

/// Adapts a closure into a [`VariableSource`].
pub struct LookupFn<F>(pub F);

impl<F> VariableSource for LookupFn<F>
where
    F: Fn(&str) -> Option<Decimal>,
{
    fn lookup(&self, name: &str) -> Option<Decimal> {
        (self.0)(name)
    }
}

/// Tries `primary` first, then `fallback`.
pub struct Layered<'a> {
    pub primary: &'a dyn VariableSource,
    pub fallback: &'a dyn VariableSource,
}

impl VariableSource for Layered<'_> {
    fn lookup(&self, name: &str) -> Option<Decimal> {
        self.primary
            .lookup(name)
            .or_else(|| self.fallback.lookup(name))
    }
}

// ============================================================================
// Rounding & results
// ============================================================================

/// Final rounding applied to an evaluated formula.
#[derive(Clone, Copy, Debug, PartialEq, Eq, strum::Display, strum::EnumString)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum Rounding {
    /// Round up (damage-like quantities).
    Ceiling,
    /// Round down.
    Floor,
    /// Round half to even (accuracy, availability).
    Nearest,
    /// Keep full precision (costs).
    Exact,
}

impl Rounding {
    pub fn apply(self, value: Decimal) -> Decimal {
        match self {
            Self::Ceiling => value.ceil(),
            Self::Floor => value.floor(),
            Self::Nearest => value.round(),
            Self::Exact => value,
        }
    }
}

/// Result of [`evaluate_or_raw`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FormulaValue {
    Number(Decimal),
    /// The formula text, returned unchanged because it did not evaluate.
    Raw(String),
}

impl FormulaValue {
    pub fn number(&self) -> Option<Decimal> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Raw(_) => None,
        }
    }

    /// Integer value, if numeric and representable.
    pub fn as_i32(&self) -> Option<i32> {
        self.number().and_then(|n| n.to_i32())
    }

    pub fn is_raw(&self) -> bool {
        matches!(self, Self::Raw(_))
    }
}

impl fmt::Display for FormulaValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{}", n.normalize()),
            Self::Raw(text) => f.write_str(text),
        }
    }
}

// ============================================================================
// Entry points
// ============================================================================

/// Parses and evaluates `input`.
pub fn evaluate(input: &str, vars: &dyn VariableSource) -> Result<Decimal, FormulaError> {
    parse(input)?.evaluate(vars)
}

/// Parses, evaluates and rounds `input`.
pub fn evaluate_rounded(
    input: &str,
    vars: &dyn VariableSource,
    rounding: Rounding,
) -> Result<Decimal, FormulaError> {
    evaluate(input, vars).map(|value| rounding.apply(value))
}

/// Evaluates `input`, falling back to the original text on any error.
pub fn evaluate_or_raw(input: &str, vars: &dyn VariableSource, rounding: Rounding) -> FormulaValue {
    match evaluate_rounded(input, vars, rounding) {
        Ok(value) => FormulaValue::Number(value),
        Err(err) => {
            tracing::debug!(formula = input, error = %err, "formula kept as text");
            FormulaValue::Raw(input.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn str_five() -> HashMap<&'static str, i32> {
        HashMap::from([("STR", 5), ("ASTRAL", 100)])
    }

    #[test]
    fn weapon_damage_formula() {
        let value = evaluate_or_raw("STR+2", &str_five(), Rounding::Ceiling);
        assert_eq!(value, FormulaValue::Number(Decimal::from(7)));
        assert_eq!(format!("{value}P"), "7P");
    }

    #[test]
    fn evaluation_is_idempotent() {
        let vars = str_five();
        let first = evaluate("STR+2", &vars);
        let second = evaluate("STR+2", &vars);
        assert_eq!(first, second);
    }

    #[test]
    fn prefix_collision_is_impossible() {
        assert_eq!(evaluate("ASTRAL-STR", &str_five()), Ok(Decimal::from(95)));
    }

    #[test]
    fn min_call_inside_arithmetic() {
        assert_eq!(evaluate("min(4,2,9)*3+1", &str_five()), Ok(Decimal::from(7)));
    }

    #[test]
    fn non_numeric_concepts_fall_back_to_text() {
        let value = evaluate_or_raw("Grenade", &str_five(), Rounding::Ceiling);
        assert_eq!(value, FormulaValue::Raw("Grenade".into()));
        assert_eq!(value.to_string(), "Grenade");
        assert!(value.as_i32().is_none());
    }

    #[test]
    fn rounding_modes() {
        let half = Decimal::new(25, 1);
        assert_eq!(Rounding::Ceiling.apply(half), Decimal::from(3));
        assert_eq!(Rounding::Floor.apply(half), Decimal::from(2));
        assert_eq!(Rounding::Nearest.apply(half), Decimal::from(2));
        assert_eq!(Rounding::Exact.apply(half), half);
    }

    #[test]
    fn closures_and_layers_resolve_variables() {
        let base = LookupFn(|name: &str| (name == "BODBase").then(|| Decimal::from(3)));
        let vars = str_five();
        let layered = Layered {
            primary: &vars,
            fallback: &base,
        };
        assert_eq!(evaluate("STR+{BODBase}", &layered), Ok(Decimal::from(8)));
    }

    #[test]
    fn errors_are_recoverable() {
        let err = evaluate("1/0", &str_five()).unwrap_err();
        assert!(err.severity().is_recoverable());
        assert_eq!(err.error_code(), "FORMULA_DIVISION_BY_ZERO");
    }

    #[test]
    fn runaway_nesting_falls_back_to_text() {
        let nested = format!("{}1{}", "(".repeat(100_000), ")".repeat(100_000));
        let value = evaluate_or_raw(&nested, &str_five(), Rounding::Ceiling);
        assert_eq!(value, FormulaValue::Raw(nested.clone()));

        let err = evaluate(&nested, &str_five()).unwrap_err();
        assert_eq!(err.error_code(), "FORMULA_TOO_DEEP");
    }
}
