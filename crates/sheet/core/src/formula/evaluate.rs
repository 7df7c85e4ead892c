//! AST evaluation over `Decimal`.

use rust_decimal::Decimal;

use super::parser::{BinaryOp, Expr, Function};
use super::{FormulaError, VariableSource};

// ============================================================================
// Evaluation
// ============================================================================

impl Expr {
    /// Evaluates the expression, resolving identifiers through `vars`.
    ///
    /// All arithmetic is checked; overflow and division by zero are errors.
    pub fn evaluate(&self, vars: &dyn VariableSource) -> Result<Decimal, FormulaError> {
        match self {
            Self::Number(n) => Ok(*n),

            Self::Variable(name) => vars
                .lookup(name)
                .ok_or_else(|| FormulaError::UnknownVariable(name.clone())),

            Self::Neg(inner) => Ok(-inner.evaluate(vars)?),

            Self::Binary { op, lhs, rhs } => {
                let lhs = lhs.evaluate(vars)?;
                let rhs = rhs.evaluate(vars)?;
                match op {
                    BinaryOp::Add => lhs.checked_add(rhs).ok_or(FormulaError::Overflow),
                    BinaryOp::Sub => lhs.checked_sub(rhs).ok_or(FormulaError::Overflow),
                    BinaryOp::Mul => lhs.checked_mul(rhs).ok_or(FormulaError::Overflow),
                    BinaryOp::Div => {
                        if rhs.is_zero() {
                            Err(FormulaError::DivisionByZero)
                        } else {
                            lhs.checked_div(rhs).ok_or(FormulaError::Overflow)
                        }
                    }
                }
            }

            Self::Call { function, args } => {
                let mut values = args.iter().map(|arg| arg.evaluate(vars));
                let first = values
                    .next()
                    .ok_or_else(|| FormulaError::EmptyArguments(function.to_string()))??;
                values.try_fold(first, |acc, next| {
                    let next = next?;
                    Ok(match function {
                        Function::Min => acc.min(next),
                        Function::Max => acc.max(next),
                    })
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::super::parse;
    use super::*;

    fn eval(input: &str, vars: &HashMap<&str, i32>) -> Result<Decimal, FormulaError> {
        parse(input)?.evaluate(vars)
    }

    #[test]
    fn arithmetic_follows_precedence() {
        let vars = HashMap::new();
        assert_eq!(eval("2+3*4", &vars), Ok(Decimal::from(14)));
        assert_eq!(eval("(2+3)*4", &vars), Ok(Decimal::from(20)));
        assert_eq!(eval("-2+5", &vars), Ok(Decimal::from(3)));
        assert_eq!(eval("7/2", &vars), Ok(Decimal::new(35, 1)));
    }

    #[test]
    fn min_and_max_fold_arguments() {
        let vars = HashMap::from([("STR", 5)]);
        assert_eq!(eval("min(4,2,9)", &vars), Ok(Decimal::from(2)));
        assert_eq!(eval("max(STR, 3) + 1", &vars), Ok(Decimal::from(6)));
        assert_eq!(eval("min(STR)", &vars), Ok(Decimal::from(5)));
    }

    #[test]
    fn unknown_variables_and_zero_division_fail() {
        let vars = HashMap::from([("STR", 5)]);
        assert_eq!(
            eval("STRX+1", &vars),
            Err(FormulaError::UnknownVariable("STRX".into()))
        );
        assert_eq!(eval("STR/0", &vars), Err(FormulaError::DivisionByZero));
        assert_eq!(eval("STR/(2-2)", &vars), Err(FormulaError::DivisionByZero));
    }
}
