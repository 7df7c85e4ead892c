//! Evaluate an ad-hoc formula.

use anyhow::{Context, Result};
use clap::Parser;
use console::style;
use sheet_core::Rounding;
use sheet_core::formula::{self, VariableSource};

use super::Session;

/// Evaluate a formula against a character
#[derive(Parser)]
pub struct Eval {
    /// Formula, e.g. `"(STR + BOD) / 2"` or `"max({AGIBase}, 3) * 1.5"`
    #[arg(value_name = "FORMULA")]
    formula: String,

    /// Character name (under `characters/`) or path to a RON file
    #[arg(short, long, value_name = "CHARACTER")]
    character: Option<String>,

    /// Resolve variables through this weapon (adds `Physical`, `Missile` and
    /// throwing strength)
    #[arg(short, long, value_name = "WEAPON")]
    weapon: Option<String>,

    /// Rounding applied to the result
    #[arg(short, long, default_value = "exact")]
    rounding: Rounding,
}

impl Eval {
    pub fn execute(self, session: &Session) -> Result<()> {
        let open = session.open(self.character)?;
        let character = &open.character;

        let value = match &self.weapon {
            Some(name) => {
                let weapon = character
                    .weapons()
                    .find(|weapon| weapon.name().eq_ignore_ascii_case(name))
                    .with_context(|| format!("{} has no weapon named {}", open.name, name))?;
                evaluate(&self.formula, &weapon, self.rounding)?
            }
            None => evaluate(&self.formula, character, self.rounding)?,
        };

        println!("{} = {}", style(&self.formula).cyan(), style(value).bold());
        Ok(())
    }
}

fn evaluate(input: &str, vars: &dyn VariableSource, rounding: Rounding) -> Result<String> {
    let value = formula::evaluate_rounded(input, vars, rounding)
        .with_context(|| format!("Failed to evaluate formula: {}", input))?;
    Ok(value.normalize().to_string())
}
