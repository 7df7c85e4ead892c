//! Print a character's derived values.

use anyhow::Result;
use clap::Parser;
use console::style;
use sheet_core::{Character, ExpenseKind};

use super::Session;

/// Print attributes, weapons and karma
#[derive(Parser)]
pub struct Show {
    /// Character name (under `characters/`) or path to a RON file
    #[arg(short, long, value_name = "CHARACTER")]
    character: Option<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "summary")]
    format: OutputFormat,
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum OutputFormat {
    /// Tables of attributes and weapons
    Summary,
    /// Full snapshot as JSON
    Json,
}

impl Show {
    pub fn execute(self, session: &Session) -> Result<()> {
        let open = session.open(self.character)?;
        match self.format {
            OutputFormat::Summary => print_summary(&open.name, &open.character),
            OutputFormat::Json => {
                let snapshot = open.character.snapshot(&open.name);
                println!("{}", serde_json::to_string_pretty(&snapshot)?);
            }
        }
        Ok(())
    }
}

fn print_summary(name: &str, character: &Character) {
    println!("{} {}", style("Character:").bold().cyan(), name);
    println!("{} {}", style("Phase:").bold().cyan(), character.phase());
    println!(
        "{} {} (spent {})",
        style("Karma:").bold().cyan(),
        character.karma(),
        -character.expenses().total(ExpenseKind::Karma)
    );
    println!();

    println!("{}", style("Attributes:").bold().yellow());
    println!(
        "  {:<6} {:>8} {:>14} {:>6}  {}",
        "ATTR", "VALUE", "LIMITS", "NEXT", "MODIFIERS"
    );
    for attribute in character.attributes() {
        let next = if attribute.can_upgrade_career() {
            attribute.upgrade_karma_cost().to_string()
        } else {
            "-".to_string()
        };
        println!(
            "  {:<6} {:>8} {:>14} {:>6}  {}",
            attribute.abbrev(),
            attribute.display_value(),
            attribute.augmented_metatype_limits(),
            next,
            attribute.tooltip()
        );
    }
    println!("  Physical limit: {}", character.physical_limit());
    println!();

    let mut weapons = character.weapons().peekable();
    if weapons.peek().is_none() {
        return;
    }
    println!("{}", style("Weapons:").bold().yellow());
    for weapon in weapons {
        println!(
            "  {} - DV {}, AP {}, Acc {}, Reach {}, Conceal {}, Avail {}, Cost {}¥",
            style(weapon.name()).bold(),
            weapon.display_damage(),
            weapon.total_ap(),
            weapon.total_accuracy(),
            weapon.total_reach(),
            weapon.display_concealability(),
            weapon.total_avail(),
            weapon.total_cost().round_dp(character.config().nuyen_decimals)
        );
        for accessory in weapon.weapon().installed_accessories() {
            println!("      + {}", accessory.name);
        }
        for underbarrel in weapon.underbarrel() {
            println!(
                "      > {} - DV {}, AP {}",
                underbarrel.name(),
                underbarrel.display_damage(),
                underbarrel.total_ap()
            );
        }
    }
}
