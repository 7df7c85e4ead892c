//! Karma ledger commands.

use anyhow::Result;
use clap::Parser;
use console::style;
use sheet_core::{ExpenseId, ExpenseKind};

use super::Session;

/// List recorded karma expenses
#[derive(Parser)]
pub struct Expenses {
    /// Character name (under `characters/`) or path to a RON file
    #[arg(short, long, value_name = "CHARACTER")]
    character: Option<String>,
}

impl Expenses {
    pub fn execute(self, session: &Session) -> Result<()> {
        let open = session.open(self.character)?;
        let ledger = open.character.expenses();

        if ledger.is_empty() {
            println!("{}", style("No expenses recorded").dim());
            return Ok(());
        }
        for entry in ledger.entries() {
            let undo = if entry.undo.is_some() { "" } else { " (final)" };
            println!(
                "  {:>4}  {:>6} {:<5} {}{}",
                entry.id.0, entry.amount, entry.kind, entry.reason, undo
            );
        }
        println!(
            "{} {} karma",
            style("Total:").bold().cyan(),
            ledger.total(ExpenseKind::Karma)
        );
        Ok(())
    }
}

/// Undo a recorded expense
#[derive(Parser)]
pub struct Undo {
    /// Expense number as shown by `sheet expenses`
    #[arg(value_name = "ID")]
    id: u32,

    /// Character name (under `characters/`) or path to a RON file
    #[arg(short, long, value_name = "CHARACTER")]
    character: Option<String>,
}

impl Undo {
    pub fn execute(self, session: &Session) -> Result<()> {
        let mut open = session.open(self.character)?;
        let id = ExpenseId(self.id);
        let reason = open
            .character
            .expenses()
            .get(id)
            .map(|entry| entry.reason.clone())
            .unwrap_or_default();

        open.character.undo_expense(id)?;
        open.save()?;

        println!(
            "{} {} ({} karma available)",
            style("Undone:").bold().green(),
            reason,
            open.character.karma()
        );
        Ok(())
    }
}
