//! Spend karma on an attribute.

use anyhow::Result;
use clap::Parser;
use console::style;

use super::Session;

/// Spend karma to raise an attribute
#[derive(Parser)]
pub struct Upgrade {
    /// Attribute abbreviation, e.g. `AGI`
    #[arg(value_name = "ATTRIBUTE")]
    attribute: String,

    /// Points to buy; stops early when karma or the maximum runs out
    #[arg(short = 'n', long, default_value_t = 1)]
    count: u32,

    /// Character name (under `characters/`) or path to a RON file
    #[arg(short, long, value_name = "CHARACTER")]
    character: Option<String>,

    /// Print the cost without saving
    #[arg(long)]
    dry_run: bool,
}

impl Upgrade {
    pub fn execute(self, session: &Session) -> Result<()> {
        let mut open = session.open(self.character)?;
        let abbrev = self.attribute.to_uppercase();

        let karma_before = open.character.karma();
        let before = open.character.attribute(&abbrev)?.value();
        let bought = open.character.upgrade_attribute(&abbrev, self.count)?;
        let after = open.character.attribute(&abbrev)?.value();
        let spent = karma_before - open.character.karma();

        if bought == 0 {
            let attribute = open.character.attribute(&abbrev)?;
            anyhow::bail!(
                "Cannot raise {} above {}: next point costs {} karma, {} available, maximum {}",
                abbrev,
                before,
                attribute.upgrade_karma_cost(),
                karma_before,
                attribute.total_maximum()
            );
        }

        println!(
            "{} {} {} -> {} for {} karma ({} left)",
            style("Upgraded").bold().green(),
            abbrev,
            before,
            after,
            spent,
            open.character.karma()
        );
        if bought < self.count {
            println!(
                "{} bought {} of {} requested points",
                style("Note:").yellow(),
                bought,
                self.count
            );
        }

        if self.dry_run {
            println!("{}", style("Dry run, nothing saved").dim());
            return Ok(());
        }
        open.save()?;
        tracing::info!(path = %open.path.display(), "character saved");
        Ok(())
    }
}
