//! Create a new character file.

use anyhow::Result;
use clap::Parser;
use console::style;
use sheet_content::CharacterLoader;
use sheet_core::SessionPhase;

use super::Session;

/// Create a blank character of a metatype
#[derive(Parser)]
pub struct New {
    /// Character name; saved as `characters/<NAME>.ron`
    #[arg(value_name = "NAME")]
    name: String,

    /// Metatype from `metatypes.ron`
    #[arg(short, long, default_value = "Human")]
    metatype: String,

    /// Starting karma
    #[arg(short, long, default_value_t = 0)]
    karma: i32,

    /// Start in career mode instead of creation
    #[arg(long)]
    career: bool,

    /// Replace an existing file
    #[arg(long)]
    force: bool,
}

impl New {
    pub fn execute(self, session: &Session) -> Result<()> {
        let path = session
            .data_dir()
            .join("characters")
            .join(format!("{}.ron", self.name));
        if path.exists() && !self.force {
            anyhow::bail!(
                "Character file already exists: {} (use --force to replace)",
                path.display()
            );
        }

        let mut character = session.factory().new_character(&self.metatype)?;
        character.set_karma(self.karma);
        if self.career {
            character.set_phase(SessionPhase::Career);
        }

        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        CharacterLoader::save(&path, &character.snapshot(&self.name))?;

        println!(
            "{} {} ({}) at {}",
            style("Created").bold().green(),
            self.name,
            self.metatype,
            path.display()
        );
        Ok(())
    }
}
