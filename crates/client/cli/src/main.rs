//! `sheet` command-line client.
//!
//! Loads rule content and a saved character, then prints derived values,
//! evaluates formulas or spends karma.
//!
//! ```bash
//! sheet --data-dir crates/sheet/content/data show -c street_samurai
//! sheet eval "(STR + BOD) / 2" -c street_samurai
//! sheet upgrade AGI -c street_samurai
//! ```

mod commands;
mod config;
mod logging;

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use commands::{Eval, Expenses, New, Show, Undo, Upgrade};
use config::CliConfig;

/// Character sheet calculator
#[derive(Parser)]
#[command(name = "sheet")]
#[command(about = "Derived values and karma spending for character sheets", long_about = None)]
#[command(version)]
struct Cli {
    /// Rule data directory (overrides SHEET_DATA_DIR)
    #[arg(short, long, global = true, value_name = "DIR")]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Parser)]
enum Command {
    /// Print attributes, weapons and karma
    Show(Show),

    /// Evaluate a formula against a character
    Eval(Eval),

    /// Spend karma to raise an attribute
    Upgrade(Upgrade),

    /// List recorded karma expenses
    Expenses(Expenses),

    /// Undo a recorded expense
    Undo(Undo),

    /// Create a blank character of a metatype
    New(New),
}

fn main() -> Result<()> {
    // Load .env file if it exists (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let config = CliConfig::from_env();
    logging::setup_logging(config.log.as_deref())?;

    let cli = Cli::parse();
    let data_dir = config.resolve_data_dir(cli.data_dir);
    tracing::debug!(data_dir = %data_dir.display(), "using data directory");

    let session = commands::Session::new(config, data_dir);
    match cli.command {
        Command::Show(cmd) => cmd.execute(&session),
        Command::Eval(cmd) => cmd.execute(&session),
        Command::Upgrade(cmd) => cmd.execute(&session),
        Command::Expenses(cmd) => cmd.execute(&session),
        Command::Undo(cmd) => cmd.execute(&session),
        Command::New(cmd) => cmd.execute(&session),
    }
}
