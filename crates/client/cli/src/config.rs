//! Environment-driven configuration for the `sheet` binary.

use std::env;
use std::path::PathBuf;

/// Settings resolved from the environment (and `.env`) before command-line
/// flags are applied.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CliConfig {
    /// Directory holding `options.toml`, `metatypes.ron`, `weapons.ron` and
    /// `characters/`.
    pub data_dir: Option<PathBuf>,
    /// Character opened when a command does not name one.
    pub character: Option<String>,
    /// Log filter directive, e.g. `sheet_core=debug`.
    pub log: Option<String>,
}

impl CliConfig {
    /// Construct configuration from process environment variables.
    ///
    /// Environment variables:
    /// - `SHEET_DATA_DIR` - Rule data directory (default: platform-specific)
    /// - `SHEET_CHARACTER` - Default character name or path
    /// - `SHEET_LOG` - Log filter (default: `info`, `RUST_LOG` also honored)
    pub fn from_env() -> Self {
        Self {
            data_dir: read_env::<PathBuf>("SHEET_DATA_DIR"),
            character: read_env::<String>("SHEET_CHARACTER").filter(|name| !name.is_empty()),
            log: read_env::<String>("SHEET_LOG"),
        }
    }

    /// Flag value if given, then the environment, then the platform data
    /// directory.
    pub fn resolve_data_dir(&self, flag: Option<PathBuf>) -> PathBuf {
        flag.or_else(|| self.data_dir.clone())
            .unwrap_or_else(default_data_dir)
    }

    pub fn resolve_character(&self, flag: Option<String>) -> anyhow::Result<String> {
        flag.or_else(|| self.character.clone()).ok_or_else(|| {
            anyhow::anyhow!("No character given; pass --character or set SHEET_CHARACTER")
        })
    }
}

/// Platform data directory for sheet content.
///
/// Follows platform conventions:
/// - macOS: `~/Library/Application Support/sheet`
/// - Linux: `~/.local/share/sheet` (or `$XDG_DATA_HOME/sheet`)
/// - Windows: `%APPDATA%\sheet`
/// - Fallback: `./data`
pub fn default_data_dir() -> PathBuf {
    directories::ProjectDirs::from("", "", "sheet")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("./data"))
}

fn read_env<T>(key: &str) -> Option<T>
where
    T: std::str::FromStr,
{
    env::var(key).ok()?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_environment() {
        let config = CliConfig {
            data_dir: Some(PathBuf::from("/env/data")),
            character: Some("razor".into()),
            log: None,
        };

        assert_eq!(config.resolve_data_dir(None), PathBuf::from("/env/data"));
        assert_eq!(
            config.resolve_data_dir(Some(PathBuf::from("/flag"))),
            PathBuf::from("/flag")
        );
        assert_eq!(config.resolve_character(None).unwrap(), "razor");
        assert_eq!(config.resolve_character(Some("ghost".into())).unwrap(), "ghost");
    }

    #[test]
    fn missing_character_is_an_error() {
        let config = CliConfig::default();
        assert!(config.resolve_character(None).is_err());
    }
}
