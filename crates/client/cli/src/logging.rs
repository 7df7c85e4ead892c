//! Logging setup.

use anyhow::Result;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Installs a stderr subscriber so command output on stdout stays clean.
///
/// Filter precedence: `directive` (from `SHEET_LOG`), then `RUST_LOG`, then
/// `info`.
pub fn setup_logging(directive: Option<&str>) -> Result<()> {
    let env_filter = match directive {
        Some(directive) => EnvFilter::try_new(directive)?,
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer)
        .try_init()?;

    tracing::debug!("Logging initialized");
    Ok(())
}
