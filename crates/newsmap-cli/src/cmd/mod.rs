pub mod article;
pub mod build;
pub mod init;
pub mod serve;
pub mod status;

use newsmap_core::config::{Config, WarnLevel};
use std::path::Path;

/// Load the config and refuse to continue on error-level problems.
pub(crate) fn load_checked_config(root: &Path) -> anyhow::Result<Config> {
    let config = Config::load(root)?;
    let mut fatal = Vec::new();
    for w in config.validate() {
        match w.level {
            WarnLevel::Warning => tracing::warn!("config: {}", w.message),
            WarnLevel::Error => fatal.push(w.message),
        }
    }
    if !fatal.is_empty() {
        anyhow::bail!("invalid config: {}", fatal.join("; "));
    }
    Ok(config)
}
