//! Centralized path resolution for sharp
//!
//! # Environment Variables
//!
//! - `SHARP_CHEF_DIR` - Override the chef directory (where `knife.rb` and
//!   `knife-<server>.rb` live)
//! - `SHARP_CONFIG` - Use exactly this configuration file
//!
//! # Config File Resolution
//!
//! 1. `SHARP_CONFIG` if set, and nothing else
//! 2. `/etc/sharp-config.yml`, then `<chef dir>/sharp-config.yml`; the
//!    later file wins when both load

use anyhow::{Context, Result};
use std::path::PathBuf;

/// Environment variable for chef directory override
pub const ENV_CHEF_DIR: &str = "SHARP_CHEF_DIR";

/// Environment variable for the configuration file
pub const ENV_CONFIG: &str = "SHARP_CONFIG";

/// System-wide configuration file
pub const SYSTEM_CONFIG: &str = "/etc/sharp-config.yml";

/// Configuration file name inside the chef directory
pub const CONFIG_FILE_NAME: &str = "sharp-config.yml";

/// Get the chef directory path
///
/// Priority:
/// 1. `SHARP_CHEF_DIR` env var
/// 2. `~/.chef`
pub fn chef_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var(ENV_CHEF_DIR) {
        let path = expand(&dir);
        log::debug!("Using chef dir from {}: {}", ENV_CHEF_DIR, path.display());
        return Ok(path);
    }

    let home = dirs::home_dir().context("Could not determine home directory")?;
    Ok(home.join(".chef"))
}

/// Configuration files to try, in load order
pub fn config_candidates() -> Result<Vec<PathBuf>> {
    if let Ok(file) = std::env::var(ENV_CONFIG) {
        let path = expand(&file);
        log::debug!("Using config file from {}: {}", ENV_CONFIG, path.display());
        return Ok(vec![path]);
    }

    Ok(vec![
        PathBuf::from(SYSTEM_CONFIG),
        chef_dir()?.join(CONFIG_FILE_NAME),
    ])
}

/// Expand ~ and environment variables in a path string.
pub fn expand(path: &str) -> PathBuf {
    let expanded = shellexpand::full(path).unwrap_or(std::borrow::Cow::Borrowed(path));
    PathBuf::from(expanded.as_ref())
}
