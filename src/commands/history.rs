//! `sharp history`: print the audit log.

use crate::config::SharpConfig;
use crate::error::ConfigError;
use crate::paths;
use anyhow::{Context, Result};
use std::fs;
use std::io::{self, Write};
use std::path::Path;

pub fn run() -> Result<()> {
    let config = SharpConfig::load()?;
    let path = config
        .logging
        .destination
        .as_deref()
        .map(paths::expand)
        .ok_or(ConfigError::NoLogDestination)?;
    show(&path, &mut io::stdout().lock())
}

/// Copy the log at `path` to `out`, line for line
pub fn show(path: &Path, out: &mut impl Write) -> Result<()> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Could not read audit log {}", path.display()))?;
    for line in content.lines() {
        writeln!(out, "{line}")?;
    }
    Ok(())
}
