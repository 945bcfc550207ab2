//! Rollback points: pre-bump cookbook pins of one environment.
//!
//! Each point is `<destination>/<unix timestamp>.json`:
//!
//! ```json
//! {
//!   "environment": "prod",
//!   "cookbook_versions": { "nginx": "= 1.1.0" }
//! }
//! ```
//!
//! Points are written once and never modified.

use alignment::Reporter;
use anyhow::{Context, Result};
use chefkit::Client;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use thiserror::Error;

/// A stored point is missing or unreadable
#[derive(Debug, Error)]
pub enum RollbackError {
    #[error("could not load rollback point {0}")]
    NotFound(u64),

    #[error("rollback point {identifier} is invalid: {message}")]
    Invalid { identifier: u64, message: String },
}

/// Pins of `environment` before a bump
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollbackSnapshot {
    #[serde(skip)]
    pub identifier: u64,
    pub environment: String,
    pub cookbook_versions: BTreeMap<String, String>,
}

impl RollbackSnapshot {
    /// A snapshot identified by the current time
    pub fn now(environment: impl Into<String>, cookbook_versions: BTreeMap<String, String>) -> Self {
        Self {
            identifier: Local::now().timestamp().max(0) as u64,
            environment: environment.into(),
            cookbook_versions,
        }
    }
}

/// Human-readable local time for an identifier
pub fn format_identifier(identifier: u64) -> String {
    i64::try_from(identifier)
        .ok()
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
        .map(|utc| {
            utc.with_timezone(&Local)
                .format("%Y-%m-%d %H:%M:%S %z")
                .to_string()
        })
        .unwrap_or_else(|| "unknown time".to_string())
}

/// Directory of rollback points
#[derive(Debug, Clone)]
pub struct RollbackStore {
    destination: PathBuf,
}

impl RollbackStore {
    pub fn new(destination: impl Into<PathBuf>) -> Self {
        Self {
            destination: destination.into(),
        }
    }

    fn path_for(&self, identifier: u64) -> PathBuf {
        self.destination.join(format!("{identifier}.json"))
    }

    /// Write `snapshot`, returning the identifier it was stored under.
    ///
    /// When the snapshot's identifier is taken, the next free one is used.
    pub fn save(&self, snapshot: &RollbackSnapshot) -> Result<u64> {
        fs::create_dir_all(&self.destination).with_context(|| {
            format!(
                "Could not create rollback directory {}",
                self.destination.display()
            )
        })?;

        let mut identifier = snapshot.identifier;
        while self.path_for(identifier).exists() {
            identifier += 1;
        }

        let path = self.path_for(identifier);
        let mut content = serde_json::to_string_pretty(snapshot)?;
        content.push('\n');
        fs::write(&path, content).with_context(|| format!("Could not write {}", path.display()))?;
        log::info!("saved rollback point {}", path.display());
        Ok(identifier)
    }

    /// Stored identifiers, oldest first
    pub fn list(&self) -> Result<Vec<u64>> {
        if !self.destination.is_dir() {
            return Ok(Vec::new());
        }
        let mut identifiers = Vec::new();
        for entry in fs::read_dir(&self.destination)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            if let Some(id) = path
                .file_stem()
                .and_then(|s| s.to_str())
                .and_then(|s| s.parse::<u64>().ok())
            {
                identifiers.push(id);
            }
        }
        identifiers.sort_unstable();
        Ok(identifiers)
    }

    /// Read one point
    pub fn load(&self, identifier: u64) -> Result<RollbackSnapshot, RollbackError> {
        let content = fs::read_to_string(self.path_for(identifier))
            .map_err(|_| RollbackError::NotFound(identifier))?;
        let mut snapshot: RollbackSnapshot =
            serde_json::from_str(&content).map_err(|e| RollbackError::Invalid {
                identifier,
                message: e.to_string(),
            })?;
        snapshot.identifier = identifier;
        Ok(snapshot)
    }

    /// Put every recorded pin back on the live environment and save it.
    ///
    /// Cookbooks the point does not mention keep their current pin.
    pub fn restore_to(
        &self,
        identifier: u64,
        client: &Client,
        reporter: &mut dyn Reporter,
    ) -> Result<RollbackSnapshot> {
        let snapshot = self.load(identifier)?;
        let mut environment = client
            .environment(&snapshot.environment)
            .with_context(|| format!("Could not load environment {}", snapshot.environment))?;

        for (cookbook, version) in &snapshot.cookbook_versions {
            environment
                .cookbook_versions
                .insert(cookbook.clone(), version.clone());
            reporter.item(&format!("Setting {cookbook} to version {version}"));
        }

        client
            .save_environment(&environment)
            .with_context(|| format!("Could not save environment {}", environment.name))?;
        Ok(snapshot)
    }
}
