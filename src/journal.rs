//! Audit log and the journal handed to controllers.

use crate::notify::Notifiers;
use crate::ui;
use alignment::{Bump, Journal};
use anyhow::{Context, Result};
use chrono::{Local, SecondsFormat};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Append-only audit file, one line per action:
/// `[<RFC 3339 timestamp>] <user>: <message>`
#[derive(Debug, Clone)]
pub struct AuditLog {
    path: Option<PathBuf>,
    user: String,
}

impl AuditLog {
    /// Log to `path`, or nowhere when `None`.
    pub fn new(path: Option<PathBuf>, user: impl Into<String>) -> Self {
        Self {
            path,
            user: user.into(),
        }
    }

    /// The acting user: the server context's node name, else `$USER`
    pub fn user_for(node_name: Option<&str>) -> String {
        node_name
            .map(ToString::to_string)
            .or_else(|| std::env::var("USER").ok())
            .unwrap_or_else(|| "unknown".to_string())
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Format one line
    pub fn line(&self, message: &str) -> String {
        format!(
            "[{}] {}: {}",
            Local::now().to_rfc3339_opts(SecondsFormat::Secs, false),
            self.user,
            message
        )
    }

    /// Append a line for `message`
    pub fn append(&self, message: &str) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Could not create {}", parent.display()))?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("Could not open {}", path.display()))?;
        writeln!(file, "{}", self.line(message))?;
        Ok(())
    }
}

/// Journal writing to the audit log and announcing bumps
pub struct SharpJournal {
    audit: AuditLog,
    notifiers: Notifiers,
}

impl SharpJournal {
    pub fn new(audit: AuditLog, notifiers: Notifiers) -> Self {
        Self { audit, notifiers }
    }
}

impl Journal for SharpJournal {
    fn record(&mut self, message: &str) {
        if let Err(e) = self.audit.append(message) {
            ui::error(&format!("Unable to log '{message}' ({e:#})"));
        }
    }

    fn bumped(&mut self, bump: &Bump) {
        for (carrier, error) in self.notifiers.notify(bump) {
            ui::error(&format!("Could not notify {carrier} ({error})"));
        }
    }
}
