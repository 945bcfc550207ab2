//! `sharp server [NAME] [--machine]`

use crate::cli::ServerArgs;
use crate::server_context::KnifeDir;
use crate::ui;
use anyhow::Result;
use std::io::{self, Write};

/// List contexts or switch to one.
///
/// Returns false when the requested server has no knife file.
pub fn run(args: ServerArgs) -> Result<bool> {
    let knife = KnifeDir::open()?;
    knife.ensure_switchable()?;

    let mut out = io::stdout().lock();
    let Some(name) = args.name else {
        list(&knife, args.machine, &mut out)?;
        return Ok(true);
    };

    match knife.switch(&name) {
        Ok(()) => {
            writeln!(out, "The knife configuration has been updated to use {name}.")?;
            Ok(true)
        }
        Err(e) => {
            ui::error(&format!("{e:#}"));
            list(&knife, args.machine, &mut out)?;
            Ok(false)
        }
    }
}

/// Every known context, the active one marked with `>>`.
///
/// In machine mode only the active name is printed, or `invalid`.
pub fn list(knife: &KnifeDir, machine: bool, out: &mut impl Write) -> Result<()> {
    let current = knife.current_server();
    if machine {
        writeln!(out, "{}", current.as_deref().unwrap_or("invalid"))?;
        return Ok(());
    }

    let servers = knife.servers()?;
    if servers.is_empty() {
        writeln!(out, "No knife server configuration file found.")?;
        return Ok(());
    }
    writeln!(out, "Available servers:")?;
    for (server, file) in servers {
        let prefix = if current.as_deref() == Some(server.as_str()) {
            ">> "
        } else {
            "   "
        };
        writeln!(out, "{prefix}{server} ({})", file.display())?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn listing(knife: &KnifeDir, machine: bool) -> String {
        let mut out = Vec::new();
        list(knife, machine, &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_empty_directory() {
        let dir = TempDir::new().unwrap();
        let knife = KnifeDir::new(dir.path());
        assert_eq!(listing(&knife, false), "No knife server configuration file found.\n");
        assert_eq!(listing(&knife, true), "invalid\n");
    }

    #[cfg(unix)]
    #[test]
    fn test_active_server_is_marked() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("knife-prod.rb"), "").unwrap();
        fs::write(dir.path().join("knife-qa.rb"), "").unwrap();
        let knife = KnifeDir::new(dir.path());
        knife.switch("qa").unwrap();

        let out = listing(&knife, false);
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[0], "Available servers:");
        assert!(lines[1].starts_with("   prod ("));
        assert!(lines[2].starts_with(">> qa ("));
        assert_eq!(listing(&knife, true), "qa\n");
    }
}
