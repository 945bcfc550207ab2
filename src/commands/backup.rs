//! `sharp backup`: dump roles, environments and data bags to disk.

use crate::config::SharpConfig;
use crate::server_context::KnifeDir;
use crate::ui;
use alignment::Reporter;
use anyhow::{Context, Result, bail};
use chefkit::Client;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

pub fn run(reporter: &mut dyn Reporter) -> Result<()> {
    let config = SharpConfig::load()?;
    let root = config.backup_dir()?;
    let connection = KnifeDir::open()?.connection()?;
    let client = Client::http(
        &connection.server_url,
        connection.node_name.as_deref().unwrap_or_default(),
    );

    let path = backup(&client, &root, chrono::Local::now().timestamp(), reporter)?;
    ui::success(&format!("Backup written to {}", path.display()));
    Ok(())
}

/// Write every role, environment and data bag item under
/// `<root>/backup-<timestamp>`.
///
/// A failing object is reported and skipped; an existing backup directory
/// is never overwritten.
pub fn backup(
    client: &Client,
    root: &Path,
    timestamp: i64,
    reporter: &mut dyn Reporter,
) -> Result<PathBuf> {
    let path = root.join(format!("backup-{timestamp}"));
    if path.exists() {
        bail!("Backup path ({}) exists. Will not overwrite.", path.display());
    }

    reporter.item("Backing up roles");
    let roles = create(&path.join("roles"))?;
    for name in client.backend().list_roles()? {
        let dumped = client
            .backend()
            .load_role(&name)
            .map_err(anyhow::Error::from)
            .and_then(|role| write_json(&roles.join(format!("{name}.json")), &role));
        if let Err(e) = dumped {
            reporter.error(&format!("Unable to dump {name} role ({e:#})"));
        }
    }

    reporter.item("Backing up environments");
    let environments = create(&path.join("environments"))?;
    for name in client.backend().list_environments()? {
        let dumped = client
            .backend()
            .load_environment(&name)
            .map_err(anyhow::Error::from)
            .and_then(|env| write_json(&environments.join(format!("{name}.json")), &env));
        if let Err(e) = dumped {
            reporter.error(&format!("Unable to dump {name} environment ({e:#})"));
        }
    }

    reporter.item("Backing up databags");
    let databags = create(&path.join("databags"))?;
    for bag in client.data_bags()? {
        let dir = create(&databags.join(&bag))?;
        for id in client.backend().list_data_bag_items(&bag)? {
            let dumped = client
                .backend()
                .load_data_bag_item(&bag, &id)
                .map_err(anyhow::Error::from)
                .and_then(|item| write_json(&dir.join(format!("{id}.json")), &item.raw_data));
            if let Err(e) = dumped {
                reporter.error(&format!("Unable to dump item {id} from databag {bag} ({e:#})"));
            }
        }
    }

    log::info!("backup written to {}", path.display());
    Ok(path)
}

fn create(dir: &Path) -> Result<PathBuf> {
    fs::create_dir_all(dir).with_context(|| format!("Could not create {}", dir.display()))?;
    Ok(dir.to_path_buf())
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let mut content = serde_json::to_string_pretty(value)?;
    content.push('\n');
    fs::write(path, content).with_context(|| format!("Could not write {}", path.display()))
}
