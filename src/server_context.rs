//! Server contexts: `knife.rb` is a symlink to one of `knife-<name>.rb`.

use crate::error::ConfigError;
use crate::paths;
use anyhow::{Context, Result, bail};
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};

const KNIFE_FILE: &str = "knife.rb";
const SERVER_FILE: &str = r"^knife-(\w+)\.rb$";
const SERVER_NAME: &str = r"^\w+$";
const SETTING: &str = r#"^\s*(\w+)\s+['"]([^'"]*)['"]"#;

/// Connection settings read from the active knife file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Connection {
    /// Active server context, if `knife.rb` is a symlink to a known file
    pub server: Option<String>,
    pub server_url: String,
    pub node_name: Option<String>,
}

/// The directory holding `knife.rb` and its alternatives
#[derive(Debug, Clone)]
pub struct KnifeDir {
    dir: PathBuf,
}

impl KnifeDir {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// The configured chef directory
    pub fn open() -> Result<Self> {
        Ok(Self::new(paths::chef_dir()?))
    }

    /// `knife.rb`, or `knife-<server>.rb`
    pub fn knife_conf(&self, server: Option<&str>) -> PathBuf {
        match server {
            Some(name) => self.dir.join(format!("knife-{name}.rb")),
            None => self.dir.join(KNIFE_FILE),
        }
    }

    /// Fail when `knife.rb` is a regular file: switching would destroy it.
    pub fn ensure_switchable(&self) -> Result<()> {
        let conf = self.knife_conf(None);
        let is_plain_file = fs::symlink_metadata(&conf)
            .map(|meta| !meta.file_type().is_symlink())
            .unwrap_or(false);
        if is_plain_file {
            bail!(
                "{} is not a symlink.\nCopy it to {} and try again.",
                conf.display(),
                self.knife_conf(Some("<server name>")).display()
            );
        }
        Ok(())
    }

    /// Server name encoded in a knife file name
    pub fn extract_server(path: &Path) -> Option<String> {
        let name = path.file_name()?.to_str()?;
        let pattern = Regex::new(SERVER_FILE).ok()?;
        pattern.captures(name).map(|caps| caps[1].to_string())
    }

    /// The server `knife.rb` points at
    pub fn current_server(&self) -> Option<String> {
        let target = fs::read_link(self.knife_conf(None)).ok()?;
        Self::extract_server(&target)
    }

    /// Every `knife-<name>.rb`, sorted by name
    pub fn servers(&self) -> Result<Vec<(String, PathBuf)>> {
        if !self.dir.is_dir() {
            return Ok(Vec::new());
        }
        let mut servers = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if let Some(name) = Self::extract_server(&path) {
                servers.push((name, path));
            }
        }
        servers.sort();
        Ok(servers)
    }

    /// Point `knife.rb` at `knife-<server>.rb`
    pub fn switch(&self, server: &str) -> Result<()> {
        if !Regex::new(SERVER_NAME)?.is_match(server) {
            bail!("Invalid server name {server:?}: use letters, digits and underscores only.");
        }
        let target = self.knife_conf(Some(server));
        if !target.is_file() {
            bail!("Knife configuration for {server} not found.");
        }
        let link = self.knife_conf(None);
        if fs::symlink_metadata(&link).is_ok() {
            fs::remove_file(&link).with_context(|| format!("Could not remove {}", link.display()))?;
        }
        symlink(&target, &link)
            .with_context(|| format!("Could not link {} to {}", link.display(), target.display()))?;
        log::info!("{} -> {}", link.display(), target.display());
        Ok(())
    }

    /// Read the active server's URL and node name
    pub fn connection(&self) -> Result<Connection> {
        let conf = self.knife_conf(None);
        let content = fs::read_to_string(&conf)
            .with_context(|| format!("Cannot find knife configuration {}", conf.display()))?;
        let (server_url, node_name) = parse_knife(&content);
        let server_url = server_url.ok_or_else(|| ConfigError::NoServerUrl(conf.clone()))?;
        Ok(Connection {
            server: self.current_server(),
            server_url,
            node_name,
        })
    }
}

/// `chef_server_url` and `node_name` from knife file content
pub fn parse_knife(content: &str) -> (Option<String>, Option<String>) {
    let Ok(pattern) = Regex::new(SETTING) else {
        return (None, None);
    };
    let mut server_url = None;
    let mut node_name = None;
    for caps in content.lines().filter_map(|line| pattern.captures(line)) {
        match &caps[1] {
            "chef_server_url" => server_url = Some(caps[2].to_string()),
            "node_name" => node_name = Some(caps[2].to_string()),
            _ => {}
        }
    }
    (server_url, node_name)
}

#[cfg(unix)]
fn symlink(target: &Path, link: &Path) -> std::io::Result<()> {
    std::os::unix::fs::symlink(target, link)
}

#[cfg(windows)]
fn symlink(target: &Path, link: &Path) -> std::io::Result<()> {
    std::os::windows::fs::symlink_file(target, link)
}
