//! Local working-copy reader.
//!
//! A chef-repo checkout keeps one directory per kind:
//!
//! ```text
//! cookbooks/<name>/metadata.{json,rb}
//! roles/<name>.json
//! environments/<name>.json
//! data_bags/<bag>/<item>.json
//! ```
//!
//! Listing a kind whose directory is missing fails with
//! [`Error::PathNotFound`]. Files that cannot be parsed are reported in
//! [`Listing::unreadable`] and do not stop the rest of the listing.

use crate::error::{Error, Result};
use crate::types::{Cookbook, DataBagItem, Environment, Role};
use regex::Regex;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

/// Version used when a cookbook declares none.
pub const DEFAULT_COOKBOOK_VERSION: &str = "0.0.0";

/// `version '1.2.0'` line of a `metadata.rb`.
const METADATA_VERSION: &str = r#"(?m)^\s*version\s+['"]([^'"]+)['"]"#;

/// Items read from disk, plus the files that failed to parse.
#[derive(Debug)]
pub struct Listing<K, T> {
    /// Parsed items by key.
    pub items: BTreeMap<K, T>,
    /// `(file, message)` for every file that could not be read.
    pub unreadable: Vec<(PathBuf, String)>,
}

impl<K: Ord, T> Listing<K, T> {
    /// A listing with no failures.
    pub fn new(items: BTreeMap<K, T>) -> Self {
        Self {
            items,
            unreadable: Vec::new(),
        }
    }
}

impl<K: Ord, T> Default for Listing<K, T> {
    fn default() -> Self {
        Self::new(BTreeMap::new())
    }
}

/// Data bag items keyed by `(bag, id)`.
pub type DataBagListing = Listing<(String, String), DataBagItem>;

/// Read access to the working copy, plus the two writes `--dump-remote-only` needs.
pub trait LocalRepo {
    /// Cookbooks by name.
    fn cookbooks(&self) -> Result<Listing<String, Cookbook>>;

    /// Roles by name.
    fn roles(&self) -> Result<Listing<String, Role>>;

    /// Environments by name.
    fn environments(&self) -> Result<Listing<String, Environment>>;

    /// Every data bag item.
    fn data_bag_items(&self) -> Result<DataBagListing>;

    /// Write a role into the working copy, returning where it went.
    fn write_role(&self, role: &Role) -> Result<PathBuf>;

    /// Write a data bag item into the working copy, creating the bag directory.
    fn write_data_bag_item(&self, item: &DataBagItem) -> Result<PathBuf>;

    /// Directory listed for a kind, for messages.
    fn describe_path(&self, kind: RepoDir) -> String;
}

/// The per-kind directories of a working copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepoDir {
    /// `cookbooks/`
    Cookbooks,
    /// `data_bags/`
    DataBags,
    /// `roles/`
    Roles,
    /// `environments/`
    Environments,
}

/// Where each kind lives on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoPaths {
    /// Cookbook directory.
    pub cookbooks: PathBuf,
    /// Data bag directory.
    pub data_bags: PathBuf,
    /// Role directory.
    pub roles: PathBuf,
    /// Environment directory.
    pub environments: PathBuf,
}

impl RepoPaths {
    /// The conventional layout under a checkout root.
    pub fn under(root: &Path) -> Self {
        Self {
            cookbooks: root.join("cookbooks"),
            data_bags: root.join("data_bags"),
            roles: root.join("roles"),
            environments: root.join("environments"),
        }
    }

    /// Path for a kind.
    pub fn get(&self, dir: RepoDir) -> &Path {
        match dir {
            RepoDir::Cookbooks => &self.cookbooks,
            RepoDir::DataBags => &self.data_bags,
            RepoDir::Roles => &self.roles,
            RepoDir::Environments => &self.environments,
        }
    }
}

// ============================================================================
// Filesystem implementation
// ============================================================================

/// A working copy on disk.
#[derive(Debug, Clone)]
pub struct FsRepo {
    paths: RepoPaths,
}

impl FsRepo {
    /// Read the working copy at `paths`.
    pub fn new(paths: RepoPaths) -> Self {
        Self { paths }
    }

    /// Get the configured paths.
    pub fn paths(&self) -> &RepoPaths {
        &self.paths
    }

    fn existing(&self, dir: RepoDir) -> Result<&Path> {
        let path = self.paths.get(dir);
        if path.is_dir() {
            Ok(path)
        } else {
            Err(Error::PathNotFound(path.to_path_buf()))
        }
    }

    fn json_documents<T: DeserializeOwned>(dir: &Path) -> Result<Listing<String, T>> {
        let mut listing = Listing::default();
        for path in sorted_entries(dir)? {
            if !path.is_file() || path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let Some(name) = file_stem(&path) else {
                continue;
            };
            match read_json(&path) {
                Ok(doc) => {
                    listing.items.insert(name, doc);
                }
                Err(e) => listing.unreadable.push((path, e.to_string())),
            }
        }
        Ok(listing)
    }
}

impl LocalRepo for FsRepo {
    fn cookbooks(&self) -> Result<Listing<String, Cookbook>> {
        let dir = self.existing(RepoDir::Cookbooks)?;
        let mut listing = Listing::default();
        for path in sorted_entries(dir)? {
            if !path.is_dir() {
                continue;
            }
            let Some(name) = path.file_name().map(|n| n.to_string_lossy().into_owned()) else {
                continue;
            };
            if name.starts_with('.') {
                continue;
            }
            match cookbook_version(&path) {
                Ok(version) => {
                    listing
                        .items
                        .insert(name.clone(), Cookbook::new(name, version, path));
                }
                Err(e) => listing.unreadable.push((path, e.to_string())),
            }
        }
        Ok(listing)
    }

    fn roles(&self) -> Result<Listing<String, Role>> {
        Self::json_documents(self.existing(RepoDir::Roles)?)
    }

    fn environments(&self) -> Result<Listing<String, Environment>> {
        Self::json_documents(self.existing(RepoDir::Environments)?)
    }

    fn data_bag_items(&self) -> Result<DataBagListing> {
        let dir = self.existing(RepoDir::DataBags)?;
        let mut listing = Listing::default();
        for bag_dir in sorted_entries(dir)? {
            if !bag_dir.is_dir() {
                continue;
            }
            let Some(bag) = bag_dir.file_name().map(|n| n.to_string_lossy().into_owned()) else {
                continue;
            };
            let items: Listing<String, Value> = Self::json_documents(&bag_dir)?;
            listing.unreadable.extend(items.unreadable);
            for (id, raw) in items.items {
                listing.items.insert(
                    (bag.clone(), id.clone()),
                    DataBagItem::new(bag.clone(), id, raw),
                );
            }
        }
        Ok(listing)
    }

    fn write_role(&self, role: &Role) -> Result<PathBuf> {
        let path = self.paths.roles.join(format!("{}.json", role.name));
        write_pretty(&path, &serde_json::to_value(role)?)?;
        Ok(path)
    }

    fn write_data_bag_item(&self, item: &DataBagItem) -> Result<PathBuf> {
        let dir = self.paths.data_bags.join(&item.bag);
        fs::create_dir_all(&dir)?;
        let path = dir.join(format!("{}.json", item.id));
        write_pretty(&path, &item.raw_data)?;
        Ok(path)
    }

    fn describe_path(&self, kind: RepoDir) -> String {
        self.paths.get(kind).display().to_string()
    }
}

fn sorted_entries(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut entries = fs::read_dir(dir)?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<std::io::Result<Vec<_>>>()?;
    entries.sort();
    Ok(entries)
}

fn file_stem(path: &Path) -> Option<String> {
    path.file_stem().map(|s| s.to_string_lossy().into_owned())
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = fs::read_to_string(path)?;
    serde_json::from_str(&content).map_err(|e| Error::InvalidFile {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Write pretty-printed JSON with a trailing newline.
pub fn write_pretty(path: &Path, value: &Value) -> Result<()> {
    let mut content = serde_json::to_string_pretty(value)?;
    content.push('\n');
    fs::write(path, content)?;
    Ok(())
}

/// Read a cookbook's version from `metadata.json`, then `metadata.rb`.
///
/// A cookbook with neither, or with no version line, gets
/// [`DEFAULT_COOKBOOK_VERSION`].
pub fn cookbook_version(dir: &Path) -> Result<String> {
    let json_path = dir.join("metadata.json");
    if json_path.is_file() {
        let metadata: Value = read_json(&json_path)?;
        if let Some(version) = metadata.get("version").and_then(Value::as_str) {
            return Ok(version.to_string());
        }
    }

    let rb_path = dir.join("metadata.rb");
    if rb_path.is_file() {
        let content = fs::read_to_string(&rb_path)?;
        let pattern = Regex::new(METADATA_VERSION).map_err(|e| Error::Other(e.to_string()))?;
        if let Some(caps) = pattern.captures(&content) {
            return Ok(caps[1].to_string());
        }
    }

    Ok(DEFAULT_COOKBOOK_VERSION.to_string())
}

// ============================================================================
// In-memory implementation
// ============================================================================

/// A working copy held in memory.
///
/// A `None` collection behaves like a missing directory.
#[derive(Debug, Default)]
pub struct MemoryRepo {
    /// Cookbooks by name.
    pub cookbooks: Option<BTreeMap<String, Cookbook>>,
    /// Roles by name.
    pub roles: Option<BTreeMap<String, Role>>,
    /// Environments by name.
    pub environments: Option<BTreeMap<String, Environment>>,
    /// Data bag items by `(bag, id)`.
    pub data_bags: Option<BTreeMap<(String, String), DataBagItem>>,
    written: Mutex<Vec<String>>,
}

impl MemoryRepo {
    /// An empty working copy where every directory exists.
    pub fn new() -> Self {
        Self {
            cookbooks: Some(BTreeMap::new()),
            roles: Some(BTreeMap::new()),
            environments: Some(BTreeMap::new()),
            data_bags: Some(BTreeMap::new()),
            written: Mutex::default(),
        }
    }

    /// Add a cookbook.
    pub fn with_cookbook(mut self, name: &str, version: &str) -> Self {
        self.cookbooks
            .get_or_insert_with(BTreeMap::new)
            .insert(name.to_string(), Cookbook::new(name, version, name));
        self
    }

    /// Add a role.
    pub fn with_role(mut self, role: Role) -> Self {
        self.roles
            .get_or_insert_with(BTreeMap::new)
            .insert(role.name.clone(), role);
        self
    }

    /// Add an environment.
    pub fn with_environment(mut self, environment: Environment) -> Self {
        self.environments
            .get_or_insert_with(BTreeMap::new)
            .insert(environment.name.clone(), environment);
        self
    }

    /// Add a data bag item.
    pub fn with_data_bag_item(mut self, item: DataBagItem) -> Self {
        self.data_bags
            .get_or_insert_with(BTreeMap::new)
            .insert((item.bag.clone(), item.id.clone()), item);
        self
    }

    /// Paths written through the dump methods, as `roles/<name>` or `data_bags/<bag>/<id>`.
    pub fn written(&self) -> Vec<String> {
        self.written
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn record(&self, path: String) -> PathBuf {
        let mut written = self.written.lock().unwrap_or_else(PoisonError::into_inner);
        written.push(path.clone());
        PathBuf::from(path)
    }
}

fn listed<K: Ord + Clone, T: Clone>(
    collection: &Option<BTreeMap<K, T>>,
    dir: &str,
) -> Result<Listing<K, T>> {
    collection
        .as_ref()
        .map(|items| Listing::new(items.clone()))
        .ok_or_else(|| Error::PathNotFound(PathBuf::from(dir)))
}

impl LocalRepo for MemoryRepo {
    fn cookbooks(&self) -> Result<Listing<String, Cookbook>> {
        listed(&self.cookbooks, "cookbooks")
    }

    fn roles(&self) -> Result<Listing<String, Role>> {
        listed(&self.roles, "roles")
    }

    fn environments(&self) -> Result<Listing<String, Environment>> {
        listed(&self.environments, "environments")
    }

    fn data_bag_items(&self) -> Result<DataBagListing> {
        listed(&self.data_bags, "data_bags")
    }

    fn write_role(&self, role: &Role) -> Result<PathBuf> {
        Ok(self.record(format!("roles/{}", role.name)))
    }

    fn write_data_bag_item(&self, item: &DataBagItem) -> Result<PathBuf> {
        Ok(self.record(format!("data_bags/{}/{}", item.bag, item.id)))
    }

    fn describe_path(&self, kind: RepoDir) -> String {
        match kind {
            RepoDir::Cookbooks => "cookbooks",
            RepoDir::DataBags => "data_bags",
            RepoDir::Roles => "roles",
            RepoDir::Environments => "environments",
        }
        .to_string()
    }
}
