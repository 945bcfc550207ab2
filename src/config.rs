//! `sharp-config.yml`: working-copy location, per-server ignore lists,
//! audit logging, notification carriers and rollback storage.
//!
//! ```yaml
//! global:
//!   git_cookbook_path: ~/chef-repo
//!   backupdir: ~/chef-backups
//! production:
//!   ignore_cookbooks: [monitoring]
//!   ignore_databags: [users/deploy]
//! logging:
//!   enabled: true
//!   destination: ~/.chef/sharp.log
//! notification:
//!   hubot:
//!     enabled: true
//!     url: http://hubot.example.com:8080/hubot/chefbumps/
//!     channel: "#ops"
//!     username: sharp
//!     skip: [dev]
//! rollback:
//!   enabled: true
//!   destination: ~/.chef/sharp-rollback
//! ```
//!
//! Every top-level key other than `global`, `logging`, `notification` and
//! `rollback` is a server context.

use crate::error::ConfigError;
use crate::notify;
use crate::paths;
use alignment::{IgnoreList, ResourceKind};
use chefkit::local::RepoPaths;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

// ============================================================================
// Sections
// ============================================================================

/// `global:` section
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GlobalConfig {
    /// Root of the git checkout
    pub git_cookbook_path: Option<String>,
    pub cookbook_path: Option<String>,
    pub data_bag_path: Option<String>,
    pub role_path: Option<String>,
    pub environment_path: Option<String>,
    /// Where `backup` writes
    pub backupdir: Option<String>,
}

/// Ignore lists for one server context
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServerConfig {
    #[serde(default)]
    pub ignore_cookbooks: Vec<String>,
    #[serde(default)]
    pub ignore_databags: Vec<String>,
    #[serde(default)]
    pub ignore_roles: Vec<String>,
    #[serde(default)]
    pub ignore_environments: Vec<String>,
}

impl ServerConfig {
    fn names(&self, kind: ResourceKind) -> &[String] {
        match kind {
            ResourceKind::Cookbook => &self.ignore_cookbooks,
            ResourceKind::DataBag => &self.ignore_databags,
            ResourceKind::Role => &self.ignore_roles,
            ResourceKind::Environment => &self.ignore_environments,
        }
    }
}

/// `logging:` section
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoggingConfig {
    #[serde(default)]
    pub enabled: bool,
    pub destination: Option<String>,
}

/// `notification.<carrier>:` section
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CarrierConfig {
    #[serde(default)]
    pub enabled: bool,
    pub url: Option<String>,
    #[serde(default)]
    pub channel: String,
    pub username: Option<String>,
    /// Environments this carrier stays silent for
    #[serde(default)]
    pub skip: Vec<String>,
}

/// `rollback:` section
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RollbackConfig {
    #[serde(default)]
    pub enabled: bool,
    pub destination: Option<String>,
}

// ============================================================================
// Whole file
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SharpConfig {
    #[serde(default)]
    pub global: GlobalConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub notification: BTreeMap<String, CarrierConfig>,
    #[serde(default)]
    pub rollback: RollbackConfig,
    /// Server contexts by name
    #[serde(flatten)]
    pub servers: BTreeMap<String, ServerConfig>,
}

impl SharpConfig {
    /// Load from the standard locations and validate.
    pub fn load() -> anyhow::Result<Self> {
        let candidates = paths::config_candidates()?;
        let config = Self::load_from(&candidates)?;
        config.validate()?;
        Ok(config)
    }

    /// Load the last existing file of `candidates`.
    ///
    /// A file that exists but does not parse is an error, even when a
    /// later one would have loaded.
    pub fn load_from(candidates: &[PathBuf]) -> Result<Self, ConfigError> {
        let mut loaded = None;
        for path in candidates {
            if !path.is_file() {
                log::debug!("No config at {}", path.display());
                continue;
            }
            log::debug!("Loading config from {}", path.display());
            let content = fs::read_to_string(path).map_err(|e| ConfigError::Unreadable {
                path: path.clone(),
                message: e.to_string(),
            })?;
            loaded = Some(Self::from_yaml(&content, path)?);
        }
        loaded.ok_or_else(|| ConfigError::NotFound(candidates.to_vec()))
    }

    /// Parse YAML content; `path` is only used in messages.
    pub fn from_yaml(content: &str, path: &Path) -> Result<Self, ConfigError> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content).map_err(|e| ConfigError::Unreadable {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Reject settings that would fail halfway through a run.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, carrier) in &self.notification {
            if !notify::is_known(name) {
                return Err(ConfigError::UnknownCarrier(name.clone()));
            }
            if carrier.enabled && carrier.url.as_deref().is_none_or(str::is_empty) {
                return Err(ConfigError::CarrierWithoutUrl(name.clone()));
            }
        }
        if self.logging.enabled && self.logging.destination.is_none() {
            return Err(ConfigError::LoggingWithoutDestination);
        }
        if self.rollback.enabled && self.rollback.destination.is_none() {
            return Err(ConfigError::RollbackWithoutDestination);
        }
        Ok(())
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// Root of the git checkout
    pub fn git_cookbook_path(&self) -> Result<PathBuf, ConfigError> {
        self.global
            .git_cookbook_path
            .as_deref()
            .map(paths::expand)
            .ok_or(ConfigError::NoCookbookPath)
    }

    /// Per-kind directories, defaulting to the conventional layout under the checkout
    pub fn repo_paths(&self) -> Result<RepoPaths, ConfigError> {
        let mut repo = RepoPaths::under(&self.git_cookbook_path()?);
        let overrides = [
            (&self.global.cookbook_path, &mut repo.cookbooks),
            (&self.global.data_bag_path, &mut repo.data_bags),
            (&self.global.role_path, &mut repo.roles),
            (&self.global.environment_path, &mut repo.environments),
        ];
        for (setting, path) in overrides {
            if let Some(value) = setting {
                *path = paths::expand(value);
            }
        }
        Ok(repo)
    }

    /// Root under which `backup-<ts>` directories are created
    pub fn backup_dir(&self) -> Result<PathBuf, ConfigError> {
        self.global
            .backupdir
            .as_deref()
            .map(paths::expand)
            .ok_or(ConfigError::NoBackupDir)
    }

    /// Names `server` never wants pushed for `kind`
    pub fn ignore_list(&self, server: Option<&str>, kind: ResourceKind) -> IgnoreList {
        server
            .and_then(|name| self.servers.get(name))
            .map(|srv| IgnoreList::new(srv.names(kind).iter().cloned()))
            .unwrap_or_default()
    }

    /// Audit log file, when logging is enabled
    pub fn log_destination(&self) -> Option<PathBuf> {
        self.logging
            .enabled
            .then(|| self.logging.destination.as_deref().map(paths::expand))
            .flatten()
    }

    /// Snapshot directory, when rollback is enabled
    pub fn rollback_destination(&self) -> Option<PathBuf> {
        self.rollback
            .enabled
            .then(|| self.rollback.destination.as_deref().map(paths::expand))
            .flatten()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const SAMPLE: &str = r##"
global:
  git_cookbook_path: /srv/chef-repo
  role_path: /srv/roles
  backupdir: /srv/backups
production:
  ignore_cookbooks: [monitoring]
  ignore_databags: [users/deploy]
logging:
  enabled: true
  destination: /var/log/sharp.log
notification:
  hubot:
    enabled: true
    url: http://hubot.local/hubot/chefbumps/
    channel: "#ops"
    username: sharp
    skip: [dev]
rollback:
  enabled: true
  destination: /srv/rollback
"##;

    fn sample() -> SharpConfig {
        SharpConfig::from_yaml(SAMPLE, Path::new("sample.yml")).unwrap()
    }

    #[test]
    fn test_parse_sample() {
        let config = sample();
        config.validate().unwrap();
        assert_eq!(config.servers.len(), 1);
        assert_eq!(config.notification["hubot"].channel, "#ops");
        assert_eq!(
            config.log_destination(),
            Some(PathBuf::from("/var/log/sharp.log"))
        );
        assert_eq!(
            config.rollback_destination(),
            Some(PathBuf::from("/srv/rollback"))
        );
    }

    #[test]
    fn test_repo_paths_defaults_and_overrides() {
        let paths = sample().repo_paths().unwrap();
        assert_eq!(paths.cookbooks, PathBuf::from("/srv/chef-repo/cookbooks"));
        assert_eq!(paths.data_bags, PathBuf::from("/srv/chef-repo/data_bags"));
        assert_eq!(paths.roles, PathBuf::from("/srv/roles"));
    }

    #[test]
    fn test_ignore_list_per_server() {
        let config = sample();
        let cookbooks = config.ignore_list(Some("production"), ResourceKind::Cookbook);
        assert!(cookbooks.contains(&alignment::ItemKey::new("monitoring")));

        let bags = config.ignore_list(Some("production"), ResourceKind::DataBag);
        assert!(bags.contains(&alignment::ItemKey::nested("users", "deploy")));

        assert!(config.ignore_list(Some("staging"), ResourceKind::Role).is_empty());
        assert!(config.ignore_list(None, ResourceKind::Cookbook).is_empty());
    }

    #[test]
    fn test_unknown_carrier_rejected() {
        let yaml = "notification:\n  pager:\n    enabled: true\n    url: http://x\n";
        let config = SharpConfig::from_yaml(yaml, Path::new("x.yml")).unwrap();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::UnknownCarrier(name)) if name == "pager"
        ));
    }

    #[test]
    fn test_enabled_carrier_needs_url() {
        let yaml = "notification:\n  slack:\n    enabled: true\n";
        let config = SharpConfig::from_yaml(yaml, Path::new("x.yml")).unwrap();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::CarrierWithoutUrl(_))
        ));
    }

    #[test]
    fn test_enabled_sections_need_destination() {
        let logging = SharpConfig::from_yaml("logging:\n  enabled: true\n", Path::new("x")).unwrap();
        assert!(matches!(
            logging.validate(),
            Err(ConfigError::LoggingWithoutDestination)
        ));

        let rollback =
            SharpConfig::from_yaml("rollback:\n  enabled: true\n", Path::new("x")).unwrap();
        assert!(matches!(
            rollback.validate(),
            Err(ConfigError::RollbackWithoutDestination)
        ));
    }

    #[test]
    fn test_disabled_sections_have_no_destination() {
        let yaml = "rollback:\n  enabled: false\n  destination: /tmp/rb\n";
        let config = SharpConfig::from_yaml(yaml, Path::new("x")).unwrap();
        assert_eq!(config.rollback_destination(), None);
        assert_eq!(config.log_destination(), None);
    }

    #[test]
    fn test_missing_required_paths() {
        let config = SharpConfig::default();
        assert!(matches!(config.backup_dir(), Err(ConfigError::NoBackupDir)));
        assert!(matches!(
            config.repo_paths(),
            Err(ConfigError::NoCookbookPath)
        ));
    }

    #[test]
    fn test_load_from_later_file_wins() {
        let dir = TempDir::new().unwrap();
        let system = dir.path().join("system.yml");
        let user = dir.path().join("user.yml");
        fs::write(&system, "global:\n  backupdir: /system\n").unwrap();
        fs::write(&user, "global:\n  backupdir: /user\n").unwrap();

        let config = SharpConfig::load_from(&[system.clone(), user]).unwrap();
        assert_eq!(config.backup_dir().unwrap(), PathBuf::from("/user"));

        let missing = dir.path().join("missing.yml");
        let config = SharpConfig::load_from(&[system, missing]).unwrap();
        assert_eq!(config.backup_dir().unwrap(), PathBuf::from("/system"));
    }

    #[test]
    fn test_load_from_nothing() {
        let dir = TempDir::new().unwrap();
        let err = SharpConfig::load_from(&[dir.path().join("nope.yml")]).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(_)));
    }

    #[test]
    fn test_unparseable_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.yml");
        fs::write(&path, "global: [unclosed\n").unwrap();
        let err = SharpConfig::load_from(&[path]).unwrap_err();
        assert!(matches!(err, ConfigError::Unreadable { .. }));
    }
}
