//! Server object types.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

/// Run-list key Chef uses for a role's default run list.
pub const DEFAULT_RUN_LIST: &str = "_default";

/// A cookbook checked out in the working copy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cookbook {
    /// Directory name, which is the cookbook name.
    pub name: String,
    /// Version from `metadata.json` or `metadata.rb`.
    pub version: String,
    /// Cookbook directory.
    pub path: PathBuf,
}

impl Cookbook {
    /// Create a cookbook entry.
    pub fn new(name: impl Into<String>, version: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            path: path.into(),
        }
    }
}

fn empty_object() -> Value {
    Value::Object(Map::new())
}

/// A role: run lists plus default and override attributes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Role {
    /// Role name.
    pub name: String,
    /// Free-text description.
    #[serde(default)]
    pub description: String,
    /// Run list applied in every environment without an override.
    #[serde(default)]
    pub run_list: Vec<String>,
    /// Per-environment run lists.
    #[serde(default)]
    pub env_run_lists: BTreeMap<String, Vec<String>>,
    /// Default attributes.
    #[serde(default = "empty_object")]
    pub default_attributes: Value,
    /// Override attributes.
    #[serde(default = "empty_object")]
    pub override_attributes: Value,
    /// Any other keys (`json_class`, `chef_type`, ...), kept as-is.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Role {
    /// Create an empty role.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            run_list: Vec::new(),
            env_run_lists: BTreeMap::new(),
            default_attributes: empty_object(),
            override_attributes: empty_object(),
            extra: Map::new(),
        }
    }

    /// Every run list, with the default one under `_default`.
    ///
    /// This is the value compared when deciding whether a role changed.
    pub fn all_run_lists(&self) -> BTreeMap<String, Vec<String>> {
        let mut lists = self.env_run_lists.clone();
        lists.insert(DEFAULT_RUN_LIST.to_string(), self.run_list.clone());
        lists
    }
}

/// An environment: attributes plus pinned cookbook versions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Environment {
    /// Environment name.
    pub name: String,
    /// Free-text description.
    #[serde(default)]
    pub description: String,
    /// Cookbook name to version constraint, e.g. `"= 1.2.0"`.
    #[serde(default)]
    pub cookbook_versions: BTreeMap<String, String>,
    /// Default attributes.
    #[serde(default = "empty_object")]
    pub default_attributes: Value,
    /// Override attributes.
    #[serde(default = "empty_object")]
    pub override_attributes: Value,
    /// Any other keys, kept as-is.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Environment {
    /// Create an environment with no pins or attributes.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            cookbook_versions: BTreeMap::new(),
            default_attributes: empty_object(),
            override_attributes: empty_object(),
            extra: Map::new(),
        }
    }

    /// The version a cookbook is pinned to, without its operator.
    pub fn pinned_version(&self, cookbook: &str) -> Option<String> {
        self.cookbook_versions
            .get(cookbook)
            .map(|raw| VersionConstraint::parse(raw).version)
    }

    /// Pin a cookbook to exactly `version`.
    pub fn pin(&mut self, cookbook: &str, version: &str) {
        self.cookbook_versions.insert(
            cookbook.to_string(),
            VersionConstraint::exact(version).to_string(),
        );
    }
}

/// One item of a data bag.
#[derive(Debug, Clone, PartialEq)]
pub struct DataBagItem {
    /// Parent bag.
    pub bag: String,
    /// Item id.
    pub id: String,
    /// Item payload, including its `id` key.
    pub raw_data: Value,
}

impl DataBagItem {
    /// Create an item.
    pub fn new(bag: impl Into<String>, id: impl Into<String>, raw_data: Value) -> Self {
        Self {
            bag: bag.into(),
            id: id.into(),
            raw_data,
        }
    }
}

/// A cookbook version constraint as stored in an environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionConstraint {
    /// Operator: `=`, `>=`, `~>`, ...
    pub operator: String,
    /// Version part.
    pub version: String,
}

impl VersionConstraint {
    /// An exact pin. Servers reject bare versions, so the operator is always written.
    pub fn exact(version: impl Into<String>) -> Self {
        Self {
            operator: "=".to_string(),
            version: version.into(),
        }
    }

    /// Parse `"= 1.2.0"`, `">= 1.0"` or a bare `"1.2.0"` (treated as exact).
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        let split = trimmed
            .find(|c: char| c.is_ascii_digit())
            .unwrap_or(trimmed.len());
        let (operator, version) = trimmed.split_at(split);
        let operator = operator.trim();

        Self {
            operator: if operator.is_empty() {
                "=".to_string()
            } else {
                operator.to_string()
            },
            version: version.trim().to_string(),
        }
    }
}

impl fmt::Display for VersionConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.operator, self.version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_constraint_parse() {
        let exact = VersionConstraint::parse("= 1.2.0");
        assert_eq!(exact.operator, "=");
        assert_eq!(exact.version, "1.2.0");

        let range = VersionConstraint::parse(">= 1.0");
        assert_eq!(range.operator, ">=");
        assert_eq!(range.version, "1.0");

        let bare = VersionConstraint::parse("2.0.1");
        assert_eq!(bare.to_string(), "= 2.0.1");
    }

    #[test]
    fn test_pin_writes_exact_constraint() {
        let mut env = Environment::new("prod");
        env.pin("nginx", "1.2.0");
        assert_eq!(env.cookbook_versions["nginx"], "= 1.2.0");
        assert_eq!(env.pinned_version("nginx").as_deref(), Some("1.2.0"));
        assert_eq!(env.pinned_version("apache"), None);
    }

    #[test]
    fn test_role_round_trips_unknown_keys() {
        let raw = json!({
            "name": "web",
            "json_class": "Chef::Role",
            "chef_type": "role",
            "run_list": ["recipe[nginx]"],
            "env_run_lists": {"prod": ["recipe[nginx::hardened]"]},
            "default_attributes": {"port": 80}
        });
        let role: Role = serde_json::from_value(raw).unwrap();
        assert_eq!(role.extra["json_class"], "Chef::Role");
        assert_eq!(role.override_attributes, json!({}));

        let back = serde_json::to_value(&role).unwrap();
        assert_eq!(back["chef_type"], "role");
    }

    #[test]
    fn test_all_run_lists_includes_default() {
        let mut role = Role::new("web");
        role.run_list = vec!["recipe[base]".into()];
        role.env_run_lists
            .insert("prod".into(), vec!["recipe[hardened]".into()]);

        let lists = role.all_run_lists();
        assert_eq!(lists[DEFAULT_RUN_LIST], vec!["recipe[base]"]);
        assert_eq!(lists.len(), 2);
    }
}
