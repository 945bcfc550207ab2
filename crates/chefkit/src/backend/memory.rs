//! In-memory backend.
//!
//! Holds server state in maps so controllers and commands can be exercised
//! without a server. Individual saves can be made to fail.

use crate::backend::Backend;
use crate::error::{Error, Result};
use crate::types::{Cookbook, DataBagItem, Environment, Role};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

#[derive(Debug, Default)]
struct State {
    roles: BTreeMap<String, Role>,
    environments: BTreeMap<String, Environment>,
    data_bags: BTreeMap<String, BTreeMap<String, Value>>,
    uploaded: Vec<(String, String)>,
    created_bags: Vec<String>,
    failing: BTreeSet<String>,
}

/// Server state kept in memory.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    state: Mutex<State>,
}

impl MemoryBackend {
    /// Create an empty server.
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Seed a role.
    pub fn with_role(self, role: Role) -> Self {
        self.state().roles.insert(role.name.clone(), role);
        self
    }

    /// Seed an environment.
    pub fn with_environment(self, environment: Environment) -> Self {
        self.state()
            .environments
            .insert(environment.name.clone(), environment);
        self
    }

    /// Seed a data bag item, creating its bag.
    pub fn with_data_bag_item(self, item: DataBagItem) -> Self {
        self.state()
            .data_bags
            .entry(item.bag)
            .or_default()
            .insert(item.id, item.raw_data);
        self
    }

    /// Make every save of `path` fail with HTTP 500.
    ///
    /// Paths look like `roles/web`, `environments/prod`, `data/users/alice`
    /// or `cookbooks`.
    pub fn failing(self, path: &str) -> Self {
        self.state().failing.insert(path.to_string());
        self
    }

    /// Current copy of a role.
    pub fn role(&self, name: &str) -> Option<Role> {
        self.state().roles.get(name).cloned()
    }

    /// Current copy of an environment.
    pub fn environment(&self, name: &str) -> Option<Environment> {
        self.state().environments.get(name).cloned()
    }

    /// Current payload of a data bag item.
    pub fn data_bag_item(&self, bag: &str, id: &str) -> Option<Value> {
        self.state()
            .data_bags
            .get(bag)
            .and_then(|items| items.get(id))
            .cloned()
    }

    /// Every `(name, version)` uploaded so far.
    pub fn uploaded(&self) -> Vec<(String, String)> {
        self.state().uploaded.clone()
    }

    /// Every bag created through [`Backend::create_data_bag`].
    pub fn created_bags(&self) -> Vec<String> {
        self.state().created_bags.clone()
    }

    fn check_failing(state: &State, path: &str) -> Result<()> {
        if state.failing.contains(path) {
            return Err(Error::Http { status: 500 });
        }
        Ok(())
    }
}

impl Backend for MemoryBackend {
    fn list_roles(&self) -> Result<Vec<String>> {
        Ok(self.state().roles.keys().cloned().collect())
    }

    fn load_role(&self, name: &str) -> Result<Role> {
        self.role(name).ok_or_else(|| Error::NotFound {
            what: format!("roles/{name}"),
        })
    }

    fn save_role(&self, role: &Role) -> Result<()> {
        let mut state = self.state();
        Self::check_failing(&state, &format!("roles/{}", role.name))?;
        state.roles.insert(role.name.clone(), role.clone());
        Ok(())
    }

    fn list_environments(&self) -> Result<Vec<String>> {
        Ok(self.state().environments.keys().cloned().collect())
    }

    fn load_environment(&self, name: &str) -> Result<Environment> {
        self.environment(name).ok_or_else(|| Error::NotFound {
            what: format!("environments/{name}"),
        })
    }

    fn save_environment(&self, environment: &Environment) -> Result<()> {
        let mut state = self.state();
        Self::check_failing(&state, &format!("environments/{}", environment.name))?;
        state
            .environments
            .insert(environment.name.clone(), environment.clone());
        Ok(())
    }

    fn list_data_bags(&self) -> Result<Vec<String>> {
        Ok(self.state().data_bags.keys().cloned().collect())
    }

    fn list_data_bag_items(&self, bag: &str) -> Result<Vec<String>> {
        self.state()
            .data_bags
            .get(bag)
            .map(|items| items.keys().cloned().collect())
            .ok_or_else(|| Error::NotFound {
                what: format!("data/{bag}"),
            })
    }

    fn load_data_bag_item(&self, bag: &str, id: &str) -> Result<DataBagItem> {
        self.data_bag_item(bag, id)
            .map(|raw| DataBagItem::new(bag, id, raw))
            .ok_or_else(|| Error::NotFound {
                what: format!("data/{bag}/{id}"),
            })
    }

    fn create_data_bag(&self, bag: &str) -> Result<()> {
        let mut state = self.state();
        Self::check_failing(&state, &format!("data/{bag}"))?;
        if state.data_bags.contains_key(bag) {
            return Err(Error::from_status(409, &format!("data/{bag}")));
        }
        state.data_bags.insert(bag.to_string(), BTreeMap::new());
        state.created_bags.push(bag.to_string());
        Ok(())
    }

    fn save_data_bag_item(&self, item: &DataBagItem) -> Result<()> {
        let mut state = self.state();
        Self::check_failing(&state, &format!("data/{}/{}", item.bag, item.id))?;
        let items = state
            .data_bags
            .get_mut(&item.bag)
            .ok_or_else(|| Error::NotFound {
                what: format!("data/{}", item.bag),
            })?;
        items.insert(item.id.clone(), item.raw_data.clone());
        Ok(())
    }

    fn upload_cookbooks(&self, cookbooks: &[Cookbook]) -> Result<()> {
        let mut state = self.state();
        Self::check_failing(&state, "cookbooks")?;
        state.uploaded.extend(
            cookbooks
                .iter()
                .map(|cb| (cb.name.clone(), cb.version.clone())),
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_missing_objects_are_not_found() {
        let backend = MemoryBackend::new();
        assert!(backend.load_role("web").unwrap_err().is_not_found());
        assert!(backend.load_environment("prod").unwrap_err().is_not_found());
        assert!(backend.load_data_bag_item("users", "alice").unwrap_err().is_not_found());
    }

    #[test]
    fn test_item_save_needs_bag() {
        let backend = MemoryBackend::new();
        let item = DataBagItem::new("users", "alice", json!({"id": "alice"}));
        assert!(backend.save_data_bag_item(&item).is_err());

        backend.create_data_bag("users").unwrap();
        backend.save_data_bag_item(&item).unwrap();
        assert_eq!(backend.list_data_bag_items("users").unwrap(), vec!["alice"]);
        assert_eq!(backend.created_bags(), vec!["users"]);
    }

    #[test]
    fn test_failing_save() {
        let backend = MemoryBackend::new().failing("roles/web");
        assert!(backend.save_role(&Role::new("web")).is_err());
        backend.save_role(&Role::new("db")).unwrap();
        assert_eq!(backend.list_roles().unwrap(), vec!["db"]);
    }
}
