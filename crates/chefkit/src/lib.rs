//! # chefkit
//!
//! Client library for a Chef-style configuration server and the local
//! chef-repo working copy that feeds it.
//!
//! This crate provides:
//! - Typed server objects: [`Role`], [`Environment`], [`DataBagItem`], [`Cookbook`]
//! - A [`Backend`](backend::Backend) trait with an HTTP implementation and an
//!   in-memory one for tests
//! - The cookbook upload manifest (checksummed files grouped by segment)
//! - A reader for the working copy ([`local::LocalRepo`])
//!
//! ## Example
//!
//! ```no_run
//! use chefkit::Client;
//!
//! let client = Client::http("https://chef.example.com/organizations/acme", "alice");
//!
//! match client.find_environment("prod").expect("request failed") {
//!     Some(env) => println!("{} pins {} cookbooks", env.name, env.cookbook_versions.len()),
//!     None => println!("no such environment"),
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod backend;
pub mod error;
pub mod local;
pub mod types;
pub mod upload;

pub use error::{Error, ErrorCategory, Result};
pub use types::{Cookbook, DataBagItem, Environment, Role, VersionConstraint};

use backend::{Backend, http::HttpBackend};

/// High-level client for server operations.
///
/// Wraps a backend and turns "does not exist" into `None` for the lookups
/// where a missing object is an expected answer.
pub struct Client {
    backend: Box<dyn Backend>,
}

impl Client {
    /// Create a client talking HTTP to `server_url` as `node_name`.
    pub fn http(server_url: &str, node_name: &str) -> Self {
        Self {
            backend: Box::new(HttpBackend::new(server_url, node_name)),
        }
    }

    /// Create a client with a custom backend (useful for testing).
    pub fn with_backend(backend: Box<dyn Backend>) -> Self {
        Self { backend }
    }

    /// Get the underlying backend.
    pub fn backend(&self) -> &dyn Backend {
        self.backend.as_ref()
    }

    // =========================================================================
    // Lookups
    // =========================================================================

    /// Load a role, or `None` if the server has no such role.
    pub fn find_role(&self, name: &str) -> Result<Option<Role>> {
        found(self.backend.load_role(name))
    }

    /// Load an environment, or `None` if the server has no such environment.
    pub fn find_environment(&self, name: &str) -> Result<Option<Environment>> {
        found(self.backend.load_environment(name))
    }

    /// Load a data bag item, or `None` if the bag or the item is missing.
    pub fn find_data_bag_item(&self, bag: &str, id: &str) -> Result<Option<DataBagItem>> {
        found(self.backend.load_data_bag_item(bag, id))
    }

    /// Load an environment that must exist.
    pub fn environment(&self, name: &str) -> Result<Environment> {
        self.backend.load_environment(name)
    }

    // =========================================================================
    // Collections
    // =========================================================================

    /// Every role on the server.
    pub fn roles(&self) -> Result<Vec<Role>> {
        self.backend
            .list_roles()?
            .iter()
            .map(|name| self.backend.load_role(name))
            .collect()
    }

    /// Every environment on the server.
    pub fn environments(&self) -> Result<Vec<Environment>> {
        self.backend
            .list_environments()?
            .iter()
            .map(|name| self.backend.load_environment(name))
            .collect()
    }

    /// Every data bag name.
    pub fn data_bags(&self) -> Result<Vec<String>> {
        self.backend.list_data_bags()
    }

    /// Every item of every bag.
    pub fn data_bag_items(&self) -> Result<Vec<DataBagItem>> {
        let mut items = Vec::new();
        for bag in self.backend.list_data_bags()? {
            for id in self.backend.list_data_bag_items(&bag)? {
                items.push(self.backend.load_data_bag_item(&bag, &id)?);
            }
        }
        Ok(items)
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Create or replace a role.
    pub fn save_role(&self, role: &Role) -> Result<()> {
        self.backend.save_role(role)
    }

    /// Create or replace an environment.
    pub fn save_environment(&self, environment: &Environment) -> Result<()> {
        self.backend.save_environment(environment)
    }

    /// Create a data bag. An already existing bag is not an error.
    pub fn ensure_data_bag(&self, bag: &str) -> Result<()> {
        match self.backend.create_data_bag(bag) {
            Err(e) if e.category() == ErrorCategory::Conflict => Ok(()),
            other => other,
        }
    }

    /// Create or replace a data bag item.
    pub fn save_data_bag_item(&self, item: &DataBagItem) -> Result<()> {
        self.backend.save_data_bag_item(item)
    }

    /// Upload cookbook versions as one batch.
    pub fn upload_cookbooks(&self, cookbooks: &[Cookbook]) -> Result<()> {
        self.backend.upload_cookbooks(cookbooks)
    }
}

fn found<T>(result: Result<T>) -> Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(e) if e.is_not_found() => Ok(None),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use backend::memory::MemoryBackend;
    use serde_json::json;

    fn client(backend: MemoryBackend) -> Client {
        Client::with_backend(Box::new(backend))
    }

    #[test]
    fn test_find_missing_is_none() {
        let client = client(MemoryBackend::new());
        assert!(client.find_role("web").unwrap().is_none());
        assert!(client.find_environment("prod").unwrap().is_none());
        assert!(client.find_data_bag_item("users", "alice").unwrap().is_none());
    }

    #[test]
    fn test_find_existing() {
        let client = client(MemoryBackend::new().with_role(Role::new("web")));
        assert_eq!(client.find_role("web").unwrap().unwrap().name, "web");
    }

    #[test]
    fn test_ensure_data_bag_is_idempotent() {
        let backend = MemoryBackend::new()
            .with_data_bag_item(DataBagItem::new("users", "alice", json!({"id": "alice"})));
        let client = client(backend);
        client.ensure_data_bag("users").unwrap();
        client.ensure_data_bag("admins").unwrap();
        assert_eq!(client.data_bags().unwrap(), vec!["admins", "users"]);
    }

    #[test]
    fn test_collections() {
        let backend = MemoryBackend::new()
            .with_role(Role::new("db"))
            .with_role(Role::new("web"))
            .with_environment(Environment::new("prod"))
            .with_data_bag_item(DataBagItem::new("users", "alice", json!({"id": "alice"})))
            .with_data_bag_item(DataBagItem::new("users", "bob", json!({"id": "bob"})));
        let client = client(backend);

        let roles: Vec<String> = client.roles().unwrap().into_iter().map(|r| r.name).collect();
        assert_eq!(roles, vec!["db", "web"]);
        assert_eq!(client.environments().unwrap().len(), 1);
        assert_eq!(client.data_bag_items().unwrap().len(), 2);
    }
}
