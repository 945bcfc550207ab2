//! Backend abstraction for configuration-server operations.
//!
//! The [`Backend`] trait defines the interface for talking to the server,
//! allowing for different implementations (HTTP API, in-memory for testing).

pub mod http;
pub mod memory;

use crate::error::Result;
use crate::types::{Cookbook, DataBagItem, Environment, Role};
use std::sync::Arc;

/// Backend trait for server operations.
///
/// Loads of a missing object fail with [`crate::Error::NotFound`].
/// Saves create the object when it does not exist yet.
pub trait Backend: Send + Sync {
    /// List role names.
    fn list_roles(&self) -> Result<Vec<String>>;

    /// Load a role.
    fn load_role(&self, name: &str) -> Result<Role>;

    /// Create or replace a role.
    fn save_role(&self, role: &Role) -> Result<()>;

    /// List environment names.
    fn list_environments(&self) -> Result<Vec<String>>;

    /// Load an environment.
    fn load_environment(&self, name: &str) -> Result<Environment>;

    /// Create or replace an environment.
    fn save_environment(&self, environment: &Environment) -> Result<()>;

    /// List data bag names.
    fn list_data_bags(&self) -> Result<Vec<String>>;

    /// List the item ids of a bag.
    fn list_data_bag_items(&self, bag: &str) -> Result<Vec<String>>;

    /// Load one data bag item.
    fn load_data_bag_item(&self, bag: &str, id: &str) -> Result<DataBagItem>;

    /// Create an empty data bag.
    fn create_data_bag(&self, bag: &str) -> Result<()>;

    /// Create or replace a data bag item. The bag must exist.
    fn save_data_bag_item(&self, item: &DataBagItem) -> Result<()>;

    /// Upload cookbook versions as one batch.
    fn upload_cookbooks(&self, cookbooks: &[Cookbook]) -> Result<()>;
}

/// A shared backend, so a caller can keep inspecting state it handed to a client.
impl<B: Backend + ?Sized> Backend for Arc<B> {
    fn list_roles(&self) -> Result<Vec<String>> {
        (**self).list_roles()
    }

    fn load_role(&self, name: &str) -> Result<Role> {
        (**self).load_role(name)
    }

    fn save_role(&self, role: &Role) -> Result<()> {
        (**self).save_role(role)
    }

    fn list_environments(&self) -> Result<Vec<String>> {
        (**self).list_environments()
    }

    fn load_environment(&self, name: &str) -> Result<Environment> {
        (**self).load_environment(name)
    }

    fn save_environment(&self, environment: &Environment) -> Result<()> {
        (**self).save_environment(environment)
    }

    fn list_data_bags(&self) -> Result<Vec<String>> {
        (**self).list_data_bags()
    }

    fn list_data_bag_items(&self, bag: &str) -> Result<Vec<String>> {
        (**self).list_data_bag_items(bag)
    }

    fn load_data_bag_item(&self, bag: &str, id: &str) -> Result<DataBagItem> {
        (**self).load_data_bag_item(bag, id)
    }

    fn create_data_bag(&self, bag: &str) -> Result<()> {
        (**self).create_data_bag(bag)
    }

    fn save_data_bag_item(&self, item: &DataBagItem) -> Result<()> {
        (**self).save_data_bag_item(item)
    }

    fn upload_cookbooks(&self, cookbooks: &[Cookbook]) -> Result<()> {
        (**self).upload_cookbooks(cookbooks)
    }
}
