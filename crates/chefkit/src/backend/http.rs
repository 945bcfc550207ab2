//! HTTP API backend.
//!
//! Talks to the server's REST API with JSON bodies. Requests carry the
//! client name in `X-Ops-UserId`; request signing is left to whatever sits
//! in front of the server (a signing proxy, or a local zero-auth server).

use crate::backend::Backend;
use crate::error::{Error, Result};
use crate::types::{Cookbook, DataBagItem, Environment, Role};
use crate::upload::{CookbookManifest, md5_base64};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::collections::BTreeMap;
use std::fs;
use std::time::Duration;

/// API version advertised in `X-Chef-Version`.
const API_VERSION: &str = "12.0.0";

/// Per-request timeout.
const TIMEOUT: Duration = Duration::from_secs(60);

/// HTTP API backend.
pub struct HttpBackend {
    /// HTTP agent for requests.
    agent: ureq::Agent,
    /// Server URL, without trailing slash.
    base_url: String,
    /// Client (node) name.
    client_name: String,
}

impl HttpBackend {
    /// Create a backend for `base_url`, identifying as `client_name`.
    pub fn new(base_url: impl Into<String>, client_name: impl Into<String>) -> Self {
        let config = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(Some(TIMEOUT))
            .build();

        Self {
            agent: config.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client_name: client_name.into(),
        }
    }

    /// Get the server URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    fn headers<B>(&self, request: ureq::RequestBuilder<B>) -> ureq::RequestBuilder<B> {
        request
            .header("Accept", "application/json")
            .header("X-Ops-UserId", &self.client_name)
            .header("X-Chef-Version", API_VERSION)
    }

    fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        log::debug!("GET {path}");
        let mut response = self.headers(self.agent.get(&self.url(path))).call()?;
        expect_success(response.status().as_u16(), path)?;
        response
            .body_mut()
            .read_json()
            .map_err(|e| Error::Other(format!("invalid response from {path}: {e}")))
    }

    fn put_json(&self, url: &str, what: &str, body: &Value) -> Result<u16> {
        log::debug!("PUT {what}");
        let response = self.headers(self.agent.put(url)).send_json(body)?;
        Ok(response.status().as_u16())
    }

    fn post_json(&self, url: &str, what: &str, body: &Value) -> Result<ureq::http::Response<ureq::Body>> {
        log::debug!("POST {what}");
        Ok(self.headers(self.agent.post(url)).send_json(body)?)
    }

    /// PUT `<collection>/<name>`, falling back to POST `<collection>` when
    /// the object does not exist yet.
    fn upsert(&self, collection: &str, name: &str, body: &Value) -> Result<()> {
        let path = format!("{collection}/{name}");
        let status = self.put_json(&self.url(&path), &path, body)?;
        if status != 404 {
            return expect_success(status, &path);
        }

        let response = self.post_json(&self.url(collection), collection, body)?;
        expect_success(response.status().as_u16(), &path)
    }

    fn list(&self, path: &str) -> Result<Vec<String>> {
        let index: BTreeMap<String, Value> = self.get_json(path)?;
        Ok(index.into_keys().collect())
    }
}

fn expect_success(status: u16, what: &str) -> Result<()> {
    if (200..300).contains(&status) {
        Ok(())
    } else {
        Err(Error::from_status(status, what))
    }
}

impl Backend for HttpBackend {
    fn list_roles(&self) -> Result<Vec<String>> {
        self.list("roles")
    }

    fn load_role(&self, name: &str) -> Result<Role> {
        self.get_json(&format!("roles/{name}"))
    }

    fn save_role(&self, role: &Role) -> Result<()> {
        self.upsert("roles", &role.name, &serde_json::to_value(role)?)
    }

    fn list_environments(&self) -> Result<Vec<String>> {
        self.list("environments")
    }

    fn load_environment(&self, name: &str) -> Result<Environment> {
        self.get_json(&format!("environments/{name}"))
    }

    fn save_environment(&self, environment: &Environment) -> Result<()> {
        self.upsert(
            "environments",
            &environment.name,
            &serde_json::to_value(environment)?,
        )
    }

    fn list_data_bags(&self) -> Result<Vec<String>> {
        self.list("data")
    }

    fn list_data_bag_items(&self, bag: &str) -> Result<Vec<String>> {
        self.list(&format!("data/{bag}"))
    }

    fn load_data_bag_item(&self, bag: &str, id: &str) -> Result<DataBagItem> {
        let raw: Value = self.get_json(&format!("data/{bag}/{id}"))?;
        Ok(DataBagItem::new(bag, id, raw))
    }

    fn create_data_bag(&self, bag: &str) -> Result<()> {
        let response = self.post_json(&self.url("data"), "data", &json!({ "name": bag }))?;
        expect_success(response.status().as_u16(), &format!("data/{bag}"))
    }

    fn save_data_bag_item(&self, item: &DataBagItem) -> Result<()> {
        self.upsert(&format!("data/{}", item.bag), &item.id, &item.raw_data)
    }

    fn upload_cookbooks(&self, cookbooks: &[Cookbook]) -> Result<()> {
        let manifests = cookbooks
            .iter()
            .map(CookbookManifest::build)
            .collect::<Result<Vec<_>>>()?;

        let mut sources = BTreeMap::new();
        for file in manifests.iter().flat_map(CookbookManifest::files) {
            sources.insert(file.checksum.clone(), file.source.clone());
        }

        let wanted: serde_json::Map<String, Value> = sources
            .keys()
            .map(|checksum| (checksum.clone(), Value::Null))
            .collect();
        let mut response = self.post_json(
            &self.url("sandboxes"),
            "sandboxes",
            &json!({ "checksums": wanted }),
        )?;
        expect_success(response.status().as_u16(), "sandboxes")?;
        let sandbox: Sandbox = response
            .body_mut()
            .read_json()
            .map_err(|e| Error::Other(format!("invalid sandbox response: {e}")))?;

        for (checksum, slot) in &sandbox.checksums {
            if !slot.needs_upload {
                continue;
            }
            let (Some(url), Some(source)) = (&slot.url, sources.get(checksum)) else {
                continue;
            };
            let content = fs::read(source)?;
            log::debug!("PUT checksum {checksum}");
            let response = self
                .headers(self.agent.put(url))
                .header("Content-Type", "application/x-binary")
                .header("Content-MD5", md5_base64(&content))
                .send(&content[..])?;
            expect_success(response.status().as_u16(), &format!("checksum {checksum}"))?;
        }

        let sandbox_path = format!("sandboxes/{}", sandbox.sandbox_id);
        let status = self.put_json(
            &self.url(&sandbox_path),
            &sandbox_path,
            &json!({ "is_completed": true }),
        )?;
        expect_success(status, &sandbox_path)?;

        for manifest in &manifests {
            let path = format!("cookbooks/{}/{}", manifest.name, manifest.version);
            let status = self.put_json(&self.url(&path), &path, &manifest.to_json())?;
            expect_success(status, &path)?;
            log::info!("uploaded {}", path);
        }

        Ok(())
    }
}

// =============================================================================
// API response types
// =============================================================================

#[derive(Debug, Deserialize)]
struct Sandbox {
    sandbox_id: String,
    #[serde(default)]
    checksums: BTreeMap<String, SandboxSlot>,
}

#[derive(Debug, Deserialize)]
struct SandboxSlot {
    url: Option<String>,
    #[serde(default)]
    needs_upload: bool,
}
