//! Notification carriers for cookbook bumps.
//!
//! A carrier is looked up by its `notification.<name>` key. Unknown names
//! are rejected when the configuration is validated, never at send time.

use crate::config::CarrierConfig;
use alignment::Bump;
use anyhow::{Result, bail};
use serde_json::json;
use std::collections::BTreeMap;
use std::time::Duration;

/// Carrier names the registry knows
pub const CARRIERS: &[&str] = &["hubot", "slack"];

const TIMEOUT: Duration = Duration::from_secs(10);

/// Check if `name` is a known carrier
pub fn is_known(name: &str) -> bool {
    CARRIERS.contains(&name)
}

/// Announces one bump on one channel
pub trait Notifier {
    fn notify(&self, bump: &Bump, carrier: &CarrierConfig) -> Result<()>;
}

fn agent() -> ureq::Agent {
    ureq::Agent::config_builder()
        .http_status_as_error(false)
        .timeout_global(Some(TIMEOUT))
        .build()
        .into()
}

fn check_status(status: u16, carrier: &str) -> Result<()> {
    if (200..300).contains(&status) {
        Ok(())
    } else {
        bail!("{carrier} answered HTTP {status}")
    }
}

/// Form POST to `url + channel`
pub struct Hubot;

impl Notifier for Hubot {
    fn notify(&self, bump: &Bump, carrier: &CarrierConfig) -> Result<()> {
        let url = format!(
            "{}{}",
            carrier.url.as_deref().unwrap_or_default(),
            carrier.channel
        );
        let user = carrier.username.clone().unwrap_or_default();
        let response = agent().post(&url).send_form([
            ("cookbook", bump.cookbook.as_str()),
            ("user", user.as_str()),
            ("to_version", bump.version.as_str()),
            ("environment", bump.environment.as_str()),
        ])?;
        check_status(response.status().as_u16(), "hubot")
    }
}

/// Incoming-webhook JSON POST
pub struct Slack;

impl Slack {
    fn message(bump: &Bump, carrier: &CarrierConfig) -> serde_json::Value {
        let mut body = json!({
            "text": format!(
                "Bumped {} to {} for environment {}",
                bump.cookbook, bump.version, bump.environment
            ),
        });
        if !carrier.channel.is_empty() {
            body["channel"] = json!(carrier.channel);
        }
        if let Some(username) = &carrier.username {
            body["username"] = json!(username);
        }
        body
    }
}

impl Notifier for Slack {
    fn notify(&self, bump: &Bump, carrier: &CarrierConfig) -> Result<()> {
        let url = carrier.url.as_deref().unwrap_or_default();
        let response = agent().post(url).send_json(Self::message(bump, carrier))?;
        check_status(response.status().as_u16(), "slack")
    }
}

fn lookup(name: &str) -> Option<Box<dyn Notifier>> {
    match name {
        "hubot" => Some(Box::new(Hubot)),
        "slack" => Some(Box::new(Slack)),
        _ => None,
    }
}

// ============================================================================
// Registry
// ============================================================================

/// Enabled carriers with their settings
#[derive(Default)]
pub struct Notifiers {
    carriers: Vec<(String, Box<dyn Notifier>, CarrierConfig)>,
}

impl Notifiers {
    /// Every enabled carrier of `notification`; none at all when `quiet`.
    pub fn from_config(notification: &BTreeMap<String, CarrierConfig>, quiet: bool) -> Self {
        let mut notifiers = Self::default();
        if quiet {
            log::info!("quiet mode, notifications disabled");
            return notifiers;
        }
        for (name, carrier) in notification.iter().filter(|(_, c)| c.enabled) {
            if let Some(notifier) = lookup(name) {
                notifiers.add(name, notifier, carrier.clone());
            }
        }
        notifiers
    }

    /// Register a carrier
    pub fn add(&mut self, name: &str, notifier: Box<dyn Notifier>, carrier: CarrierConfig) {
        self.carriers.push((name.to_string(), notifier, carrier));
    }

    pub fn is_empty(&self) -> bool {
        self.carriers.is_empty()
    }

    /// Send `bump` everywhere it is not skipped; returns `(carrier, error)` for failures.
    pub fn notify(&self, bump: &Bump) -> Vec<(String, String)> {
        let mut failures = Vec::new();
        for (name, notifier, carrier) in &self.carriers {
            if carrier.skip.contains(&bump.environment) {
                log::debug!("{name} skips environment {}", bump.environment);
                continue;
            }
            if let Err(e) = notifier.notify(bump, carrier) {
                failures.push((name.clone(), format!("{e:#}")));
            }
        }
        failures
    }
}
