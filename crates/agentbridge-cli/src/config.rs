//! Environment-driven configuration.
//!
//! Values come from the process environment, after `.env` (if present) has
//! been loaded into it.

use std::time::Duration;

use agentbridge_adapters::RelayConfig;
use anyhow::{Context, Result, bail};

pub const AUTH_CONFIG_ID_VAR: &str = "AGENTBRIDGE_AUTH_CONFIG_ID";
pub const RELAY_URL_VAR: &str = "AGENTBRIDGE_RELAY_URL";
pub const TRACKING_URL_VAR: &str = "AGENTBRIDGE_TRACKING_URL";
pub const SHOPIFY_API_VERSION_VAR: &str = "AGENTBRIDGE_SHOPIFY_API_VERSION";
pub const RELAY_TOOL_VAR: &str = "AGENTBRIDGE_RELAY_TOOL";
pub const CALL_TIMEOUT_VAR: &str = "AGENTBRIDGE_CALL_TIMEOUT_SECS";

const DEFAULT_SHOPIFY_API_VERSION: &str = "2024-01";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub shopify_api_version: String,
    pub relay: RelayConfig,
}

impl Config {
    /// Load `.env`, then read the process environment.
    pub fn load() -> Result<Self> {
        if let Ok(path) = dotenvy::dotenv() {
            tracing::debug!(path = %path.display(), "loaded .env");
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from any key lookup.  Blank values count as
    /// unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let Some(auth_config_id) = get(AUTH_CONFIG_ID_VAR) else {
            bail!("{AUTH_CONFIG_ID_VAR} must be set");
        };

        let mut relay = RelayConfig::new(auth_config_id);
        relay.relay_url = get(RELAY_URL_VAR);
        relay.tracking_url = get(TRACKING_URL_VAR);
        if let Some(tool) = get(RELAY_TOOL_VAR) {
            relay.remote_tool = tool;
        }
        if let Some(secs) = get(CALL_TIMEOUT_VAR) {
            let secs: u64 = secs
                .parse()
                .with_context(|| format!("{CALL_TIMEOUT_VAR} must be a number of seconds"))?;
            relay.call_timeout = Duration::from_secs(secs);
        }

        Ok(Self {
            shopify_api_version: get(SHOPIFY_API_VERSION_VAR)
                .unwrap_or_else(|| DEFAULT_SHOPIFY_API_VERSION.to_string()),
            relay,
        })
    }
}
