//! Thin Shopify Admin REST client bound to one store and one access token.
//!
//! Operations are split by resource family across sibling modules, each
//! adding an `impl ShopifyClient` block.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::auth::ShopifyAuth;
use crate::error::Result;
use crate::http::{ErrorDialect, send_json};

/// Header carrying the Admin API access token.
pub const ACCESS_TOKEN_HEADER: &str = "X-Shopify-Access-Token";

/// Admin API version used when none is configured.
pub const DEFAULT_API_VERSION: &str = "2024-01";

/// Request-scoped Shopify Admin API client.
#[derive(Debug, Clone)]
pub struct ShopifyClient {
    http: reqwest::Client,
    /// `{origin}/admin/api/{version}` without a trailing slash.
    base_url: String,
    access_token: String,
}

impl ShopifyClient {
    /// Client for `https://{store_domain}/admin/api/{api_version}`.
    pub fn new(http: reqwest::Client, auth: &ShopifyAuth, api_version: &str) -> Self {
        let origin = format!("https://{}", auth.store_domain);
        Self::with_origin(http, &origin, auth, api_version)
    }

    /// Client rooted at an explicit origin instead of the store domain.
    pub fn with_origin(
        http: reqwest::Client,
        origin: &str,
        auth: &ShopifyAuth,
        api_version: &str,
    ) -> Self {
        Self {
            http,
            base_url: format!("{}/admin/api/{api_version}", origin.trim_end_matches('/')),
            access_token: auth.access_token.clone(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    // -----------------------------------------------------------------------
    // HTTP helpers
    // -----------------------------------------------------------------------

    pub(crate) async fn get(
        &self,
        path: &str,
        query: &[(&str, String)],
        operation: &str,
    ) -> Result<Value> {
        let request = self
            .http
            .get(self.url(path))
            .header(ACCESS_TOKEN_HEADER, &self.access_token)
            .query(query);
        send_json(request, operation, ErrorDialect::Shopify).await
    }

    pub(crate) async fn post(&self, path: &str, body: &Value, operation: &str) -> Result<Value> {
        let request = self
            .http
            .post(self.url(path))
            .header(ACCESS_TOKEN_HEADER, &self.access_token)
            .json(body);
        send_json(request, operation, ErrorDialect::Shopify).await
    }
}

/// Insert `value` under `key` when present.
pub(crate) fn set_opt<T: Serialize>(object: &mut Map<String, Value>, key: &str, value: Option<T>) {
    if let Some(value) = value
        && let Ok(value) = serde_json::to_value(value)
    {
        object.insert(key.to_string(), value);
    }
}

/// Shopify stores tags as a single comma-separated string.
pub(crate) fn join_tags(tags: &[String]) -> Option<String> {
    (!tags.is_empty()).then(|| tags.join(", "))
}
