//! Bearer-authenticated client shared by the Google service adapters.

use serde_json::Value;
use url::Url;

use crate::auth::{BearerAuth, CredentialContext, resolve_bearer};
use crate::error::Result;
use crate::http::{ErrorDialect, send_checked, send_json};

/// Base URLs of the Google REST surfaces used by the adapters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoogleEndpoints {
    pub drive: String,
    pub drive_upload: String,
    pub docs: String,
    pub gmail: String,
    pub people: String,
}

impl Default for GoogleEndpoints {
    fn default() -> Self {
        Self {
            drive: "https://www.googleapis.com/drive/v3".into(),
            drive_upload: "https://www.googleapis.com/upload/drive/v3".into(),
            docs: "https://docs.googleapis.com/v1".into(),
            gmail: "https://gmail.googleapis.com/gmail/v1".into(),
            people: "https://people.googleapis.com/v1".into(),
        }
    }
}

impl GoogleEndpoints {
    /// All services under one origin, each at a distinct path prefix.
    pub fn rooted_at(origin: &str) -> Self {
        let origin = origin.trim_end_matches('/');
        Self {
            drive: format!("{origin}/drive/v3"),
            drive_upload: format!("{origin}/upload/drive/v3"),
            docs: format!("{origin}/docs/v1"),
            gmail: format!("{origin}/gmail/v1"),
            people: format!("{origin}/people/v1"),
        }
    }
}

/// Percent-encode `value` as one URL path segment, so ids carrying `/`, `?`
/// or `#` cannot change the request path or query.
pub fn path_segment(value: &str) -> String {
    if matches!(value, "." | "..") {
        return value.replace('.', "%2E");
    }
    let Ok(mut url) = Url::parse("http://segment.invalid/") else {
        return value.to_string();
    };
    if let Ok(mut segments) = url.path_segments_mut() {
        segments.clear().push(value);
    }
    url.path().trim_start_matches('/').to_string()
}

/// Request-scoped client carrying one caller's access token.
#[derive(Debug, Clone)]
pub struct GoogleClient {
    http: reqwest::Client,
    base_url: String,
    access_token: String,
}

impl GoogleClient {
    pub fn new(http: reqwest::Client, base_url: &str, auth: BearerAuth) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            access_token: auth.access_token,
        }
    }

    /// Resolve `ctx` and build a client for the service at `base_url`.
    pub fn from_context(
        http: &reqwest::Client,
        base_url: &str,
        ctx: &CredentialContext,
    ) -> Result<Self> {
        Ok(Self::new(http.clone(), base_url, resolve_bearer(ctx)?))
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// An authenticated request against an absolute URL.
    pub fn request(&self, method: reqwest::Method, url: &str) -> reqwest::RequestBuilder {
        self.http.request(method, url).bearer_auth(&self.access_token)
    }

    pub async fn get(&self, path: &str, query: &[(&str, String)], operation: &str) -> Result<Value> {
        let request = self.request(reqwest::Method::GET, &self.url(path)).query(query);
        send_json(request, operation, ErrorDialect::Google).await
    }

    pub async fn post(&self, path: &str, body: &Value, operation: &str) -> Result<Value> {
        let request = self.request(reqwest::Method::POST, &self.url(path)).json(body);
        send_json(request, operation, ErrorDialect::Google).await
    }

    pub async fn delete(&self, path: &str, operation: &str) -> Result<()> {
        let request = self.request(reqwest::Method::DELETE, &self.url(path));
        send_checked(request, operation, ErrorDialect::Google).await?;
        Ok(())
    }
}
