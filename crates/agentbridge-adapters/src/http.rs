//! Shared HTTP plumbing for the provider clients.
//!
//! Every provider call goes through [`send_json`] (or [`send_checked`] for
//! non-JSON bodies) so that status handling and error projection stay
//! identical across Shopify and the Google APIs.

use std::time::Duration;

use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{AdapterError, Result};

/// User agent sent on every outbound request.
pub const USER_AGENT: &str = concat!("agentbridge/", env!("CARGO_PKG_VERSION"));

/// Overall request timeout applied by the shared client.
pub const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Fallback `details` text when the provider body carries no error text.
pub const UNKNOWN_ERROR: &str = "Unknown error";

/// Build the HTTP client shared by an adapter's tool calls.
pub fn build_client() -> reqwest::Client {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
        .build()
        .unwrap_or_default()
}

/// How a provider shapes the error body of a non-2xx response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorDialect {
    /// `{"errors": "..."}` or `{"errors": {"field": ["..."]}}`.
    Shopify,
    /// `{"error": {"code": 404, "message": "...", "errors": [...]}}`.
    Google,
}

impl ErrorDialect {
    /// Pull the provider's own error text out of a response body.
    pub fn extract_details(self, body: &str) -> Option<String> {
        let parsed: Value = serde_json::from_str(body).ok()?;
        match self {
            Self::Shopify => match parsed.get("errors").or_else(|| parsed.get("error"))? {
                Value::String(s) => Some(s.clone()),
                Value::Null => None,
                other => Some(other.to_string()),
            },
            Self::Google => match parsed.get("error")? {
                Value::String(s) => parsed
                    .get("error_description")
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .or_else(|| Some(s.clone())),
                Value::Object(obj) => obj
                    .get("message")
                    .and_then(Value::as_str)
                    .map(str::to_string),
                _ => None,
            },
        }
    }
}

/// Map a non-2xx status and its body into an [`AdapterError::Provider`].
pub fn provider_error(
    operation: &str,
    status: reqwest::StatusCode,
    body: &str,
    dialect: ErrorDialect,
) -> AdapterError {
    let details = dialect
        .extract_details(body)
        .unwrap_or_else(|| UNKNOWN_ERROR.to_string());
    warn!(
        operation = operation,
        status = status.as_u16(),
        details = %details,
        "provider rejected request"
    );
    AdapterError::Provider {
        operation: operation.to_string(),
        status: status.as_u16(),
        status_text: status
            .canonical_reason()
            .unwrap_or("Unknown Status")
            .to_string(),
        details,
    }
}

/// Send a request and return the response once its status is known to be
/// successful.
pub async fn send_checked(
    request: reqwest::RequestBuilder,
    operation: &str,
    dialect: ErrorDialect,
) -> Result<reqwest::Response> {
    let response = request
        .send()
        .await
        .map_err(|e| AdapterError::transport(operation, &e))?;

    let status = response.status();
    debug!(operation = operation, status = status.as_u16(), "provider responded");

    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(provider_error(operation, status, &body, dialect))
}

/// Send a request and parse its JSON body.  Empty bodies (e.g. `204 No
/// Content`) parse as `null`.
pub async fn send_json(
    request: reqwest::RequestBuilder,
    operation: &str,
    dialect: ErrorDialect,
) -> Result<Value> {
    let response = send_checked(request, operation, dialect).await?;
    let body = response
        .text()
        .await
        .map_err(|e| AdapterError::transport(operation, &e))?;

    if body.trim().is_empty() {
        return Ok(Value::Null);
    }

    serde_json::from_str(&body).map_err(|e| AdapterError::Transport {
        operation: operation.to_string(),
        reason: format!("invalid JSON in provider response: {e}"),
    })
}

/// Deserialize a JSON member of a provider response into a typed record.
pub fn decode<T: serde::de::DeserializeOwned>(
    value: &Value,
    key: &str,
    operation: &str,
) -> Result<T> {
    let member = value.get(key).cloned().unwrap_or(Value::Null);
    serde_json::from_value(member).map_err(|e| AdapterError::Transport {
        operation: operation.to_string(),
        reason: format!("unexpected `{key}` payload: {e}"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shopify_field_errors_are_stringified() {
        let body = r#"{"errors":{"email":["has already been taken"]}}"#;
        assert_eq!(
            ErrorDialect::Shopify.extract_details(body).as_deref(),
            Some(r#"{"email":["has already been taken"]}"#)
        );
    }

    #[test]
    fn shopify_string_errors_are_verbatim() {
        let body = r#"{"errors":"[API] Invalid API key or access token"}"#;
        assert_eq!(
            ErrorDialect::Shopify.extract_details(body).as_deref(),
            Some("[API] Invalid API key or access token")
        );
    }

    #[test]
    fn google_error_message_is_used() {
        let body = r#"{"error":{"code":404,"message":"File not found: abc.","errors":[]}}"#;
        assert_eq!(
            ErrorDialect::Google.extract_details(body).as_deref(),
            Some("File not found: abc.")
        );
    }

    #[test]
    fn google_oauth_style_error() {
        let body = r#"{"error":"invalid_grant","error_description":"Token has been expired"}"#;
        assert_eq!(
            ErrorDialect::Google.extract_details(body).as_deref(),
            Some("Token has been expired")
        );
    }

    #[test]
    fn unparseable_bodies_yield_none() {
        assert!(ErrorDialect::Shopify.extract_details("<html>").is_none());
        assert!(ErrorDialect::Google.extract_details("").is_none());
    }

    #[test]
    fn provider_error_falls_back_to_unknown() {
        let err = provider_error(
            "get order",
            reqwest::StatusCode::BAD_GATEWAY,
            "upstream down",
            ErrorDialect::Shopify,
        );
        assert_eq!(err.to_string(), "Failed to get order: Bad Gateway");
        assert_eq!(err.details(), Some(UNKNOWN_ERROR));
    }
}
