//! Credential context and the auth resolver.
//!
//! Provider credentials are not stored by any adapter.  Each tool call
//! receives a [`CredentialContext`] built from the inbound request (see the
//! web crate's header extraction) and resolves it into a ready-to-use
//! [`BearerAuth`] or [`ShopifyAuth`] before any network call is made.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::AuthError;

/// Suffix appended to bare Shopify shop names.
const MYSHOPIFY_SUFFIX: &str = ".myshopify.com";

static SHOP_DOMAIN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9][A-Za-z0-9.-]*[A-Za-z0-9]$").expect("shop domain pattern is valid")
});

/// Per-request credential bundle injected by the caller's auth source.
///
/// Constructed fresh for every request and dropped when the request
/// completes.  `valid` is set by the auth source; a context with
/// `valid == false` never yields a client configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialContext {
    pub access_token: Option<String>,
    pub store_domain: Option<String>,
    pub user_id: Option<String>,
    pub valid: bool,
    pub error: Option<String>,
    /// Where the user can (re)authorize when the context is invalid.
    pub auth_url: Option<String>,
}

impl Default for CredentialContext {
    fn default() -> Self {
        Self {
            access_token: None,
            store_domain: None,
            user_id: None,
            valid: true,
            error: None,
            auth_url: None,
        }
    }
}

impl CredentialContext {
    /// A valid context carrying only an access token.
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            access_token: Some(token.into()),
            ..Self::default()
        }
    }

    /// Attach a Shopify store domain (raw, normalized on resolution).
    pub fn store_domain(mut self, domain: impl Into<String>) -> Self {
        self.store_domain = Some(domain.into());
        self
    }

    /// Attach the calling user's identifier.
    pub fn user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    /// An invalid context, as reported by the auth source.
    pub fn invalid(error: impl Into<String>, auth_url: Option<String>) -> Self {
        Self {
            valid: false,
            error: Some(error.into()),
            auth_url,
            ..Self::default()
        }
    }
}

/// Resolved bearer credentials for the Google APIs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BearerAuth {
    pub access_token: String,
}

/// Resolved Shopify Admin API credentials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShopifyAuth {
    pub access_token: String,
    /// Fully-qualified store domain, e.g. `acme.myshopify.com`.
    pub store_domain: String,
}

/// Resolve a context into bearer credentials.
pub fn resolve_bearer(ctx: &CredentialContext) -> Result<BearerAuth, AuthError> {
    Ok(BearerAuth {
        access_token: require_token(ctx)?,
    })
}

/// Resolve a context into Shopify credentials, normalizing the store domain.
pub fn resolve_shopify(ctx: &CredentialContext) -> Result<ShopifyAuth, AuthError> {
    let access_token = require_token(ctx)?;
    let raw = ctx
        .store_domain
        .as_deref()
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .ok_or(AuthError::MissingDomain)?;
    Ok(ShopifyAuth {
        access_token,
        store_domain: normalize_shop_domain(raw)?,
    })
}

fn require_token(ctx: &CredentialContext) -> Result<String, AuthError> {
    if !ctx.valid {
        return Err(AuthError::AuthInvalid {
            reason: ctx
                .error
                .clone()
                .unwrap_or_else(|| "credentials rejected by auth source".into()),
            auth_url: ctx.auth_url.clone(),
        });
    }
    ctx.access_token
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .ok_or(AuthError::MissingToken)
}

/// Normalize a shop name or URL into a fully-qualified store domain.
///
/// `acme`, `https://acme.myshopify.com/` and `acme.myshopify.com` all yield
/// `acme.myshopify.com`.  Applying the function to its own output is a no-op.
pub fn normalize_shop_domain(input: &str) -> Result<String, AuthError> {
    let lowered = input.trim().to_ascii_lowercase();
    let without_scheme = lowered
        .strip_prefix("https://")
        .or_else(|| lowered.strip_prefix("http://"))
        .unwrap_or(&lowered);
    let host = without_scheme.split('/').next().unwrap_or_default();

    if !SHOP_DOMAIN_RE.is_match(host) {
        return Err(AuthError::InvalidDomain {
            domain: input.to_string(),
        });
    }

    if host.contains('.') {
        Ok(host.to_string())
    } else {
        Ok(format!("{host}{MYSHOPIFY_SUFFIX}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bearer_resolves_for_valid_context() {
        let ctx = CredentialContext::with_token("ya29.token");
        let auth = resolve_bearer(&ctx).unwrap();
        assert_eq!(auth.access_token, "ya29.token");
    }

    #[test]
    fn invalid_context_is_rejected_with_auth_url() {
        let ctx = CredentialContext {
            access_token: Some("tok".into()),
            ..CredentialContext::invalid(
                "user has not connected Gmail",
                Some("https://auth.example.com/gmail".into()),
            )
        };
        let err = resolve_bearer(&ctx).unwrap_err();
        assert!(matches!(err, AuthError::AuthInvalid { .. }));
        assert!(err.to_string().contains("https://auth.example.com/gmail"));
    }

    #[test]
    fn missing_or_blank_token_is_rejected() {
        let ctx = CredentialContext::default();
        assert_eq!(resolve_bearer(&ctx).unwrap_err(), AuthError::MissingToken);

        let ctx = CredentialContext::with_token("   ");
        assert_eq!(resolve_bearer(&ctx).unwrap_err(), AuthError::MissingToken);
    }

    #[test]
    fn shopify_requires_domain() {
        let ctx = CredentialContext::with_token("shpat_123");
        assert_eq!(resolve_shopify(&ctx).unwrap_err(), AuthError::MissingDomain);
    }

    #[test]
    fn shopify_resolves_and_normalizes_domain() {
        let ctx = CredentialContext::with_token("shpat_123").store_domain("Acme");
        let auth = resolve_shopify(&ctx).unwrap();
        assert_eq!(auth.store_domain, "acme.myshopify.com");
        assert_eq!(auth.access_token, "shpat_123");
    }

    #[test]
    fn shopify_checks_validity_before_domain() {
        let ctx = CredentialContext::invalid("expired", None);
        assert!(matches!(
            resolve_shopify(&ctx).unwrap_err(),
            AuthError::AuthInvalid { .. }
        ));
    }

    #[test]
    fn normalize_bare_name() {
        assert_eq!(normalize_shop_domain("foo").unwrap(), "foo.myshopify.com");
    }

    #[test]
    fn normalize_full_url() {
        assert_eq!(
            normalize_shop_domain("https://foo.myshopify.com/").unwrap(),
            "foo.myshopify.com"
        );
        assert_eq!(
            normalize_shop_domain("http://foo.myshopify.com/admin").unwrap(),
            "foo.myshopify.com"
        );
    }

    #[test]
    fn normalize_is_idempotent() {
        let once = normalize_shop_domain("foo.myshopify.com").unwrap();
        assert_eq!(once, "foo.myshopify.com");
        assert_eq!(normalize_shop_domain(&once).unwrap(), once);
    }

    #[test]
    fn normalize_rejects_bad_names() {
        for bad in ["-bad-", "", "foo bar", "https://", "foo_bar"] {
            assert!(
                matches!(
                    normalize_shop_domain(bad),
                    Err(AuthError::InvalidDomain { .. })
                ),
                "expected `{bad}` to be rejected"
            );
        }
    }
}
