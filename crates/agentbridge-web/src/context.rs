//! Request headers → per-request [`CredentialContext`].
//!
//! The auth source in front of this server injects the caller's
//! credentials as headers.  Nothing here validates the token; that is left
//! to the provider on the first outbound call.

use agentbridge_adapters::CredentialContext;
use axum::http::HeaderMap;
use axum::http::header::AUTHORIZATION;

pub const SHOP_DOMAIN_HEADER: &str = "x-shopify-shop-domain";
pub const SHOP_DOMAIN_FALLBACK_HEADER: &str = "x-shop-domain";
pub const USER_ID_HEADER: &str = "x-user-id";
pub const AUTH_VALID_HEADER: &str = "x-auth-valid";
pub const AUTH_ERROR_HEADER: &str = "x-auth-error";
pub const AUTH_URL_HEADER: &str = "x-auth-url";

/// Non-empty, trimmed UTF-8 value of `name`.
fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = header_str(headers, AUTHORIZATION.as_str())?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then(|| token.to_string())
}

/// Build the credential context for one request.
pub fn credential_context(headers: &HeaderMap) -> CredentialContext {
    let invalid = header_str(headers, AUTH_VALID_HEADER)
        .is_some_and(|v| v.eq_ignore_ascii_case("false") || v == "0");

    let mut ctx = if invalid {
        CredentialContext::invalid(
            header_str(headers, AUTH_ERROR_HEADER).unwrap_or("credentials rejected by auth source"),
            header_str(headers, AUTH_URL_HEADER).map(str::to_string),
        )
    } else {
        CredentialContext::default()
    };

    ctx.access_token = bearer_token(headers);
    ctx.store_domain = header_str(headers, SHOP_DOMAIN_HEADER)
        .or_else(|| header_str(headers, SHOP_DOMAIN_FALLBACK_HEADER))
        .map(str::to_string);
    ctx.user_id = header_str(headers, USER_ID_HEADER).map(str::to_string);
    ctx
}
