//! Typed tool parameters.
//!
//! Tool arguments arrive as untyped JSON; each tool deserializes them into its
//! own parameter struct through [`parse`], so missing or mistyped fields
//! surface as [`AdapterError::InvalidParams`] naming the tool.

use serde::de::{DeserializeOwned, Deserializer};
use serde::Deserialize;
use serde_json::Value;

use crate::error::{AdapterError, Result};

/// Deserialize `params` into `T`, treating `null` as an empty object.
pub fn parse<T: DeserializeOwned>(tool_name: &str, params: Value) -> Result<T> {
    let params = if params.is_null() {
        Value::Object(serde_json::Map::new())
    } else {
        params
    };
    serde_json::from_value(params).map_err(|e| AdapterError::invalid_params(tool_name, e.to_string()))
}

/// Clamp an optional page size to `1..=max`, defaulting to `default`.
pub fn page_size(requested: Option<u32>, default: u32, max: u32) -> u32 {
    requested.unwrap_or(default).clamp(1, max)
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrString {
    Number(u64),
    String(String),
}

/// Accept provider ids given either as JSON numbers or numeric strings.
///
/// Agents frequently echo Shopify ids back as strings.
pub fn flexible_id<'de, D>(deserializer: D) -> std::result::Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    match NumberOrString::deserialize(deserializer)? {
        NumberOrString::Number(n) => Ok(n),
        NumberOrString::String(s) => s
            .trim()
            .rsplit('/')
            .next()
            .unwrap_or_default()
            .parse()
            .map_err(|_| serde::de::Error::custom(format!("`{s}` is not a numeric id"))),
    }
}

/// Optional variant of [`flexible_id`].
pub fn flexible_id_opt<'de, D>(deserializer: D) -> std::result::Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<NumberOrString>::deserialize(deserializer)? {
        None => Ok(None),
        Some(NumberOrString::Number(n)) => Ok(Some(n)),
        Some(NumberOrString::String(s)) => s
            .trim()
            .rsplit('/')
            .next()
            .unwrap_or_default()
            .parse()
            .map(Some)
            .map_err(|_| serde::de::Error::custom(format!("`{s}` is not a numeric id"))),
    }
}

/// Accept either a list of strings or a single comma-separated string.
pub fn string_list<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum ListOrString {
        List(Vec<String>),
        String(String),
    }

    Ok(match Option::<ListOrString>::deserialize(deserializer)? {
        None => Vec::new(),
        Some(ListOrString::List(items)) => items
            .into_iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect(),
        Some(ListOrString::String(s)) => s
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
    })
}
