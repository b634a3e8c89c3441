//! The uniform `{success, data | error, details}` response wrapper.
//!
//! Adapters return `Result<Value, AdapterError>`; the conversion to the
//! boolean-flagged JSON shape happens only here, at the tool boundary.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{AdapterError, Result};

/// Wire shape of every tool reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl Envelope {
    /// A successful reply carrying `data`.
    pub fn ok(data: Value) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            details: None,
        }
    }

    /// A failed reply describing `err`.
    pub fn failure(err: &AdapterError) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(err.to_string()),
            details: err.details().map(str::to_string),
        }
    }

    /// Fold an adapter result into an envelope.
    pub fn from_result(result: Result<Value>) -> Self {
        match result {
            Ok(data) => Self::ok(data),
            Err(err) => Self::failure(&err),
        }
    }
}

impl From<Envelope> for Value {
    fn from(envelope: Envelope) -> Self {
        serde_json::to_value(envelope).unwrap_or_else(|e| {
            serde_json::json!({ "success": false, "error": format!("serialization error: {e}") })
        })
    }
}
