//! Adapter error types.
//!
//! All adapter subsystems surface errors through [`AdapterError`].  The
//! variants follow the failure taxonomy the tool boundary reports on:
//! credential problems ([`AuthError`]), local validation failures, provider
//! rejections (non-2xx responses) and transport failures.  Every variant is
//! turned into an error envelope by [`crate::envelope::Envelope`]; none of
//! them is fatal to the process.

/// Credential resolution failures.  Always detected before any network call
/// and always correctable by the caller.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    /// The injected credential context was marked invalid by the auth source.
    #[error("authentication invalid: {reason}{}", authorize_hint(.auth_url))]
    AuthInvalid {
        reason: String,
        auth_url: Option<String>,
    },

    /// No access token was supplied.
    #[error("missing access token")]
    MissingToken,

    /// No Shopify store domain could be derived from the request.
    #[error("missing Shopify store domain")]
    MissingDomain,

    /// The supplied store domain is not a valid shop name.
    #[error("invalid Shopify store domain `{domain}`")]
    InvalidDomain { domain: String },
}

fn authorize_hint(auth_url: &Option<String>) -> String {
    auth_url
        .as_deref()
        .map(|u| format!(" (authorize at {u})"))
        .unwrap_or_default()
}

/// Unified error type for agentbridge adapters.
#[derive(Debug, thiserror::Error)]
pub enum AdapterError {
    /// The requested tool does not exist on this adapter.
    #[error("tool not found: `{tool_name}` on adapter `{adapter_id}`")]
    ToolNotFound {
        adapter_id: String,
        tool_name: String,
    },

    /// The parameters supplied to a tool are invalid.
    #[error("invalid parameters for tool `{tool_name}`: {reason}")]
    InvalidParams { tool_name: String, reason: String },

    /// An email address failed validation.
    #[error("invalid email address: {0}")]
    InvalidAddress(String),

    /// Credential resolution failed.
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// The provider answered with a non-2xx status.
    #[error("Failed to {operation}: {status_text}")]
    Provider {
        operation: String,
        status: u16,
        status_text: String,
        details: String,
    },

    /// The request never produced a usable response (network, body, JSON).
    #[error("Failed to {operation}: {reason}")]
    Transport { operation: String, reason: String },

    /// A tool invocation failed for a reason other than the provider's answer.
    #[error("execution failed for tool `{tool_name}`: {reason}")]
    ExecutionFailed { tool_name: String, reason: String },

    /// JSON serialization or deserialization failed.
    #[error("serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// Configuration error in adapter setup.
    #[error("configuration error: {0}")]
    ConfigError(String),
}

impl AdapterError {
    /// Secondary diagnostic text reported next to the error message.
    pub fn details(&self) -> Option<&str> {
        match self {
            Self::Provider { details, .. } => Some(details),
            _ => None,
        }
    }

    /// Shorthand for an [`AdapterError::InvalidParams`].
    pub fn invalid_params(tool_name: &str, reason: impl Into<String>) -> Self {
        Self::InvalidParams {
            tool_name: tool_name.to_string(),
            reason: reason.into(),
        }
    }

    /// Build a transport error from a `reqwest` failure.
    pub fn transport(operation: &str, err: &reqwest::Error) -> Self {
        let reason = if err.is_timeout() {
            format!("request timed out: {err}")
        } else {
            err.to_string()
        };
        Self::Transport {
            operation: operation.to_string(),
            reason,
        }
    }
}

/// Convenience alias used throughout the adapters crate.
pub type Result<T> = std::result::Result<T, AdapterError>;
