//! Core adapter trait and supporting types.
//!
//! Every provider adapter (Shopify, Drive, Docs, Gmail, contacts, call relay)
//! implements the [`Adapter`] trait, giving the tool-surface layer a uniform
//! interface to discover and invoke tools.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::auth::CredentialContext;
use crate::error::Result;

// ---------------------------------------------------------------------------
// Supporting types
// ---------------------------------------------------------------------------

/// The category of service an adapter provides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdapterType {
    /// Storefront administration (products, orders, customers).
    Commerce,
    /// Productivity tools (files, documents, contacts).
    Productivity,
    /// Messaging services (email).
    Messaging,
    /// Telephony relays (placing calls on the user's behalf).
    Telephony,
}

impl std::fmt::Display for AdapterType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Commerce => write!(f, "commerce"),
            Self::Productivity => write!(f, "productivity"),
            Self::Messaging => write!(f, "messaging"),
            Self::Telephony => write!(f, "telephony"),
        }
    }
}

/// The health status of an adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    /// The adapter is fully operational.
    Healthy,
    /// The adapter is working but a dependency is unavailable.
    Degraded,
    /// The adapter is not functional.
    Unhealthy,
}

impl std::fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Healthy => write!(f, "healthy"),
            Self::Degraded => write!(f, "degraded"),
            Self::Unhealthy => write!(f, "unhealthy"),
        }
    }
}

/// A tool exposed by an adapter that the agent can invoke.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Machine-readable tool name (e.g. `shopify_create_order`).
    pub name: String,
    /// Human-readable description of what the tool does.
    pub description: String,
    /// JSON Schema describing the tool's input parameters.
    pub parameters: serde_json::Value,
}

/// Authentication requirements for an adapter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthRequirement {
    /// The credential provider name (e.g. `shopify`, `google`).
    pub provider: String,
    /// The scopes or permissions required.
    pub scopes: Vec<String>,
}

// ---------------------------------------------------------------------------
// Core trait
// ---------------------------------------------------------------------------

/// The universal adapter interface.
///
/// The tool-surface layer discovers available tools via [`Adapter::tools`]
/// and executes them via [`Adapter::execute_tool`], passing the credential
/// context resolved for the current request.
#[async_trait]
pub trait Adapter: Send + Sync {
    /// Return the unique identifier for this adapter instance.
    fn id(&self) -> &str;

    /// Return the category of service this adapter provides.
    fn adapter_type(&self) -> AdapterType;

    /// Mark the adapter ready to serve tool calls.
    async fn connect(&mut self) -> Result<()>;

    /// Release any shared resources held by the adapter.
    async fn disconnect(&mut self) -> Result<()>;

    /// Check whether the adapter is healthy and operational.
    async fn health_check(&self) -> Result<HealthStatus>;

    /// Return the list of tools this adapter exposes.
    fn tools(&self) -> Vec<ToolDefinition>;

    /// Execute a named tool with the given JSON parameters.
    ///
    /// Returns the tool's projected output on success.  The caller wraps
    /// both outcomes into an [`Envelope`](crate::envelope::Envelope).
    async fn execute_tool(
        &self,
        name: &str,
        params: serde_json::Value,
        ctx: &CredentialContext,
    ) -> Result<serde_json::Value>;

    /// Return the authentication requirements for this adapter, if any.
    fn required_auth(&self) -> Option<AuthRequirement>;
}
