//! Provider adapters for agentbridge: Shopify Admin, Google Workspace
//! (Drive, Docs, Gmail, contacts) and a phone-call relay.
//!
//! Each adapter implements the [`Adapter`] trait defined in [`traits`],
//! providing a uniform interface for tool discovery and execution.  Tool
//! results are plain `Result<Value, AdapterError>`; [`envelope`] turns them
//! into the `{success, data | error, details}` wire shape.

pub mod auth;
pub mod envelope;
pub mod error;
pub mod google;
pub mod http;
pub mod mime;
pub mod params;
pub mod relay;
pub mod shopify;
pub mod traits;

pub use auth::{CredentialContext, normalize_shop_domain, resolve_bearer, resolve_shopify};
pub use envelope::Envelope;
pub use error::{AdapterError, AuthError, Result};
pub use google::{ContactsAdapter, DocsAdapter, DriveAdapter, GmailAdapter, GoogleEndpoints};
pub use relay::{CallRelayAdapter, RelayConfig};
pub use shopify::ShopifyAdapter;
pub use traits::{Adapter, AdapterType, AuthRequirement, HealthStatus, ToolDefinition};
