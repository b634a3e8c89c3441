//! HTTP tool surface for agentbridge.
//!
//! Exposes every registered adapter as an MCP (Model Context Protocol) tool
//! over `POST /mcp`.  The caller's credentials travel in request headers and
//! are turned into a [`CredentialContext`](agentbridge_adapters::CredentialContext)
//! for the duration of one request.

pub mod context;
pub mod mcp;
pub mod server;
pub mod state;

pub use context::credential_context;
pub use mcp::McpServer;
pub use server::WebServer;
pub use state::AppState;

/// Web server configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebConfig {
    /// The address to bind the HTTP server to.
    pub bind_addr: String,
    /// The port to listen on.
    pub port: u16,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1".into(),
            port: 8787,
        }
    }
}

/// Errors raised while running the HTTP server.
#[derive(Debug, thiserror::Error)]
pub enum WebError {
    #[error("failed to bind `{addr}`: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("server error: {0}")]
    Serve(#[from] std::io::Error),
}
