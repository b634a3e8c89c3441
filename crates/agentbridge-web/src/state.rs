//! Shared application state for the web server.

use std::sync::Arc;

use agentbridge_adapters::Adapter;

use crate::WebConfig;
use crate::mcp::McpServer;

/// Shared state accessible from every Axum handler.
pub struct AppState {
    /// Tool dispatcher over the registered adapters.
    pub mcp: McpServer,

    /// Web server configuration.
    pub config: WebConfig,
}

impl AppState {
    pub fn new(config: WebConfig, adapters: Vec<Arc<dyn Adapter>>) -> Self {
        Self {
            mcp: McpServer::new(adapters),
            config,
        }
    }
}
