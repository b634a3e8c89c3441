//! Router composition and server startup.

use std::future::Future;
use std::sync::Arc;

use agentbridge_adapters::Adapter;
use axum::http::Method;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{Value, json};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::mcp;
use crate::state::AppState;
use crate::{WebConfig, WebError};

/// The agentbridge HTTP server.
pub struct WebServer {
    state: Arc<AppState>,
}

impl WebServer {
    /// Create a server exposing `adapters`.
    ///
    /// Adapters should already be connected.
    pub fn new(config: WebConfig, adapters: Vec<Arc<dyn Adapter>>) -> Self {
        Self {
            state: Arc::new(AppState::new(config, adapters)),
        }
    }

    /// Return the `host:port` string this server will bind to.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.state.config.bind_addr, self.state.config.port)
    }

    /// Build the Axum router with all routes registered.
    pub fn router(&self) -> Router {
        router(Arc::clone(&self.state))
    }

    /// Serve until `shutdown` resolves, then drain in-flight requests.
    ///
    /// # Errors
    ///
    /// Returns [`WebError::Bind`] if the listener cannot be bound.
    pub async fn run<F>(self, shutdown: F) -> Result<(), WebError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = self.addr();
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|source| WebError::Bind {
                addr: addr.clone(),
                source,
            })?;

        let tools = self.state.mcp.list_tools().len();
        tracing::info!(addr = %addr, tools, "starting MCP server");

        let router = self.router();
        drop(self);
        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown)
            .await?;

        tracing::info!("MCP server stopped");
        Ok(())
    }
}

/// Routes: `POST /mcp` and `GET /health`.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/mcp", post(mcp::handle_mcp_request))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
