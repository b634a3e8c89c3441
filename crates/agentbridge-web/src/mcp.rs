//! MCP (Model Context Protocol) server over HTTP.
//!
//! JSON-RPC 2.0 on `POST /mcp`, single requests or batches.  Handles
//! `initialize`, `ping`, `tools/list` and `tools/call`.  Requests without
//! an `id` are notifications: they are accepted and produce no reply.
//!
//! Every `tools/call` result is one text block holding the pretty-printed
//! [`Envelope`].  Protocol version `2024-11-05`.

use std::collections::HashMap;
use std::sync::Arc;

use agentbridge_adapters::{Adapter, AdapterError, CredentialContext, Envelope};
use axum::Json;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, info, warn};

use crate::context::credential_context;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Protocol constants
// ---------------------------------------------------------------------------

pub const MCP_PROTOCOL_VERSION: &str = "2024-11-05";

const SERVER_NAME: &str = "agentbridge";
const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

pub const PARSE_ERROR: i32 = -32700;
pub const INVALID_REQUEST: i32 = -32600;
pub const METHOD_NOT_FOUND: i32 = -32601;
pub const INVALID_PARAMS: i32 = -32602;
pub const INTERNAL_ERROR: i32 = -32603;

// ---------------------------------------------------------------------------
// JSON-RPC types
// ---------------------------------------------------------------------------

/// A JSON-RPC 2.0 request or notification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    /// Absent for notifications.
    #[serde(default)]
    pub id: Option<Value>,
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

impl JsonRpcRequest {
    /// Requests without an `id` are notifications and get no response.
    pub fn is_notification(&self) -> bool {
        self.id.is_none()
    }
}

/// A JSON-RPC 2.0 response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    pub id: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
}

impl JsonRpcResponse {
    pub fn success(id: Option<Value>, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".into(),
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn error(id: Option<Value>, code: i32, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0".into(),
            id,
            result: None,
            error: Some(JsonRpcError {
                code,
                message: message.into(),
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// MCP result types
// ---------------------------------------------------------------------------

/// An entry of the `tools/list` result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpToolDefinition {
    pub name: String,
    pub description: String,
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpContent {
    #[serde(rename = "type")]
    pub content_type: String,
    pub text: String,
}

/// The result of a `tools/call`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpToolResult {
    pub content: Vec<McpContent>,
    #[serde(rename = "isError", skip_serializing_if = "Option::is_none")]
    pub is_error: Option<bool>,
}

impl McpToolResult {
    /// One text block with the pretty-printed envelope; failed envelopes
    /// are flagged with `isError`.
    pub fn from_envelope(envelope: &Envelope) -> Self {
        let text = serde_json::to_string_pretty(envelope)
            .unwrap_or_else(|e| format!("{{\"success\":false,\"error\":\"{e}\"}}"));
        Self {
            content: vec![McpContent {
                content_type: "text".into(),
                text,
            }],
            is_error: (!envelope.success).then_some(true),
        }
    }
}

// ---------------------------------------------------------------------------
// McpServer
// ---------------------------------------------------------------------------

/// Dispatches MCP requests to the adapter owning each tool.
pub struct McpServer {
    adapters: Vec<Arc<dyn Adapter>>,
    /// Tool name → index into `adapters`.  First registration wins.
    owners: HashMap<String, usize>,
}

impl McpServer {
    pub fn new(adapters: Vec<Arc<dyn Adapter>>) -> Self {
        let mut owners: HashMap<String, usize> = HashMap::new();
        for (index, adapter) in adapters.iter().enumerate() {
            for tool in adapter.tools() {
                if let Some(&prev) = owners.get(&tool.name) {
                    warn!(
                        tool = %tool.name,
                        kept = %adapters[prev].id(),
                        ignored = %adapter.id(),
                        "duplicate tool name"
                    );
                    continue;
                }
                owners.insert(tool.name, index);
            }
        }
        Self { adapters, owners }
    }

    /// The registered adapters, in registration order.
    pub fn adapters(&self) -> &[Arc<dyn Adapter>] {
        &self.adapters
    }

    /// Handle one request.  Returns `None` for notifications.
    pub async fn handle_request(
        &self,
        request: JsonRpcRequest,
        ctx: &CredentialContext,
    ) -> Option<JsonRpcResponse> {
        debug!(method = %request.method, "MCP request received");

        if request.is_notification() {
            return None;
        }

        let response = match request.method.as_str() {
            "initialize" => self.handle_initialize(request.id),
            "ping" => JsonRpcResponse::success(request.id, json!({})),
            "tools/list" => self.handle_tools_list(request.id),
            "tools/call" => self.handle_tools_call(request.id, request.params, ctx).await,
            other => {
                warn!(method = %other, "unknown MCP method");
                JsonRpcResponse::error(
                    request.id,
                    METHOD_NOT_FOUND,
                    format!("method not found: {other}"),
                )
            }
        };
        Some(response)
    }

    fn handle_initialize(&self, id: Option<Value>) -> JsonRpcResponse {
        JsonRpcResponse::success(
            id,
            json!({
                "protocolVersion": MCP_PROTOCOL_VERSION,
                "capabilities": { "tools": {} },
                "serverInfo": {
                    "name": SERVER_NAME,
                    "version": SERVER_VERSION
                }
            }),
        )
    }

    fn handle_tools_list(&self, id: Option<Value>) -> JsonRpcResponse {
        match serde_json::to_value(self.list_tools()) {
            Ok(tools) => JsonRpcResponse::success(id, json!({ "tools": tools })),
            Err(e) => {
                tracing::error!(error = %e, "failed to serialize tool list");
                JsonRpcResponse::error(id, INTERNAL_ERROR, "failed to serialize tool list")
            }
        }
    }

    async fn handle_tools_call(
        &self,
        id: Option<Value>,
        params: Value,
        ctx: &CredentialContext,
    ) -> JsonRpcResponse {
        let Some(name) = params.get("name").and_then(Value::as_str) else {
            return JsonRpcResponse::error(
                id,
                INVALID_PARAMS,
                "missing required field `name` in params",
            );
        };
        let arguments = match params.get("arguments") {
            None | Some(Value::Null) => json!({}),
            Some(args) => args.clone(),
        };

        let envelope = self.call_tool(name, arguments, ctx).await;
        match serde_json::to_value(McpToolResult::from_envelope(&envelope)) {
            Ok(result) => JsonRpcResponse::success(id, result),
            Err(e) => {
                tracing::error!(error = %e, "failed to serialize tool result");
                JsonRpcResponse::error(id, INTERNAL_ERROR, "failed to serialize tool result")
            }
        }
    }

    /// Every tool of every adapter, in registration order.
    pub fn list_tools(&self) -> Vec<McpToolDefinition> {
        self.adapters
            .iter()
            .enumerate()
            .flat_map(|(index, adapter)| {
                adapter
                    .tools()
                    .into_iter()
                    .filter(move |t| self.owners.get(&t.name) == Some(&index))
            })
            .map(|t| McpToolDefinition {
                name: t.name,
                description: t.description,
                input_schema: t.parameters,
            })
            .collect()
    }

    /// Run `name` under `ctx` and fold the outcome into an envelope.
    pub async fn call_tool(&self, name: &str, arguments: Value, ctx: &CredentialContext) -> Envelope {
        let Some(adapter) = self.owners.get(name).map(|&i| &self.adapters[i]) else {
            warn!(tool = %name, "unknown tool");
            return Envelope::failure(&AdapterError::ToolNotFound {
                adapter_id: SERVER_NAME.into(),
                tool_name: name.to_string(),
            });
        };

        let envelope = Envelope::from_result(adapter.execute_tool(name, arguments, ctx).await);
        if envelope.success {
            info!(adapter = %adapter.id(), tool = %name, "tool call succeeded");
        } else {
            warn!(
                adapter = %adapter.id(),
                tool = %name,
                error = envelope.error.as_deref().unwrap_or_default(),
                "tool call failed"
            );
        }
        envelope
    }
}

// ---------------------------------------------------------------------------
// Axum handler
// ---------------------------------------------------------------------------

/// `POST /mcp`: a single JSON-RPC request or a batch.
///
/// A body made only of notifications is answered with `202 Accepted`.
pub async fn handle_mcp_request(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: String,
) -> Response {
    let ctx = credential_context(&headers);

    let parsed: Value = match serde_json::from_str(&body) {
        Ok(v) => v,
        Err(e) => {
            return Json(JsonRpcResponse::error(
                None,
                PARSE_ERROR,
                format!("failed to parse JSON-RPC request: {e}"),
            ))
            .into_response();
        }
    };

    if let Value::Array(items) = parsed {
        if items.is_empty() {
            return Json(JsonRpcResponse::error(None, INVALID_REQUEST, "empty batch request"))
                .into_response();
        }
        let mut responses = Vec::with_capacity(items.len());
        for item in items {
            match serde_json::from_value::<JsonRpcRequest>(item) {
                Ok(request) => responses.extend(state.mcp.handle_request(request, &ctx).await),
                Err(e) => responses.push(JsonRpcResponse::error(
                    None,
                    INVALID_REQUEST,
                    format!("invalid JSON-RPC request: {e}"),
                )),
            }
        }
        if responses.is_empty() {
            return StatusCode::ACCEPTED.into_response();
        }
        return Json(responses).into_response();
    }

    match serde_json::from_value::<JsonRpcRequest>(parsed) {
        Ok(request) => match state.mcp.handle_request(request, &ctx).await {
            Some(response) => Json(response).into_response(),
            None => StatusCode::ACCEPTED.into_response(),
        },
        Err(e) => Json(JsonRpcResponse::error(
            None,
            INVALID_REQUEST,
            format!("invalid JSON-RPC request: {e}"),
        ))
        .into_response(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
