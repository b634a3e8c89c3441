//! Minimal MCP client for the remote call-placement server.
//!
//! Connects with the streamable HTTP transport (JSON-RPC over POST, replies
//! as JSON or a short event stream).  When that handshake fails the client
//! falls back to the legacy SSE transport: a long-lived `GET` event stream
//! announces a POST endpoint and carries the replies.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use futures::StreamExt;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use serde_json::{Value, json};
use tokio::sync::{Mutex, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::sse::{SseParser, parse_all};
use crate::error::{AdapterError, Result};

/// Protocol revision announced during `initialize`.
pub const PROTOCOL_VERSION: &str = "2024-11-05";

const SESSION_HEADER: &str = "Mcp-Session-Id";
const AUTH_CONFIG_HEADER: &str = "X-Auth-Config-Id";
const OPERATION: &str = "reach call relay";

/// How long to wait for the legacy transport to announce its endpoint.
const ENDPOINT_WAIT: Duration = Duration::from_secs(10);

type Pending = Arc<Mutex<HashMap<u64, oneshot::Sender<Value>>>>;

fn stream_closed() -> AdapterError {
    AdapterError::Transport {
        operation: OPERATION.into(),
        reason: "relay event stream closed".into(),
    }
}

enum Transport {
    Streamable {
        endpoint: String,
        session_id: Option<String>,
    },
    Sse {
        endpoint: String,
        pending: Pending,
        /// Set by the reader task, under the `pending` lock, when the stream ends.
        closed: Arc<AtomicBool>,
        reader: JoinHandle<()>,
    },
}

/// A connected relay session, shared by every `call_for_me` invocation.
pub struct RelayClient {
    http: reqwest::Client,
    transport: Transport,
    auth_config_id: String,
    call_timeout: Duration,
    next_id: AtomicU64,
}

impl RelayClient {
    /// Open a session at `url`, trying streamable HTTP first.
    pub async fn connect(
        http: reqwest::Client,
        url: &str,
        auth_config_id: &str,
        call_timeout: Duration,
    ) -> Result<Self> {
        let mut client = Self {
            http,
            transport: Transport::Streamable {
                endpoint: url.to_string(),
                session_id: None,
            },
            auth_config_id: auth_config_id.to_string(),
            call_timeout,
            next_id: AtomicU64::new(1),
        };

        match client.initialize().await {
            Ok(()) => {
                info!(url, transport = "streamable-http", "call relay connected");
                Ok(client)
            }
            Err(e) => {
                warn!(url, error = %e, "streamable HTTP handshake failed, trying SSE");
                client.transport = open_sse(&client.http, url, auth_config_id).await?;
                client.initialize().await?;
                info!(url, transport = "sse", "call relay connected");
                Ok(client)
            }
        }
    }

    pub fn transport_name(&self) -> &'static str {
        match self.transport {
            Transport::Streamable { .. } => "streamable-http",
            Transport::Sse { .. } => "sse",
        }
    }

    /// Whether the legacy event stream has ended.  A closed client can
    /// never answer again and must be replaced.
    pub fn is_closed(&self) -> bool {
        match &self.transport {
            Transport::Streamable { .. } => false,
            Transport::Sse { closed, .. } => closed.load(Ordering::Acquire),
        }
    }

    async fn initialize(&mut self) -> Result<()> {
        let params = json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": {},
            "clientInfo": { "name": "agentbridge", "version": env!("CARGO_PKG_VERSION") }
        });
        let (result, session_id) = self.round_trip("initialize", params).await?;
        if let Transport::Streamable { session_id: slot, .. } = &mut self.transport {
            *slot = session_id;
        }
        let server = result
            .pointer("/serverInfo/name")
            .and_then(Value::as_str)
            .unwrap_or("unknown");
        debug!(server, "relay initialized");
        self.notify("notifications/initialized").await
    }

    /// Invoke a remote tool and return its `CallToolResult`.
    pub async fn call_tool(&self, name: &str, arguments: Value) -> Result<Value> {
        let params = json!({ "name": name, "arguments": arguments });
        let (result, _) = tokio::time::timeout(self.call_timeout, self.round_trip("tools/call", params))
            .await
            .map_err(|_| AdapterError::Transport {
                operation: OPERATION.into(),
                reason: format!("no reply within {}s", self.call_timeout.as_secs()),
            })??;
        Ok(result)
    }

    /// End the session.  Errors are logged only.
    pub async fn close(&self) {
        match &self.transport {
            Transport::Streamable {
                endpoint,
                session_id: Some(session_id),
            } => {
                let request = self
                    .http
                    .delete(endpoint)
                    .header(SESSION_HEADER, session_id);
                if let Err(e) = request.send().await {
                    debug!(error = %e, "relay session delete failed");
                }
            }
            Transport::Streamable { .. } => {}
            Transport::Sse { reader, .. } => reader.abort(),
        }
        info!("call relay session closed");
    }

    fn post(&self, endpoint: &str, body: &Value) -> reqwest::RequestBuilder {
        self.http
            .post(endpoint)
            .header(ACCEPT, "application/json, text/event-stream")
            .header(AUTH_CONFIG_HEADER, &self.auth_config_id)
            .json(body)
    }

    async fn notify(&self, method: &str) -> Result<()> {
        let body = json!({ "jsonrpc": "2.0", "method": method });
        let request = match &self.transport {
            Transport::Streamable { endpoint, session_id } => {
                with_session(self.post(endpoint, &body), session_id.as_deref())
            }
            Transport::Sse { endpoint, .. } => self.post(endpoint, &body),
        };
        let response = request
            .send()
            .await
            .map_err(|e| AdapterError::transport(OPERATION, &e))?;
        if !response.status().is_success() {
            debug!(method, status = response.status().as_u16(), "relay rejected notification");
        }
        Ok(())
    }

    /// Send one request and wait for its reply.  Also returns the session id
    /// the server assigned, if any.
    async fn round_trip(&self, method: &str, params: Value) -> Result<(Value, Option<String>)> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({ "jsonrpc": "2.0", "id": id, "method": method, "params": params });

        let (reply, session_id) = match &self.transport {
            Transport::Streamable { endpoint, session_id } => {
                let request = with_session(self.post(endpoint, &body), session_id.as_deref());
                let response = checked(request.send().await)?;
                let assigned = response
                    .headers()
                    .get(SESSION_HEADER)
                    .and_then(|v| v.to_str().ok())
                    .map(str::to_string)
                    .or_else(|| session_id.clone());
                (read_reply(response, id).await?, assigned)
            }
            Transport::Sse {
                endpoint,
                pending,
                closed,
                ..
            } => {
                let (tx, rx) = oneshot::channel();
                {
                    let mut waiting = pending.lock().await;
                    if closed.load(Ordering::Acquire) {
                        return Err(stream_closed());
                    }
                    waiting.insert(id, tx);
                }
                if let Err(e) = checked(self.post(endpoint, &body).send().await) {
                    pending.lock().await.remove(&id);
                    return Err(e);
                }
                let reply = match tokio::time::timeout(self.call_timeout, rx).await {
                    Ok(Ok(reply)) => reply,
                    Ok(Err(_)) => return Err(stream_closed()),
                    Err(_) => {
                        pending.lock().await.remove(&id);
                        return Err(AdapterError::Transport {
                            operation: OPERATION.into(),
                            reason: format!("no reply within {}s", self.call_timeout.as_secs()),
                        });
                    }
                };
                (reply, None)
            }
        };

        if let Some(error) = reply.get("error") {
            return Err(AdapterError::ExecutionFailed {
                tool_name: method.to_string(),
                reason: error
                    .get("message")
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .unwrap_or_else(|| error.to_string()),
            });
        }
        Ok((reply.get("result").cloned().unwrap_or(Value::Null), session_id))
    }
}

fn with_session(
    request: reqwest::RequestBuilder,
    session_id: Option<&str>,
) -> reqwest::RequestBuilder {
    match session_id {
        Some(id) => request.header(SESSION_HEADER, id),
        None => request,
    }
}

fn checked(
    result: std::result::Result<reqwest::Response, reqwest::Error>,
) -> Result<reqwest::Response> {
    let response = result.map_err(|e| AdapterError::transport(OPERATION, &e))?;
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(AdapterError::Transport {
            operation: OPERATION.into(),
            reason: format!("relay answered HTTP {status}"),
        })
    }
}

/// Pull the JSON-RPC reply with `id` out of a JSON or event-stream body.
async fn read_reply(response: reqwest::Response, id: u64) -> Result<Value> {
    let is_stream = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("text/event-stream"));
    let body = response
        .text()
        .await
        .map_err(|e| AdapterError::transport(OPERATION, &e))?;

    if !is_stream {
        return serde_json::from_str(&body).map_err(|e| AdapterError::Transport {
            operation: OPERATION.into(),
            reason: format!("invalid JSON-RPC reply: {e}"),
        });
    }

    parse_all(&body)
        .into_iter()
        .filter(|event| event.is_message())
        .filter_map(|event| serde_json::from_str::<Value>(&event.data).ok())
        .find(|message| message.get("id").and_then(Value::as_u64) == Some(id))
        .ok_or_else(|| AdapterError::Transport {
            operation: OPERATION.into(),
            reason: format!("event stream ended without a reply to request {id}"),
        })
}

/// Open the legacy event stream and wait for the POST endpoint announcement.
async fn open_sse(http: &reqwest::Client, url: &str, auth_config_id: &str) -> Result<Transport> {
    let response = checked(
        http.get(url)
            .header(ACCEPT, "text/event-stream")
            .header(AUTH_CONFIG_HEADER, auth_config_id)
            .send()
            .await,
    )?;
    let base = response.url().clone();
    let pending: Pending = Arc::new(Mutex::new(HashMap::new()));
    let closed = Arc::new(AtomicBool::new(false));
    let (endpoint_tx, endpoint_rx) = oneshot::channel::<String>();

    let reader = tokio::spawn(read_events(
        response,
        Arc::clone(&pending),
        Arc::clone(&closed),
        endpoint_tx,
    ));

    let announced = match tokio::time::timeout(ENDPOINT_WAIT, endpoint_rx).await {
        Ok(Ok(path)) => path,
        _ => {
            reader.abort();
            return Err(AdapterError::Transport {
                operation: OPERATION.into(),
                reason: "relay event stream announced no endpoint".into(),
            });
        }
    };
    let endpoint = base
        .join(announced.trim())
        .map_err(|e| AdapterError::Transport {
            operation: OPERATION.into(),
            reason: format!("bad endpoint `{announced}`: {e}"),
        })?;
    debug!(endpoint = %endpoint, "relay announced message endpoint");

    Ok(Transport::Sse {
        endpoint: endpoint.to_string(),
        pending,
        closed,
        reader,
    })
}

async fn read_events(
    response: reqwest::Response,
    pending: Pending,
    closed: Arc<AtomicBool>,
    endpoint_tx: oneshot::Sender<String>,
) {
    let mut endpoint_tx = Some(endpoint_tx);
    let mut parser = SseParser::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = match chunk {
            Ok(chunk) => chunk,
            Err(e) => {
                warn!(error = %e, "relay event stream failed");
                break;
            }
        };
        for event in parser.push(&chunk) {
            if event.event.as_deref() == Some("endpoint") {
                if let Some(tx) = endpoint_tx.take() {
                    let _ = tx.send(event.data);
                }
                continue;
            }
            let Ok(message) = serde_json::from_str::<Value>(&event.data) else {
                continue;
            };
            if let Some(id) = message.get("id").and_then(Value::as_u64)
                && let Some(waiter) = pending.lock().await.remove(&id)
            {
                let _ = waiter.send(message);
            }
        }
    }
    // Dropping the waiters fails their requests; later requests see `closed`.
    let mut waiting = pending.lock().await;
    closed.store(true, Ordering::Release);
    waiting.clear();
    warn!("relay event stream ended");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_header_is_only_added_when_known() {
        let http = reqwest::Client::new();
        let with = with_session(http.post("http://localhost/mcp"), Some("s-1"))
            .build()
            .unwrap();
        assert_eq!(with.headers()[SESSION_HEADER], "s-1");
        let without = with_session(http.post("http://localhost/mcp"), None)
            .build()
            .unwrap();
        assert!(without.headers().get(SESSION_HEADER).is_none());
    }
}
