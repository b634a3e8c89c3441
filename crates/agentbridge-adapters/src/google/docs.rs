//! Google Docs v1 adapter.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{info, warn};

use super::client::{GoogleClient, GoogleEndpoints, path_segment};
use crate::auth::CredentialContext;
use crate::error::{AdapterError, Result};
use crate::http::build_client;
use crate::params::parse;
use crate::traits::{Adapter, AdapterType, AuthRequirement, HealthStatus, ToolDefinition};

#[derive(Debug, Deserialize)]
struct CreateDocumentParams {
    title: String,
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DocumentIdParams {
    document_id: String,
}

#[derive(Debug, Deserialize)]
struct AppendTextParams {
    document_id: String,
    text: String,
}

fn document_url(document_id: &str) -> String {
    format!("https://docs.google.com/document/d/{}/edit", path_segment(document_id))
}

/// Plain text of a document body: every text run of every paragraph, tables
/// included, in document order.
pub fn extract_text(document: &Value) -> String {
    let mut out = String::new();
    if let Some(content) = document.pointer("/body/content").and_then(Value::as_array) {
        collect_elements(content, &mut out);
    }
    out
}

fn collect_elements(elements: &[Value], out: &mut String) {
    for element in elements {
        if let Some(runs) = element
            .pointer("/paragraph/elements")
            .and_then(Value::as_array)
        {
            for run in runs {
                if let Some(text) = run.pointer("/textRun/content").and_then(Value::as_str) {
                    out.push_str(text);
                }
            }
        } else if let Some(rows) = element.pointer("/table/tableRows").and_then(Value::as_array) {
            for cell in rows
                .iter()
                .filter_map(|row| row.get("tableCells").and_then(Value::as_array))
                .flatten()
            {
                if let Some(content) = cell.get("content").and_then(Value::as_array) {
                    collect_elements(content, out);
                }
            }
        } else if let Some(content) = element
            .pointer("/tableOfContents/content")
            .and_then(Value::as_array)
        {
            collect_elements(content, out);
        }
    }
}

/// `batchUpdate` request inserting `text` at the end of the body.
fn append_request(text: &str) -> Value {
    json!({
        "requests": [{
            "insertText": {
                "text": text,
                "endOfSegmentLocation": {}
            }
        }]
    })
}

/// Google Docs adapter.
pub struct DocsAdapter {
    id: String,
    connected: bool,
    endpoints: GoogleEndpoints,
    client: reqwest::Client,
}

impl DocsAdapter {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            connected: false,
            endpoints: GoogleEndpoints::default(),
            client: build_client(),
        }
    }

    pub fn with_endpoints(mut self, endpoints: GoogleEndpoints) -> Self {
        self.endpoints = endpoints;
        self
    }

    fn api(&self, ctx: &CredentialContext) -> Result<GoogleClient> {
        GoogleClient::from_context(&self.client, &self.endpoints.docs, ctx)
    }

    /// Create the document, then insert the initial text if any.  A failed
    /// insert leaves the empty document in place and is reported alongside.
    async fn tool_create_document(&self, params: Value, ctx: &CredentialContext) -> Result<Value> {
        let p: CreateDocumentParams = parse("docs_create_document", params)?;
        let api = self.api(ctx)?;

        let created = api
            .post("documents", &json!({ "title": p.title }), "create document")
            .await?;
        let document_id = created
            .get("documentId")
            .and_then(Value::as_str)
            .ok_or_else(|| AdapterError::Transport {
                operation: "create document".into(),
                reason: "response carried no documentId".into(),
            })?
            .to_string();
        info!(document_id = %document_id, "document created");

        let mut result = json!({
            "document_id": document_id,
            "title": created.get("title").cloned().unwrap_or(Value::String(p.title)),
            "url": document_url(&document_id),
        });

        if let Some(content) = p.content.filter(|c| !c.is_empty()) {
            let path = format!("documents/{}:batchUpdate", path_segment(&document_id));
            match api.post(&path, &append_request(&content), "add document content").await {
                Ok(_) => result["content_added"] = json!(true),
                Err(e) => {
                    warn!(document_id = %document_id, error = %e, "initial content not inserted");
                    result["content_added"] = json!(false);
                    result["content_error"] = json!(e.to_string());
                }
            }
        }
        Ok(result)
    }

    async fn tool_get_document(&self, params: Value, ctx: &CredentialContext) -> Result<Value> {
        let p: DocumentIdParams = parse("docs_get_document", params)?;
        let api = self.api(ctx)?;
        let document = api
            .get(&format!("documents/{}", path_segment(&p.document_id)), &[], "get document")
            .await?;
        let text = extract_text(&document);
        Ok(json!({
            "document_id": p.document_id,
            "title": document.get("title").cloned().unwrap_or(Value::Null),
            "revision_id": document.get("revisionId").cloned().unwrap_or(Value::Null),
            "url": document_url(&p.document_id),
            "text": text,
        }))
    }

    async fn tool_append_text(&self, params: Value, ctx: &CredentialContext) -> Result<Value> {
        let tool = "docs_append_text";
        let p: AppendTextParams = parse(tool, params)?;
        if p.text.is_empty() {
            return Err(AdapterError::invalid_params(tool, "text must not be empty"));
        }
        let api = self.api(ctx)?;
        let path = format!("documents/{}:batchUpdate", path_segment(&p.document_id));
        api.post(&path, &append_request(&p.text), "append text").await?;
        Ok(json!({
            "document_id": p.document_id,
            "appended_characters": p.text.chars().count(),
        }))
    }
}

fn build_tool_definitions() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition {
            name: "docs_create_document".into(),
            description: "Create a Google Doc, optionally with initial text".into(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "title": { "type": "string" },
                    "content": { "type": "string", "description": "Initial body text" }
                },
                "required": ["title"]
            }),
        },
        ToolDefinition {
            name: "docs_get_document".into(),
            description: "Read a Google Doc as plain text".into(),
            parameters: json!({
                "type": "object",
                "properties": { "document_id": { "type": "string" } },
                "required": ["document_id"]
            }),
        },
        ToolDefinition {
            name: "docs_append_text".into(),
            description: "Append text to the end of a Google Doc".into(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "document_id": { "type": "string" },
                    "text": { "type": "string" }
                },
                "required": ["document_id", "text"]
            }),
        },
    ]
}

#[async_trait]
impl Adapter for DocsAdapter {
    fn id(&self) -> &str {
        &self.id
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Productivity
    }

    async fn connect(&mut self) -> Result<()> {
        info!(id = %self.id, "docs adapter connected");
        self.connected = true;
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<()> {
        info!(id = %self.id, "docs adapter disconnected");
        self.connected = false;
        Ok(())
    }

    async fn health_check(&self) -> Result<HealthStatus> {
        Ok(if self.connected {
            HealthStatus::Healthy
        } else {
            HealthStatus::Unhealthy
        })
    }

    fn tools(&self) -> Vec<ToolDefinition> {
        build_tool_definitions()
    }

    async fn execute_tool(
        &self,
        name: &str,
        params: Value,
        ctx: &CredentialContext,
    ) -> Result<Value> {
        if !self.connected {
            return Err(AdapterError::ExecutionFailed {
                tool_name: name.to_string(),
                reason: format!("adapter `{}` is not connected", self.id),
            });
        }

        match name {
            "docs_create_document" => self.tool_create_document(params, ctx).await,
            "docs_get_document" => self.tool_get_document(params, ctx).await,
            "docs_append_text" => self.tool_append_text(params, ctx).await,
            _ => Err(AdapterError::ToolNotFound {
                adapter_id: self.id.clone(),
                tool_name: name.to_string(),
            }),
        }
    }

    fn required_auth(&self) -> Option<AuthRequirement> {
        Some(AuthRequirement {
            provider: "google".into(),
            scopes: vec!["https://www.googleapis.com/auth/documents".into()],
        })
    }
}
