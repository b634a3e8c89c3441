//! Gmail v1 adapter: send, draft, list and read messages.

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::{URL_SAFE, URL_SAFE_NO_PAD};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::info;

use super::client::{GoogleClient, GoogleEndpoints, path_segment};
use crate::auth::CredentialContext;
use crate::error::{AdapterError, Result};
use crate::http::build_client;
use crate::mime::{ContentType, OutboundEmail, build_raw_message, encode_raw, split_addresses};
use crate::params::{page_size, parse, string_list};
use crate::traits::{Adapter, AdapterType, AuthRequirement, HealthStatus, ToolDefinition};

/// Headers surfaced by `gmail_get_message`.
const SUMMARY_HEADERS: &[&str] = &["From", "To", "Cc", "Subject", "Date", "Message-ID"];

#[derive(Debug, Deserialize)]
struct ComposeParams {
    #[serde(deserialize_with = "recipients")]
    to: Vec<String>,
    #[serde(default, deserialize_with = "recipients")]
    cc: Vec<String>,
    #[serde(default, deserialize_with = "recipients")]
    bcc: Vec<String>,
    #[serde(default)]
    subject: String,
    #[serde(default)]
    body: Option<String>,
    #[serde(default)]
    html_body: Option<String>,
    #[serde(default)]
    content_type: Option<String>,
    #[serde(default)]
    from: Option<String>,
    #[serde(default)]
    in_reply_to: Option<String>,
    #[serde(default)]
    thread_id: Option<String>,
}

/// Recipients as a list or a comma-separated string.
fn recipients<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(string_list(deserializer)?
        .iter()
        .flat_map(|entry| split_addresses(entry))
        .collect())
}

impl ComposeParams {
    /// Split into the message fields and the optional thread id.
    fn into_email(self) -> Result<(OutboundEmail, Option<String>)> {
        let content_type = self
            .content_type
            .as_deref()
            .map(str::parse::<ContentType>)
            .transpose()?;
        let email = OutboundEmail {
            from: self.from,
            to: self.to,
            cc: self.cc,
            bcc: self.bcc,
            subject: self.subject,
            body: self.body,
            html_body: self.html_body,
            content_type,
            in_reply_to: self.in_reply_to,
        };
        Ok((email, self.thread_id))
    }
}

#[derive(Debug, Default, Deserialize)]
struct ListMessagesParams {
    #[serde(default)]
    query: Option<String>,
    #[serde(default)]
    max_results: Option<u32>,
    #[serde(default, deserialize_with = "string_list")]
    label_ids: Vec<String>,
    #[serde(default)]
    page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GetMessageParams {
    message_id: String,
}

/// Encoded message body plus thread, shaped for `messages.send`.
fn message_payload(email: &OutboundEmail, thread_id: Option<&str>) -> Result<Value> {
    let raw = encode_raw(&build_raw_message(email)?);
    let mut message = json!({ "raw": raw });
    if let Some(thread_id) = thread_id {
        message["threadId"] = json!(thread_id);
    }
    Ok(message)
}

/// Gmail body data is base64url, sometimes with padding.
fn decode_body(data: &str) -> Option<String> {
    let bytes = URL_SAFE_NO_PAD
        .decode(data.trim_end_matches('='))
        .or_else(|_| URL_SAFE.decode(data))
        .ok()?;
    Some(String::from_utf8_lossy(&bytes).into_owned())
}

/// First body part of the given MIME type, searched depth-first.
fn find_body(part: &Value, mime_type: &str) -> Option<String> {
    if part.get("mimeType").and_then(Value::as_str) == Some(mime_type)
        && let Some(data) = part.pointer("/body/data").and_then(Value::as_str)
    {
        return decode_body(data);
    }
    part.get("parts")
        .and_then(Value::as_array)?
        .iter()
        .find_map(|child| find_body(child, mime_type))
}

/// Project a `format=full` message into headers, snippet and decoded bodies.
pub fn summarize_message(message: &Value) -> Value {
    let payload = message.get("payload").cloned().unwrap_or(Value::Null);
    let mut headers = serde_json::Map::new();
    if let Some(list) = payload.get("headers").and_then(Value::as_array) {
        for header in list {
            let (Some(name), Some(value)) = (
                header.get("name").and_then(Value::as_str),
                header.get("value").and_then(Value::as_str),
            ) else {
                continue;
            };
            if let Some(known) = SUMMARY_HEADERS
                .iter()
                .find(|h| h.eq_ignore_ascii_case(name))
            {
                headers.insert(known.to_ascii_lowercase(), json!(value));
            }
        }
    }

    json!({
        "message_id": message.get("id").cloned().unwrap_or(Value::Null),
        "thread_id": message.get("threadId").cloned().unwrap_or(Value::Null),
        "label_ids": message.get("labelIds").cloned().unwrap_or_else(|| json!([])),
        "snippet": message.get("snippet").cloned().unwrap_or(Value::Null),
        "headers": headers,
        "body_text": find_body(&payload, "text/plain"),
        "body_html": find_body(&payload, "text/html"),
    })
}

/// Gmail adapter.
pub struct GmailAdapter {
    id: String,
    connected: bool,
    endpoints: GoogleEndpoints,
    client: reqwest::Client,
}

impl GmailAdapter {
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
        GoogleClient::from_context(&self.client, &self.endpoints.gmail, ctx)
    }

    async fn tool_send_email(&self, params: Value, ctx: &CredentialContext) -> Result<Value> {
        let p: ComposeParams = parse("gmail_send_email", params)?;
        let (email, thread_id) = p.into_email()?;
        let body = message_payload(&email, thread_id.as_deref())?;

        let api = self.api(ctx)?;
        let sent = api
            .post("users/me/messages/send", &body, "send email")
            .await?;
        info!(recipients = email.to.len(), "email sent");
        Ok(json!({
            "message_id": sent.get("id").cloned().unwrap_or(Value::Null),
            "thread_id": sent.get("threadId").cloned().unwrap_or(Value::Null),
            "label_ids": sent.get("labelIds").cloned().unwrap_or_else(|| json!([])),
        }))
    }

    async fn tool_create_draft(&self, params: Value, ctx: &CredentialContext) -> Result<Value> {
        let p: ComposeParams = parse("gmail_create_draft", params)?;
        let (email, thread_id) = p.into_email()?;
        let body = json!({ "message": message_payload(&email, thread_id.as_deref())? });

        let api = self.api(ctx)?;
        let draft = api.post("users/me/drafts", &body, "create draft").await?;
        Ok(json!({
            "draft_id": draft.get("id").cloned().unwrap_or(Value::Null),
            "message_id": draft.pointer("/message/id").cloned().unwrap_or(Value::Null),
            "thread_id": draft.pointer("/message/threadId").cloned().unwrap_or(Value::Null),
        }))
    }

    async fn tool_list_messages(&self, params: Value, ctx: &CredentialContext) -> Result<Value> {
        let p: ListMessagesParams = parse("gmail_list_messages", params)?;
        let mut query = vec![("maxResults", page_size(p.max_results, 50, 500).to_string())];
        if let Some(q) = p.query {
            query.push(("q", q));
        }
        for label in p.label_ids {
            query.push(("labelIds", label));
        }
        if let Some(token) = p.page_token {
            query.push(("pageToken", token));
        }

        let api = self.api(ctx)?;
        let listed = api.get("users/me/messages", &query, "list messages").await?;
        let messages: Vec<Value> = listed
            .get("messages")
            .and_then(Value::as_array)
            .map(|list| {
                list.iter()
                    .map(|m| {
                        json!({
                            "message_id": m.get("id").cloned().unwrap_or(Value::Null),
                            "thread_id": m.get("threadId").cloned().unwrap_or(Value::Null),
                        })
                    })
                    .collect()
            })
            .unwrap_or_default();
        Ok(json!({
            "count": messages.len(),
            "messages": messages,
            "result_size_estimate": listed.get("resultSizeEstimate").cloned().unwrap_or(json!(0)),
            "next_page_token": listed.get("nextPageToken").cloned().unwrap_or(Value::Null),
        }))
    }

    async fn tool_get_message(&self, params: Value, ctx: &CredentialContext) -> Result<Value> {
        let p: GetMessageParams = parse("gmail_get_message", params)?;
        let api = self.api(ctx)?;
        let message = api
            .get(
                &format!("users/me/messages/{}", path_segment(&p.message_id)),
                &[("format", "full".to_string())],
                "get message",
            )
            .await?;
        Ok(summarize_message(&message))
    }
}

fn compose_schema(description: &str) -> Value {
    json!({
        "type": "object",
        "description": description,
        "properties": {
            "to": { "type": "array", "items": { "type": "string" }, "description": "Recipients (list or comma-separated)" },
            "cc": { "type": "array", "items": { "type": "string" } },
            "bcc": { "type": "array", "items": { "type": "string" } },
            "subject": { "type": "string" },
            "body": { "type": "string", "description": "Plain-text body" },
            "html_body": { "type": "string", "description": "HTML body" },
            "content_type": {
                "type": "string",
                "enum": ["text/plain", "text/html", "multipart/alternative"],
                "description": "Override the body type inferred from body/html_body"
            },
            "from": { "type": "string", "description": "Sender (default: the authenticated account)" },
            "in_reply_to": { "type": "string", "description": "Message-ID being replied to" },
            "thread_id": { "type": "string", "description": "Gmail thread to file the message in" }
        },
        "required": ["to"]
    })
}

fn build_tool_definitions() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition {
            name: "gmail_send_email".into(),
            description: "Send an email from the authenticated Gmail account".into(),
            parameters: compose_schema("Message to send"),
        },
        ToolDefinition {
            name: "gmail_create_draft".into(),
            description: "Save an email as a Gmail draft".into(),
            parameters: compose_schema("Draft message"),
        },
        ToolDefinition {
            name: "gmail_list_messages".into(),
            description: "List message ids matching a Gmail search query".into(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "query": { "type": "string", "description": "Gmail search syntax, e.g. from:jane is:unread" },
                    "max_results": { "type": "integer", "description": "Maximum results (default: 50)" },
                    "label_ids": { "type": "array", "items": { "type": "string" } },
                    "page_token": { "type": "string" }
                },
                "required": []
            }),
        },
        ToolDefinition {
            name: "gmail_get_message".into(),
            description: "Read a message's headers and decoded body".into(),
            parameters: json!({
                "type": "object",
                "properties": { "message_id": { "type": "string" } },
                "required": ["message_id"]
            }),
        },
    ]
}

#[async_trait]
impl Adapter for GmailAdapter {
    fn id(&self) -> &str {
        &self.id
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Messaging
    }

    async fn connect(&mut self) -> Result<()> {
        info!(id = %self.id, "gmail adapter connected");
        self.connected = true;
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<()> {
        info!(id = %self.id, "gmail adapter disconnected");
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
            "gmail_send_email" => self.tool_send_email(params, ctx).await,
            "gmail_create_draft" => self.tool_create_draft(params, ctx).await,
            "gmail_list_messages" => self.tool_list_messages(params, ctx).await,
            "gmail_get_message" => self.tool_get_message(params, ctx).await,
            _ => Err(AdapterError::ToolNotFound {
                adapter_id: self.id.clone(),
                tool_name: name.to_string(),
            }),
        }
    }

    fn required_auth(&self) -> Option<AuthRequirement> {
        Some(AuthRequirement {
            provider: "google".into(),
            scopes: vec![
                "https://www.googleapis.com/auth/gmail.send".into(),
                "https://www.googleapis.com/auth/gmail.compose".into(),
                "https://www.googleapis.com/auth/gmail.readonly".into(),
            ],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compose_params_accept_comma_separated_recipients() {
        let p: ComposeParams = parse(
            "gmail_send_email",
            json!({"to": "a@x.com, b@x.com", "cc": ["c@x.com"], "subject": "Hi", "body": "Hi"}),
        )
        .unwrap();
        let (email, thread) = p.into_email().unwrap();
        assert_eq!(email.to, vec!["a@x.com", "b@x.com"]);
        assert_eq!(email.cc, vec!["c@x.com"]);
        assert!(thread.is_none());
    }

    #[test]
    fn unknown_content_type_is_rejected() {
        let p: ComposeParams = parse(
            "gmail_send_email",
            json!({"to": "a@x.com", "content_type": "text/markdown"}),
        )
        .unwrap();
        assert!(p.into_email().is_err());
    }

    #[test]
    fn bad_recipient_fails_before_sending() {
        let email = OutboundEmail {
            to: vec!["user example.com".into()],
            subject: "Hi".into(),
            body: Some("Hi".into()),
            ..Default::default()
        };
        let err = message_payload(&email, None).unwrap_err();
        assert!(matches!(err, AdapterError::InvalidAddress(ref a) if a == "user example.com"));
    }

    #[test]
    fn payload_carries_thread_id() {
        let email = OutboundEmail {
            to: vec!["a@x.com".into()],
            subject: "Re: hi".into(),
            body: Some("ok".into()),
            ..Default::default()
        };
        let payload = message_payload(&email, Some("t-1")).unwrap();
        assert_eq!(payload["threadId"], "t-1");
        assert!(!payload["raw"].as_str().unwrap().contains('='));
    }

    #[test]
    fn message_summary_decodes_nested_parts() {
        let plain = URL_SAFE_NO_PAD.encode("Hello there");
        let html = URL_SAFE.encode("<p>Hello there</p>");
        let message = json!({
            "id": "m1",
            "threadId": "t1",
            "snippet": "Hello there",
            "payload": {
                "mimeType": "multipart/alternative",
                "headers": [
                    { "name": "Subject", "value": "Greetings" },
                    { "name": "from", "value": "jane@example.com" },
                    { "name": "X-Spam", "value": "no" }
                ],
                "parts": [
                    { "mimeType": "text/plain", "body": { "data": plain } },
                    { "mimeType": "text/html", "body": { "data": html } }
                ]
            }
        });
        let summary = summarize_message(&message);
        assert_eq!(summary["message_id"], "m1");
        assert_eq!(summary["headers"]["subject"], "Greetings");
        assert_eq!(summary["headers"]["from"], "jane@example.com");
        assert!(summary["headers"].get("x-spam").is_none());
        assert_eq!(summary["body_text"], "Hello there");
        assert_eq!(summary["body_html"], "<p>Hello there</p>");
    }
}
