//! Google Drive v3 adapter.
//!
//! File listing, metadata, download (content returned base64), multipart
//! upload, folder creation, deletion and sharing.

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use tracing::{debug, info};

use super::client::{GoogleClient, GoogleEndpoints, path_segment};
use crate::auth::CredentialContext;
use crate::error::{AdapterError, Result};
use crate::http::{ErrorDialect, build_client, send_checked, send_json};
use crate::params::{page_size, parse};
use crate::traits::{Adapter, AdapterType, AuthRequirement, HealthStatus, ToolDefinition};

const FOLDER_MIME_TYPE: &str = "application/vnd.google-apps.folder";
const WORKSPACE_MIME_PREFIX: &str = "application/vnd.google-apps.";
const FILE_FIELDS: &str =
    "id,name,mimeType,size,createdTime,modifiedTime,webViewLink,parents";

// ---------------------------------------------------------------------------
// Parameters and records
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
struct ListFilesParams {
    #[serde(default)]
    query: Option<String>,
    #[serde(default)]
    folder_id: Option<String>,
    #[serde(default)]
    page_size: Option<u32>,
    #[serde(default)]
    order_by: Option<String>,
    #[serde(default)]
    page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FileIdParams {
    file_id: String,
}

#[derive(Debug, Deserialize)]
struct DownloadParams {
    file_id: String,
    #[serde(default)]
    export_mime_type: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UploadParams {
    name: String,
    content_base64: String,
    #[serde(default)]
    mime_type: Option<String>,
    #[serde(default)]
    folder_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CreateFolderParams {
    name: String,
    #[serde(default)]
    parent_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ShareParams {
    file_id: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    domain: Option<String>,
    #[serde(default = "default_role")]
    role: String,
    #[serde(default = "default_grantee", rename = "type")]
    grantee: String,
    #[serde(default)]
    send_notification: Option<bool>,
}

fn default_role() -> String {
    "reader".into()
}

fn default_grantee() -> String {
    "user".into()
}

/// Projected Drive file metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all(deserialize = "camelCase"))]
pub struct DriveFile {
    #[serde(rename(serialize = "file_id", deserialize = "id"))]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub mime_type: Option<String>,
    /// Bytes, as a decimal string.  Absent for folders and Workspace files.
    #[serde(default)]
    pub size: Option<String>,
    #[serde(default)]
    pub created_time: Option<String>,
    #[serde(default)]
    pub modified_time: Option<String>,
    #[serde(default)]
    pub web_view_link: Option<String>,
    #[serde(default)]
    pub parents: Vec<String>,
}

impl DriveFile {
    fn is_workspace_document(&self) -> bool {
        self.mime_type
            .as_deref()
            .is_some_and(|m| m.starts_with(WORKSPACE_MIME_PREFIX) && m != FOLDER_MIME_TYPE)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all(deserialize = "camelCase"))]
pub struct Permission {
    #[serde(rename(serialize = "permission_id", deserialize = "id"))]
    pub id: String,
    #[serde(default)]
    pub role: String,
    #[serde(default, rename(deserialize = "type"))]
    pub grantee_type: String,
    #[serde(default)]
    pub email_address: Option<String>,
    #[serde(default)]
    pub domain: Option<String>,
}

/// Export format for a Google Workspace document without an explicit choice.
fn default_export_type(mime_type: &str) -> &'static str {
    match mime_type.trim_start_matches(WORKSPACE_MIME_PREFIX) {
        "document" => "text/plain",
        "spreadsheet" => "text/csv",
        "drawing" => "image/png",
        _ => "application/pdf",
    }
}

/// Combine the caller's query with a folder constraint, skipping trashed files.
fn build_query(query: Option<&str>, folder_id: Option<&str>) -> String {
    let mut clauses = Vec::new();
    if let Some(q) = query.map(str::trim).filter(|q| !q.is_empty()) {
        clauses.push(format!("({q})"));
    }
    if let Some(folder) = folder_id {
        clauses.push(format!("'{}' in parents", folder.replace('\'', "\\'")));
    }
    clauses.push("trashed = false".into());
    clauses.join(" and ")
}

/// Body of a `multipart/related` upload: JSON metadata then the media.
fn multipart_related_body(
    boundary: &str,
    metadata: &Value,
    mime_type: &str,
    content: &[u8],
) -> Vec<u8> {
    let mut body = Vec::with_capacity(content.len() + 512);
    body.extend_from_slice(
        format!(
            "--{boundary}\r\nContent-Type: application/json; charset=UTF-8\r\n\r\n{metadata}\r\n--{boundary}\r\nContent-Type: {mime_type}\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());
    body
}

// ---------------------------------------------------------------------------
// Adapter
// ---------------------------------------------------------------------------

/// Google Drive adapter.
pub struct DriveAdapter {
    id: String,
    connected: bool,
    endpoints: GoogleEndpoints,
    client: reqwest::Client,
}

impl DriveAdapter {
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
        GoogleClient::from_context(&self.client, &self.endpoints.drive, ctx)
    }

    async fn tool_list_files(&self, params: Value, ctx: &CredentialContext) -> Result<Value> {
        let p: ListFilesParams = parse("drive_list_files", params)?;
        let api = self.api(ctx)?;

        let mut query = vec![
            ("q", build_query(p.query.as_deref(), p.folder_id.as_deref())),
            ("pageSize", page_size(p.page_size, 50, 1000).to_string()),
            ("fields", format!("nextPageToken,files({FILE_FIELDS})")),
        ];
        if let Some(order_by) = p.order_by {
            query.push(("orderBy", order_by));
        }
        if let Some(token) = p.page_token {
            query.push(("pageToken", token));
        }

        let response = api.get("files", &query, "list files").await?;
        let files: Vec<DriveFile> = match response.get("files") {
            Some(files) => serde_json::from_value(files.clone())?,
            None => Vec::new(),
        };
        Ok(json!({
            "count": files.len(),
            "files": files,
            "next_page_token": response.get("nextPageToken").cloned().unwrap_or(Value::Null),
        }))
    }

    async fn fetch_metadata(&self, api: &GoogleClient, file_id: &str) -> Result<DriveFile> {
        let response = api
            .get(
                &format!("files/{}", path_segment(file_id)),
                &[("fields", FILE_FIELDS.to_string())],
                "get file",
            )
            .await?;
        Ok(serde_json::from_value(response)?)
    }

    async fn tool_get_file(&self, params: Value, ctx: &CredentialContext) -> Result<Value> {
        let p: FileIdParams = parse("drive_get_file", params)?;
        let api = self.api(ctx)?;
        Ok(serde_json::to_value(self.fetch_metadata(&api, &p.file_id).await?)?)
    }

    async fn tool_download_file(&self, params: Value, ctx: &CredentialContext) -> Result<Value> {
        let p: DownloadParams = parse("drive_download_file", params)?;
        let api = self.api(ctx)?;
        let meta = self.fetch_metadata(&api, &p.file_id).await?;

        let operation = "download file";
        let (url, mime_type) = if meta.is_workspace_document() {
            let source = meta.mime_type.as_deref().unwrap_or_default();
            let export = p
                .export_mime_type
                .unwrap_or_else(|| default_export_type(source).to_string());
            let url = url::Url::parse_with_params(
                &api.url(&format!("files/{}/export", path_segment(&p.file_id))),
                &[("mimeType", export.as_str())],
            )
            .map_err(|e| AdapterError::ConfigError(e.to_string()))?;
            (url, Some(export))
        } else {
            let url = url::Url::parse_with_params(
                &api.url(&format!("files/{}", path_segment(&p.file_id))),
                &[("alt", "media")],
            )
            .map_err(|e| AdapterError::ConfigError(e.to_string()))?;
            (url, meta.mime_type.clone())
        };

        let response = send_checked(
            api.request(reqwest::Method::GET, url.as_str()),
            operation,
            ErrorDialect::Google,
        )
        .await?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| AdapterError::transport(operation, &e))?;
        debug!(file_id = %p.file_id, bytes = bytes.len(), "downloaded drive file");

        Ok(json!({
            "file_id": meta.id,
            "name": meta.name,
            "mime_type": mime_type,
            "size": bytes.len(),
            "content_base64": STANDARD.encode(&bytes),
        }))
    }

    async fn tool_upload_file(&self, params: Value, ctx: &CredentialContext) -> Result<Value> {
        let tool = "drive_upload_file";
        let p: UploadParams = parse(tool, params)?;
        let content = STANDARD
            .decode(p.content_base64.trim())
            .map_err(|e| AdapterError::invalid_params(tool, format!("content_base64: {e}")))?;
        let mime_type = p
            .mime_type
            .unwrap_or_else(|| "application/octet-stream".into());

        let mut metadata = Map::new();
        metadata.insert("name".into(), Value::String(p.name));
        if let Some(folder) = p.folder_id {
            metadata.insert("parents".into(), json!([folder]));
        }

        let boundary = crate::mime::random_boundary();
        let body = multipart_related_body(&boundary, &Value::Object(metadata), &mime_type, &content);
        let url = format!("{}/files", self.endpoints.drive_upload);
        let api = self.api(ctx)?;
        let request = api
            .request(reqwest::Method::POST, &url)
            .query(&[("uploadType", "multipart"), ("fields", FILE_FIELDS)])
            .header(
                reqwest::header::CONTENT_TYPE,
                format!("multipart/related; boundary={boundary}"),
            )
            .body(body);

        let response = send_json(request, "upload file", ErrorDialect::Google).await?;
        let file: DriveFile = serde_json::from_value(response)?;
        info!(file_id = %file.id, bytes = content.len(), "uploaded drive file");
        Ok(serde_json::to_value(file)?)
    }

    async fn tool_create_folder(&self, params: Value, ctx: &CredentialContext) -> Result<Value> {
        let p: CreateFolderParams = parse("drive_create_folder", params)?;
        let api = self.api(ctx)?;
        let mut body = json!({ "name": p.name, "mimeType": FOLDER_MIME_TYPE });
        if let Some(parent) = p.parent_id {
            body["parents"] = json!([parent]);
        }
        let url = format!("files?fields={FILE_FIELDS}");
        let response = api.post(&url, &body, "create folder").await?;
        let folder: DriveFile = serde_json::from_value(response)?;
        Ok(serde_json::to_value(folder)?)
    }

    async fn tool_delete_file(&self, params: Value, ctx: &CredentialContext) -> Result<Value> {
        let p: FileIdParams = parse("drive_delete_file", params)?;
        let api = self.api(ctx)?;
        api.delete(&format!("files/{}", path_segment(&p.file_id)), "delete file").await?;
        info!(file_id = %p.file_id, "deleted drive file");
        Ok(json!({ "file_id": p.file_id, "deleted": true }))
    }

    async fn tool_share_file(&self, params: Value, ctx: &CredentialContext) -> Result<Value> {
        let tool = "drive_share_file";
        let p: ShareParams = parse(tool, params)?;

        let mut body = json!({ "role": p.role, "type": p.grantee });
        match p.grantee.as_str() {
            "user" | "group" => {
                let email = p.email.as_deref().ok_or_else(|| {
                    AdapterError::invalid_params(tool, "email is required for user and group grants")
                })?;
                crate::mime::validate_address(email)?;
                body["emailAddress"] = json!(email);
            }
            "domain" => {
                let domain = p.domain.as_deref().ok_or_else(|| {
                    AdapterError::invalid_params(tool, "domain is required for domain grants")
                })?;
                body["domain"] = json!(domain);
            }
            "anyone" => {}
            other => {
                return Err(AdapterError::invalid_params(
                    tool,
                    format!("unsupported grantee type `{other}`"),
                ));
            }
        }

        let api = self.api(ctx)?;
        let mut path = format!(
            "files/{}/permissions?fields=id,role,type,emailAddress,domain",
            path_segment(&p.file_id)
        );
        if let Some(notify) = p.send_notification {
            path.push_str(&format!("&sendNotificationEmail={notify}"));
        }
        let response = api.post(&path, &body, "share file").await?;
        let permission: Permission = serde_json::from_value(response)?;
        Ok(json!({ "file_id": p.file_id, "permission": permission }))
    }
}

fn build_tool_definitions() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition {
            name: "drive_list_files".into(),
            description: "List files in Google Drive, optionally filtered by a Drive query or folder".into(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "query": { "type": "string", "description": "Drive search query, e.g. name contains 'report'" },
                    "folder_id": { "type": "string", "description": "Only files directly inside this folder" },
                    "page_size": { "type": "integer", "description": "Maximum results (default: 50)" },
                    "order_by": { "type": "string", "description": "e.g. modifiedTime desc" },
                    "page_token": { "type": "string" }
                },
                "required": []
            }),
        },
        ToolDefinition {
            name: "drive_get_file".into(),
            description: "Get metadata for a Drive file".into(),
            parameters: json!({
                "type": "object",
                "properties": { "file_id": { "type": "string" } },
                "required": ["file_id"]
            }),
        },
        ToolDefinition {
            name: "drive_download_file".into(),
            description: "Download a file's content as base64. Google Docs, Sheets and Slides are exported".into(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "file_id": { "type": "string" },
                    "export_mime_type": { "type": "string", "description": "Export format for Google Workspace files" }
                },
                "required": ["file_id"]
            }),
        },
        ToolDefinition {
            name: "drive_upload_file".into(),
            description: "Upload a file from base64 content".into(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "name": { "type": "string" },
                    "content_base64": { "type": "string" },
                    "mime_type": { "type": "string", "description": "Default: application/octet-stream" },
                    "folder_id": { "type": "string" }
                },
                "required": ["name", "content_base64"]
            }),
        },
        ToolDefinition {
            name: "drive_create_folder".into(),
            description: "Create a folder".into(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "name": { "type": "string" },
                    "parent_id": { "type": "string" }
                },
                "required": ["name"]
            }),
        },
        ToolDefinition {
            name: "drive_delete_file".into(),
            description: "Permanently delete a file or folder".into(),
            parameters: json!({
                "type": "object",
                "properties": { "file_id": { "type": "string" } },
                "required": ["file_id"]
            }),
        },
        ToolDefinition {
            name: "drive_share_file".into(),
            description: "Share a file with a user, group, domain or anyone with the link".into(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "file_id": { "type": "string" },
                    "email": { "type": "string", "description": "Required for user and group grants" },
                    "domain": { "type": "string", "description": "Required for domain grants" },
                    "role": { "type": "string", "enum": ["reader", "commenter", "writer"], "description": "Default: reader" },
                    "type": { "type": "string", "enum": ["user", "group", "domain", "anyone"], "description": "Default: user" },
                    "send_notification": { "type": "boolean" }
                },
                "required": ["file_id"]
            }),
        },
    ]
}

#[async_trait]
impl Adapter for DriveAdapter {
    fn id(&self) -> &str {
        &self.id
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Productivity
    }

    async fn connect(&mut self) -> Result<()> {
        info!(id = %self.id, "drive adapter connected");
        self.connected = true;
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<()> {
        info!(id = %self.id, "drive adapter disconnected");
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
            "drive_list_files" => self.tool_list_files(params, ctx).await,
            "drive_get_file" => self.tool_get_file(params, ctx).await,
            "drive_download_file" => self.tool_download_file(params, ctx).await,
            "drive_upload_file" => self.tool_upload_file(params, ctx).await,
            "drive_create_folder" => self.tool_create_folder(params, ctx).await,
            "drive_delete_file" => self.tool_delete_file(params, ctx).await,
            "drive_share_file" => self.tool_share_file(params, ctx).await,
            _ => Err(AdapterError::ToolNotFound {
                adapter_id: self.id.clone(),
                tool_name: name.to_string(),
            }),
        }
    }

    fn required_auth(&self) -> Option<AuthRequirement> {
        Some(AuthRequirement {
            provider: "google".into(),
            scopes: vec!["https://www.googleapis.com/auth/drive".into()],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_combines_caller_filter_and_folder() {
        assert_eq!(build_query(None, None), "trashed = false");
        assert_eq!(
            build_query(Some("name contains 'q3'"), Some("abc")),
            "(name contains 'q3') and 'abc' in parents and trashed = false"
        );
        assert_eq!(build_query(Some("  "), None), "trashed = false");
    }

    #[test]
    fn workspace_files_export_by_kind() {
        assert_eq!(default_export_type("application/vnd.google-apps.document"), "text/plain");
        assert_eq!(default_export_type("application/vnd.google-apps.spreadsheet"), "text/csv");
        assert_eq!(default_export_type("application/vnd.google-apps.presentation"), "application/pdf");
    }

    #[test]
    fn folders_are_not_exportable() {
        let file = DriveFile {
            id: "1".into(),
            name: "Reports".into(),
            mime_type: Some(FOLDER_MIME_TYPE.into()),
            size: None,
            created_time: None,
            modified_time: None,
            web_view_link: None,
            parents: vec![],
        };
        assert!(!file.is_workspace_document());
    }

    #[test]
    fn drive_file_projects_to_snake_case() {
        let raw = json!({
            "id": "f1",
            "name": "a.txt",
            "mimeType": "text/plain",
            "webViewLink": "https://drive.google.com/file/d/f1/view",
            "kind": "drive#file"
        });
        let file: DriveFile = serde_json::from_value(raw).unwrap();
        let out = serde_json::to_value(file).unwrap();
        assert_eq!(out["file_id"], "f1");
        assert_eq!(out["mime_type"], "text/plain");
        assert!(out.get("kind").is_none());
    }

    #[test]
    fn upload_body_has_metadata_then_media() {
        let body = multipart_related_body("b1", &json!({"name": "a.txt"}), "text/plain", b"hello");
        let text = String::from_utf8(body).unwrap();
        assert!(text.starts_with("--b1\r\nContent-Type: application/json"));
        assert!(text.contains("{\"name\":\"a.txt\"}"));
        assert!(text.contains("Content-Type: text/plain\r\n\r\nhello\r\n--b1--\r\n"));
    }

    #[tokio::test]
    async fn share_requires_email_for_user_grants() {
        let mut adapter = DriveAdapter::new("drive");
        adapter.connect().await.unwrap();
        let err = adapter
            .execute_tool(
                "drive_share_file",
                json!({"file_id": "f1"}),
                &CredentialContext::with_token("t"),
            )
            .await
            .unwrap_err();
        assert!(err.to_string().contains("email is required"), "{err}");
    }

    #[tokio::test]
    async fn execute_tool_rejects_when_not_connected() {
        let adapter = DriveAdapter::new("drive");
        let err = adapter
            .execute_tool("drive_list_files", json!({}), &CredentialContext::with_token("t"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("not connected"));
    }
}
