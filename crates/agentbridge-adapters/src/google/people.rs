//! Google People v1 contact search.
//!
//! A person can live in the user's saved contacts, in "other contacts"
//! (auto-collected from mail) or in the workspace directory; each is a
//! different endpoint with a different response shape.  `contacts_search`
//! tries the caller-ordered `sources` in turn and answers with the first
//! one that has matches.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, info, warn};

use super::client::{GoogleClient, GoogleEndpoints};
use crate::auth::CredentialContext;
use crate::error::{AdapterError, Result};
use crate::http::build_client;
use crate::params::{page_size, parse};
use crate::traits::{Adapter, AdapterType, AuthRequirement, HealthStatus, ToolDefinition};

const READ_MASK: &str = "names,emailAddresses,phoneNumbers,organizations";

/// Where to look for a person.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContactSource {
    Contacts,
    OtherContacts,
    Directory,
}

impl ContactSource {
    fn path(self) -> &'static str {
        match self {
            Self::Contacts => "people:searchContacts",
            Self::OtherContacts => "otherContacts:search",
            Self::Directory => "people:searchDirectoryPeople",
        }
    }

    fn operation(self) -> &'static str {
        match self {
            Self::Contacts => "search contacts",
            Self::OtherContacts => "search other contacts",
            Self::Directory => "search directory",
        }
    }

    /// Person records in this source's response shape.
    fn people(self, response: &Value) -> Vec<Value> {
        let list = match self {
            Self::Contacts | Self::OtherContacts => response
                .get("results")
                .and_then(Value::as_array)
                .map(|results| {
                    results
                        .iter()
                        .filter_map(|r| r.get("person").cloned())
                        .collect()
                }),
            Self::Directory => response
                .get("people")
                .and_then(Value::as_array)
                .cloned(),
        };
        list.unwrap_or_default()
    }
}

fn default_sources() -> Vec<ContactSource> {
    vec![ContactSource::Contacts, ContactSource::OtherContacts]
}

#[derive(Debug, Deserialize)]
struct SearchParams {
    query: String,
    #[serde(default)]
    page_size: Option<u32>,
    #[serde(default = "default_sources")]
    sources: Vec<ContactSource>,
}

/// Projected contact.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Contact {
    pub resource_name: Option<String>,
    pub name: Option<String>,
    pub emails: Vec<String>,
    pub phones: Vec<String>,
    pub organization: Option<String>,
}

impl Contact {
    pub fn from_person(person: &Value) -> Self {
        let values = |field: &str, key: &str| -> Vec<String> {
            person
                .get(field)
                .and_then(Value::as_array)
                .map(|items| {
                    items
                        .iter()
                        .filter_map(|i| i.get(key).and_then(Value::as_str))
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default()
        };
        Self {
            resource_name: person
                .get("resourceName")
                .and_then(Value::as_str)
                .map(str::to_string),
            name: values("names", "displayName").into_iter().next(),
            emails: values("emailAddresses", "value"),
            phones: values("phoneNumbers", "value"),
            organization: values("organizations", "name").into_iter().next(),
        }
    }
}

/// Google contacts adapter.
pub struct ContactsAdapter {
    id: String,
    connected: bool,
    endpoints: GoogleEndpoints,
    client: reqwest::Client,
}

impl ContactsAdapter {
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

    async fn search_source(
        &self,
        api: &GoogleClient,
        source: ContactSource,
        query: &str,
        page_size: u32,
    ) -> Result<Vec<Contact>> {
        let mut params = vec![
            ("query", query.to_string()),
            ("readMask", READ_MASK.to_string()),
            ("pageSize", page_size.to_string()),
        ];
        if source == ContactSource::Directory {
            params.push(("sources", "DIRECTORY_SOURCE_TYPE_DOMAIN_PROFILE".into()));
            params.push(("sources", "DIRECTORY_SOURCE_TYPE_DOMAIN_CONTACT".into()));
        }
        let response = api.get(source.path(), &params, source.operation()).await?;
        Ok(source
            .people(&response)
            .iter()
            .map(Contact::from_person)
            .collect())
    }

    /// Sources are queried in order.  A failing source is skipped; its error
    /// is only reported when no source answered at all.
    async fn tool_search(&self, params: Value, ctx: &CredentialContext) -> Result<Value> {
        let tool = "contacts_search";
        let p: SearchParams = parse(tool, params)?;
        if p.query.trim().is_empty() {
            return Err(AdapterError::invalid_params(tool, "query must not be empty"));
        }
        if p.sources.is_empty() {
            return Err(AdapterError::invalid_params(tool, "sources must not be empty"));
        }
        let api = GoogleClient::from_context(&self.client, &self.endpoints.people, ctx)?;
        let size = page_size(p.page_size, 10, 30);

        let mut first_error = None;
        let mut answered = false;
        for source in &p.sources {
            match self.search_source(&api, *source, p.query.trim(), size).await {
                Ok(contacts) if !contacts.is_empty() => {
                    debug!(source = ?source, count = contacts.len(), "contacts found");
                    return Ok(json!({
                        "source": source,
                        "count": contacts.len(),
                        "contacts": contacts,
                    }));
                }
                Ok(_) => answered = true,
                Err(e) => {
                    warn!(source = ?source, error = %e, "contact source failed");
                    first_error.get_or_insert(e);
                }
            }
        }

        match first_error {
            Some(e) if !answered => Err(e),
            _ => Ok(json!({ "source": Value::Null, "count": 0, "contacts": [] })),
        }
    }
}

fn build_tool_definitions() -> Vec<ToolDefinition> {
    vec![ToolDefinition {
        name: "contacts_search".into(),
        description: "Search the user's Google contacts by name, email or phone".into(),
        parameters: json!({
            "type": "object",
            "properties": {
                "query": { "type": "string", "description": "Name, email or phone prefix" },
                "page_size": { "type": "integer", "description": "Maximum results per source (default: 10, max: 30)" },
                "sources": {
                    "type": "array",
                    "items": { "type": "string", "enum": ["contacts", "other_contacts", "directory"] },
                    "description": "Sources to try in order; the first with matches wins (default: contacts, other_contacts)"
                }
            },
            "required": ["query"]
        }),
    }]
}

#[async_trait]
impl Adapter for ContactsAdapter {
    fn id(&self) -> &str {
        &self.id
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Productivity
    }

    async fn connect(&mut self) -> Result<()> {
        info!(id = %self.id, "contacts adapter connected");
        self.connected = true;
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<()> {
        info!(id = %self.id, "contacts adapter disconnected");
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
            "contacts_search" => self.tool_search(params, ctx).await,
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
                "https://www.googleapis.com/auth/contacts.readonly".into(),
                "https://www.googleapis.com/auth/contacts.other.readonly".into(),
                "https://www.googleapis.com/auth/directory.readonly".into(),
            ],
        })
    }
}
