//! Shopify Admin API adapter.
//!
//! Exposes product, collection, order, customer and fulfillment tools.  The
//! store domain and access token come from the per-request
//! [`CredentialContext`]; nothing store-specific is held by the adapter.

mod client;
mod collections;
mod customers;
mod fulfillment;
mod orders;
mod products;
pub mod types;

use async_trait::async_trait;
use serde_json::{Value, json};
use tracing::{debug, info};

pub use client::{ACCESS_TOKEN_HEADER, DEFAULT_API_VERSION, ShopifyClient};

use crate::auth::{CredentialContext, resolve_shopify};
use crate::error::{AdapterError, Result};
use crate::http::build_client;
use crate::params::parse;
use crate::traits::{Adapter, AdapterType, AuthRequirement, HealthStatus, ToolDefinition};
use types::*;

/// Shopify Admin REST adapter.
pub struct ShopifyAdapter {
    /// Unique identifier for this adapter instance.
    id: String,
    /// Whether the adapter has been connected.
    connected: bool,
    /// Admin API version segment, e.g. `2024-01`.
    api_version: String,
    /// Replaces `https://{store}` as the request origin.  Used to point the
    /// adapter at a local stub.
    origin_override: Option<String>,
    /// HTTP client shared by all tool calls.
    client: reqwest::Client,
}

impl ShopifyAdapter {
    /// Create a new Shopify adapter using the default API version.
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            connected: false,
            api_version: DEFAULT_API_VERSION.to_string(),
            origin_override: None,
            client: build_client(),
        }
    }

    /// Use a specific Admin API version.
    pub fn with_api_version(mut self, version: &str) -> Self {
        self.api_version = version.to_string();
        self
    }

    /// Send every request to `origin` instead of the store domain.
    pub fn with_origin(mut self, origin: &str) -> Self {
        self.origin_override = Some(origin.trim_end_matches('/').to_string());
        self
    }

    /// Build a client for the store named in `ctx`.
    fn client_for(&self, ctx: &CredentialContext) -> Result<ShopifyClient> {
        let auth = resolve_shopify(ctx)?;
        debug!(store = %auth.store_domain, "resolved shopify credentials");
        Ok(match &self.origin_override {
            Some(origin) => {
                ShopifyClient::with_origin(self.client.clone(), origin, &auth, &self.api_version)
            }
            None => ShopifyClient::new(self.client.clone(), &auth, &self.api_version),
        })
    }

    async fn dispatch(&self, name: &str, params: Value, ctx: &CredentialContext) -> Result<Value> {
        // Unknown names are rejected before credentials are looked at.
        if !TOOL_NAMES.contains(&name) {
            return Err(AdapterError::ToolNotFound {
                adapter_id: self.id.clone(),
                tool_name: name.to_string(),
            });
        }
        let client = self.client_for(ctx)?;

        let value = match name {
            "shopify_create_product" => {
                serde_json::to_value(client.create_product(parse(name, params)?).await?)?
            }
            "shopify_list_products" => {
                let products = client.list_products(parse(name, params)?).await?;
                json!({ "count": products.len(), "products": products })
            }
            "shopify_get_product" => {
                let p: GetProductParams = parse(name, params)?;
                serde_json::to_value(client.get_product(p.product_id).await?)?
            }
            "shopify_list_collections" => {
                let collections = client.list_collections(parse(name, params)?).await?;
                json!({ "count": collections.len(), "collections": collections })
            }
            "shopify_create_collection" => {
                serde_json::to_value(client.create_collection(parse(name, params)?).await?)?
            }
            "shopify_add_product_to_collection" => {
                serde_json::to_value(client.add_product_to_collection(parse(name, params)?).await?)?
            }
            "shopify_create_order" => {
                serde_json::to_value(client.create_order(parse(name, params)?).await?)?
            }
            "shopify_list_orders" => {
                let orders = client.list_orders(parse(name, params)?).await?;
                json!({ "count": orders.len(), "orders": orders })
            }
            "shopify_get_order" => {
                let p: GetOrderParams = parse(name, params)?;
                serde_json::to_value(client.get_order(p.order_id).await?)?
            }
            "shopify_create_customer" => {
                serde_json::to_value(client.create_customer(parse(name, params)?).await?)?
            }
            "shopify_search_customers" => {
                let customers = client.search_customers(parse(name, params)?).await?;
                json!({ "count": customers.len(), "customers": customers })
            }
            "shopify_create_fulfillment" => {
                serde_json::to_value(client.create_fulfillment(parse(name, params)?).await?)?
            }
            _ => {
                return Err(AdapterError::ToolNotFound {
                    adapter_id: self.id.clone(),
                    tool_name: name.to_string(),
                });
            }
        };
        Ok(value)
    }
}

const TOOL_NAMES: &[&str] = &[
    "shopify_create_product",
    "shopify_list_products",
    "shopify_get_product",
    "shopify_list_collections",
    "shopify_create_collection",
    "shopify_add_product_to_collection",
    "shopify_create_order",
    "shopify_list_orders",
    "shopify_get_order",
    "shopify_create_customer",
    "shopify_search_customers",
    "shopify_create_fulfillment",
];

// ---------------------------------------------------------------------------
// Tool definitions
// ---------------------------------------------------------------------------

fn address_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "first_name": { "type": "string" },
            "last_name": { "type": "string" },
            "company": { "type": "string" },
            "address1": { "type": "string" },
            "address2": { "type": "string" },
            "city": { "type": "string" },
            "province": { "type": "string" },
            "province_code": { "type": "string" },
            "country": { "type": "string" },
            "zip": { "type": "string" },
            "phone": { "type": "string" }
        },
        "required": ["address1", "city", "country"]
    })
}

fn build_tool_definitions() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition {
            name: "shopify_create_product".into(),
            description: "Create a product in the Shopify store, optionally with variants and images".into(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "title": { "type": "string", "description": "Product title" },
                    "body_html": { "type": "string", "description": "Product description (HTML)" },
                    "vendor": { "type": "string" },
                    "product_type": { "type": "string" },
                    "tags": {
                        "type": "array",
                        "items": { "type": "string" },
                        "description": "Tags, as a list or a comma-separated string"
                    },
                    "status": {
                        "type": "string",
                        "enum": ["active", "draft", "archived"],
                        "description": "Publication status (Shopify default: active)"
                    },
                    "variants": {
                        "type": "array",
                        "items": {
                            "type": "object",
                            "properties": {
                                "price": { "type": "string" },
                                "sku": { "type": "string" },
                                "option1": { "type": "string" },
                                "inventory_quantity": { "type": "integer" },
                                "compare_at_price": { "type": "string" }
                            },
                            "required": ["price"]
                        }
                    },
                    "images": {
                        "type": "array",
                        "items": { "type": "string" },
                        "description": "Image source URLs"
                    }
                },
                "required": ["title"]
            }),
        },
        ToolDefinition {
            name: "shopify_list_products".into(),
            description: "List products in the Shopify store".into(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "limit": { "type": "integer", "description": "Maximum results (default: 50, max: 250)" },
                    "status": { "type": "string", "enum": ["active", "draft", "archived"] },
                    "vendor": { "type": "string" },
                    "product_type": { "type": "string" },
                    "collection_id": { "type": "string", "description": "Only products in this collection" }
                },
                "required": []
            }),
        },
        ToolDefinition {
            name: "shopify_get_product".into(),
            description: "Get a single product with its variants and images".into(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "product_id": { "type": "string", "description": "Product ID (numeric or GID)" }
                },
                "required": ["product_id"]
            }),
        },
        ToolDefinition {
            name: "shopify_list_collections".into(),
            description: "List custom and smart collections as a single list".into(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "limit": { "type": "integer", "description": "Maximum results per collection kind (default: 50)" }
                },
                "required": []
            }),
        },
        ToolDefinition {
            name: "shopify_create_collection".into(),
            description: "Create a custom (manually curated) collection".into(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "title": { "type": "string" },
                    "body_html": { "type": "string" },
                    "handle": { "type": "string", "description": "URL handle (derived from the title if omitted)" },
                    "published": { "type": "boolean" }
                },
                "required": ["title"]
            }),
        },
        ToolDefinition {
            name: "shopify_add_product_to_collection".into(),
            description: "Add a product to a custom collection".into(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "collection_id": { "type": "string" },
                    "product_id": { "type": "string" }
                },
                "required": ["collection_id", "product_id"]
            }),
        },
        ToolDefinition {
            name: "shopify_create_order".into(),
            description: "Create an order from variants or custom line items".into(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "line_items": {
                        "type": "array",
                        "items": {
                            "type": "object",
                            "properties": {
                                "variant_id": { "type": "string" },
                                "title": { "type": "string", "description": "Custom item title (with price, instead of variant_id)" },
                                "price": { "type": "string" },
                                "quantity": { "type": "integer", "minimum": 1 }
                            },
                            "required": ["quantity"]
                        }
                    },
                    "email": { "type": "string" },
                    "customer_id": { "type": "string" },
                    "shipping_address": address_schema(),
                    "billing_address": address_schema(),
                    "financial_status": { "type": "string", "enum": ["pending", "authorized", "paid"] },
                    "send_receipt": { "type": "boolean" },
                    "note": { "type": "string" },
                    "tags": { "type": "array", "items": { "type": "string" } }
                },
                "required": ["line_items"]
            }),
        },
        ToolDefinition {
            name: "shopify_list_orders".into(),
            description: "List orders, most recent first".into(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "limit": { "type": "integer", "description": "Maximum results (default: 50, max: 250)" },
                    "status": { "type": "string", "enum": ["open", "closed", "cancelled", "any"], "description": "Order status (default: any)" },
                    "financial_status": { "type": "string" },
                    "fulfillment_status": { "type": "string" },
                    "created_at_min": { "type": "string", "description": "ISO 8601 lower bound on creation time" }
                },
                "required": []
            }),
        },
        ToolDefinition {
            name: "shopify_get_order".into(),
            description: "Get a single order with its line items".into(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "order_id": { "type": "string", "description": "Order ID (numeric or GID)" }
                },
                "required": ["order_id"]
            }),
        },
        ToolDefinition {
            name: "shopify_create_customer".into(),
            description: "Create a customer. Either email or phone is required".into(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "email": { "type": "string" },
                    "phone": { "type": "string", "description": "E.164 phone number" },
                    "first_name": { "type": "string" },
                    "last_name": { "type": "string" },
                    "tags": { "type": "array", "items": { "type": "string" } },
                    "note": { "type": "string" },
                    "addresses": { "type": "array", "items": address_schema() },
                    "send_email_invite": { "type": "boolean" }
                },
                "required": []
            }),
        },
        ToolDefinition {
            name: "shopify_search_customers".into(),
            description: "Search customers (e.g. `email:jane@example.com` or a name)".into(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "query": { "type": "string" },
                    "limit": { "type": "integer", "description": "Maximum results (default: 50)" }
                },
                "required": ["query"]
            }),
        },
        ToolDefinition {
            name: "shopify_create_fulfillment".into(),
            description: "Fulfill all open items of an order, optionally attaching tracking details".into(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "order_id": { "type": "string" },
                    "tracking_number": { "type": "string" },
                    "tracking_company": { "type": "string" },
                    "tracking_url": { "type": "string" },
                    "notify_customer": { "type": "boolean", "description": "Email the customer (default: false)" }
                },
                "required": ["order_id"]
            }),
        },
    ]
}

// ---------------------------------------------------------------------------
// Adapter trait implementation
// ---------------------------------------------------------------------------

#[async_trait]
impl Adapter for ShopifyAdapter {
    fn id(&self) -> &str {
        &self.id
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Commerce
    }

    async fn connect(&mut self) -> Result<()> {
        info!(id = %self.id, api_version = %self.api_version, "shopify adapter connected");
        self.connected = true;
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<()> {
        info!(id = %self.id, "shopify adapter disconnected");
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
        debug!(tool = name, "executing shopify tool");
        self.dispatch(name, params, ctx).await
    }

    fn required_auth(&self) -> Option<AuthRequirement> {
        Some(AuthRequirement {
            provider: "shopify".into(),
            scopes: vec![
                "write_products".into(),
                "write_orders".into(),
                "write_customers".into(),
                "write_merchant_managed_fulfillment_orders".into(),
            ],
        })
    }
}
