//! Product operations.

use serde_json::{Map, Value, json};

use super::client::{ShopifyClient, join_tags, set_opt};
use super::types::{CreateProductParams, ListProductsParams, Product};
use crate::error::Result;
use crate::http::decode;
use crate::params::page_size;

/// Shopify caps REST list pages at 250 records.
pub(crate) const MAX_PAGE: u32 = 250;
pub(crate) const DEFAULT_PAGE: u32 = 50;

impl ShopifyClient {
    pub async fn create_product(&self, params: CreateProductParams) -> Result<Product> {
        let operation = "create product";
        let mut product = Map::new();
        product.insert("title".into(), Value::String(params.title));
        set_opt(&mut product, "body_html", params.body_html);
        set_opt(&mut product, "vendor", params.vendor);
        set_opt(&mut product, "product_type", params.product_type);
        set_opt(&mut product, "status", params.status);
        set_opt(&mut product, "tags", join_tags(&params.tags));
        if !params.variants.is_empty() {
            product.insert("variants".into(), serde_json::to_value(&params.variants)?);
        }
        if !params.images.is_empty() {
            let images: Vec<Value> = params.images.iter().map(|src| json!({ "src": src })).collect();
            product.insert("images".into(), Value::Array(images));
        }

        let body = json!({ "product": product });
        let response = self.post("products.json", &body, operation).await?;
        decode(&response, "product", operation)
    }

    pub async fn list_products(&self, params: ListProductsParams) -> Result<Vec<Product>> {
        let operation = "list products";
        let mut query = vec![(
            "limit",
            page_size(params.limit, DEFAULT_PAGE, MAX_PAGE).to_string(),
        )];
        if let Some(status) = params.status {
            query.push(("status", status));
        }
        if let Some(vendor) = params.vendor {
            query.push(("vendor", vendor));
        }
        if let Some(product_type) = params.product_type {
            query.push(("product_type", product_type));
        }
        if let Some(collection_id) = params.collection_id {
            query.push(("collection_id", collection_id.to_string()));
        }

        let response = self.get("products.json", &query, operation).await?;
        decode(&response, "products", operation)
    }

    pub async fn get_product(&self, product_id: u64) -> Result<Product> {
        let operation = "get product";
        let response = self
            .get(&format!("products/{product_id}.json"), &[], operation)
            .await?;
        decode(&response, "product", operation)
    }
}
