//! Collection operations.
//!
//! Shopify keeps manually curated ("custom") and rule-based ("smart")
//! collections behind separate endpoints.  [`ShopifyClient::list_collections`]
//! queries both concurrently and merges them, custom first.

use serde_json::{Map, Value, json};

use super::client::{ShopifyClient, set_opt};
use super::products::{DEFAULT_PAGE, MAX_PAGE};
use super::types::{
    AddProductToCollectionParams, Collect, CollectionSummary, CreateCollectionParams,
    CustomCollection, ListCollectionsParams,
};
use crate::error::Result;
use crate::http::decode;
use crate::params::page_size;

impl ShopifyClient {
    /// Custom and smart collections as one list.  When both requests fail,
    /// the custom-collection failure is the one reported.
    pub async fn list_collections(
        &self,
        params: ListCollectionsParams,
    ) -> Result<Vec<CollectionSummary>> {
        let query = [(
            "limit",
            page_size(params.limit, DEFAULT_PAGE, MAX_PAGE).to_string(),
        )];

        let (custom, smart) = tokio::join!(
            self.get("custom_collections.json", &query, "list custom collections"),
            self.get("smart_collections.json", &query, "list smart collections"),
        );

        let custom: Vec<CollectionSummary> =
            decode(&custom?, "custom_collections", "list custom collections")?;
        let smart: Vec<CollectionSummary> =
            decode(&smart?, "smart_collections", "list smart collections")?;

        Ok(custom.into_iter().chain(smart).collect())
    }

    pub async fn create_collection(
        &self,
        params: CreateCollectionParams,
    ) -> Result<CustomCollection> {
        let operation = "create collection";
        let mut collection = Map::new();
        collection.insert("title".into(), Value::String(params.title));
        set_opt(&mut collection, "body_html", params.body_html);
        set_opt(&mut collection, "handle", params.handle);
        set_opt(&mut collection, "published", params.published);

        let body = json!({ "custom_collection": collection });
        let response = self.post("custom_collections.json", &body, operation).await?;
        decode(&response, "custom_collection", operation)
    }

    /// Link a product into a custom collection.
    pub async fn add_product_to_collection(
        &self,
        params: AddProductToCollectionParams,
    ) -> Result<Collect> {
        let operation = "add product to collection";
        let body = json!({
            "collect": {
                "product_id": params.product_id,
                "collection_id": params.collection_id,
            }
        });
        let response = self.post("collects.json", &body, operation).await?;
        decode(&response, "collect", operation)
    }
}
