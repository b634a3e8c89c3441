//! Shopify Admin REST request parameters and projected records.
//!
//! Records derive both `Deserialize` (from the provider payload, ignoring
//! anything not declared here) and `Serialize` (the tool output), which is
//! what projects provider responses down to the declared fields.  Primary
//! ids are renamed on output (`id` → `product_id`, `order_id`, ...).

use serde::{Deserialize, Serialize};

use crate::params::{flexible_id, flexible_id_opt, string_list};

// =============================================================================
// Shared
// =============================================================================

/// Postal address supplied by the caller.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AddressInput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    pub address1: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address2: Option<String>,
    pub city: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub province: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub province_code: Option<String>,
    pub country: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zip: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

// =============================================================================
// Products
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct CreateProductParams {
    pub title: String,
    #[serde(default)]
    pub body_html: Option<String>,
    #[serde(default)]
    pub vendor: Option<String>,
    #[serde(default)]
    pub product_type: Option<String>,
    #[serde(default, deserialize_with = "string_list")]
    pub tags: Vec<String>,
    /// `active`, `draft` or `archived`.
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub variants: Vec<VariantInput>,
    /// Image source URLs.
    #[serde(default, deserialize_with = "string_list")]
    pub images: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariantInput {
    pub price: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sku: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub option1: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inventory_quantity: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compare_at_price: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListProductsParams {
    #[serde(default)]
    pub limit: Option<u32>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub vendor: Option<String>,
    #[serde(default)]
    pub product_type: Option<String>,
    #[serde(default, deserialize_with = "flexible_id_opt")]
    pub collection_id: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GetProductParams {
    #[serde(deserialize_with = "flexible_id")]
    pub product_id: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    #[serde(rename(serialize = "product_id", deserialize = "id"))]
    pub id: u64,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub handle: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub vendor: Option<String>,
    #[serde(default)]
    pub product_type: Option<String>,
    #[serde(default)]
    pub tags: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(default)]
    pub variants: Vec<ProductVariant>,
    #[serde(default)]
    pub images: Vec<ProductImage>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductVariant {
    pub id: u64,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub price: Option<String>,
    #[serde(default)]
    pub sku: Option<String>,
    #[serde(default)]
    pub inventory_quantity: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductImage {
    pub id: u64,
    #[serde(default)]
    pub src: Option<String>,
}

// =============================================================================
// Collections
// =============================================================================

/// Unified shape of custom and smart collections in the merged listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionSummary {
    pub id: u64,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub handle: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListCollectionsParams {
    #[serde(default)]
    pub limit: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateCollectionParams {
    pub title: String,
    #[serde(default)]
    pub body_html: Option<String>,
    #[serde(default)]
    pub handle: Option<String>,
    #[serde(default)]
    pub published: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomCollection {
    #[serde(rename(serialize = "collection_id", deserialize = "id"))]
    pub id: u64,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub handle: Option<String>,
    #[serde(default)]
    pub body_html: Option<String>,
    #[serde(default)]
    pub published_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AddProductToCollectionParams {
    #[serde(deserialize_with = "flexible_id")]
    pub collection_id: u64,
    #[serde(deserialize_with = "flexible_id")]
    pub product_id: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Collect {
    #[serde(rename(serialize = "collect_id", deserialize = "id"))]
    pub id: u64,
    pub collection_id: u64,
    pub product_id: u64,
    #[serde(default)]
    pub created_at: Option<String>,
}

// =============================================================================
// Orders
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct CreateOrderParams {
    pub line_items: Vec<LineItemInput>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default, deserialize_with = "flexible_id_opt")]
    pub customer_id: Option<u64>,
    #[serde(default)]
    pub shipping_address: Option<AddressInput>,
    #[serde(default)]
    pub billing_address: Option<AddressInput>,
    /// `pending`, `authorized`, `paid`, ...
    #[serde(default)]
    pub financial_status: Option<String>,
    #[serde(default)]
    pub send_receipt: Option<bool>,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default, deserialize_with = "string_list")]
    pub tags: Vec<String>,
}

/// An order line: either an existing variant or a custom item with a price.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineItemInput {
    #[serde(
        default,
        deserialize_with = "flexible_id_opt",
        skip_serializing_if = "Option::is_none"
    )]
    pub variant_id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<String>,
    pub quantity: u32,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListOrdersParams {
    #[serde(default)]
    pub limit: Option<u32>,
    /// `open`, `closed`, `cancelled` or `any` (default).
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub financial_status: Option<String>,
    #[serde(default)]
    pub fulfillment_status: Option<String>,
    #[serde(default)]
    pub created_at_min: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GetOrderParams {
    #[serde(deserialize_with = "flexible_id")]
    pub order_id: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    #[serde(rename(serialize = "order_id", deserialize = "id"))]
    pub id: u64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub order_number: Option<u64>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub financial_status: Option<String>,
    #[serde(default)]
    pub fulfillment_status: Option<String>,
    #[serde(default)]
    pub total_price: Option<String>,
    #[serde(default)]
    pub subtotal_price: Option<String>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub line_items: Vec<OrderLineItem>,
    #[serde(default)]
    pub customer: Option<OrderCustomer>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderLineItem {
    pub id: u64,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub quantity: u32,
    #[serde(default)]
    pub price: Option<String>,
    #[serde(default)]
    pub variant_id: Option<u64>,
    #[serde(default)]
    pub sku: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderCustomer {
    pub id: u64,
    #[serde(default)]
    pub email: Option<String>,
}

// =============================================================================
// Customers
// =============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateCustomerParams {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default, deserialize_with = "string_list")]
    pub tags: Vec<String>,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    pub addresses: Vec<AddressInput>,
    #[serde(default)]
    pub send_email_invite: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchCustomersParams {
    pub query: String,
    #[serde(default)]
    pub limit: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Customer {
    #[serde(rename(serialize = "customer_id", deserialize = "id"))]
    pub id: u64,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub tags: Option<String>,
    #[serde(default)]
    pub orders_count: Option<u64>,
    #[serde(default)]
    pub total_spent: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

// =============================================================================
// Fulfillment
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct CreateFulfillmentParams {
    #[serde(deserialize_with = "flexible_id")]
    pub order_id: u64,
    #[serde(default)]
    pub tracking_number: Option<String>,
    #[serde(default)]
    pub tracking_company: Option<String>,
    #[serde(default)]
    pub tracking_url: Option<String>,
    #[serde(default)]
    pub notify_customer: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FulfillmentOrder {
    pub id: u64,
    #[serde(default)]
    pub status: Option<String>,
}

impl FulfillmentOrder {
    /// Whether Shopify still accepts fulfillments against this order.
    pub fn is_fulfillable(&self) -> bool {
        matches!(self.status.as_deref(), Some("open" | "in_progress"))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fulfillment {
    #[serde(rename(serialize = "fulfillment_id", deserialize = "id"))]
    pub id: u64,
    #[serde(default)]
    pub order_id: Option<u64>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub tracking_company: Option<String>,
    #[serde(default)]
    pub tracking_number: Option<String>,
    #[serde(default)]
    pub tracking_url: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// Result of the create-then-track fulfillment flow.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FulfillmentOutcome {
    #[serde(flatten)]
    pub fulfillment: Fulfillment,
    pub tracking_updated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tracking_error: Option<String>,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn null_titles_and_handles_decode() {
        let summary: CollectionSummary =
            serde_json::from_value(json!({"id": 7, "title": null, "handle": null})).unwrap();
        assert_eq!(summary, CollectionSummary { id: 7, title: None, handle: None });

        let product: Product =
            serde_json::from_value(json!({"id": 1, "title": null, "variants": []})).unwrap();
        assert_eq!(product.title, None);
        assert_eq!(serde_json::to_value(&product).unwrap()["title"], json!(null));

        let order: FulfillmentOrder =
            serde_json::from_value(json!({"id": 3, "status": null})).unwrap();
        assert!(!order.is_fulfillable());
    }
}
