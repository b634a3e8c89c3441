//! Order operations.

use serde_json::{Map, Value, json};

use super::client::{ShopifyClient, join_tags, set_opt};
use super::products::{DEFAULT_PAGE, MAX_PAGE};
use super::types::{CreateOrderParams, LineItemInput, ListOrdersParams, Order};
use crate::error::{AdapterError, Result};
use crate::http::decode;
use crate::params::page_size;

const TOOL: &str = "shopify_create_order";

impl ShopifyClient {
    pub async fn create_order(&self, params: CreateOrderParams) -> Result<Order> {
        let operation = "create order";
        validate_line_items(&params.line_items)?;

        let mut order = Map::new();
        order.insert("line_items".into(), serde_json::to_value(&params.line_items)?);
        set_opt(&mut order, "email", params.email);
        set_opt(
            &mut order,
            "customer",
            params.customer_id.map(|id| json!({ "id": id })),
        );
        set_opt(&mut order, "shipping_address", params.shipping_address);
        set_opt(&mut order, "billing_address", params.billing_address);
        set_opt(&mut order, "financial_status", params.financial_status);
        set_opt(&mut order, "send_receipt", params.send_receipt);
        set_opt(&mut order, "note", params.note);
        set_opt(&mut order, "tags", join_tags(&params.tags));

        let body = json!({ "order": Value::Object(order) });
        let response = self.post("orders.json", &body, operation).await?;
        decode(&response, "order", operation)
    }

    pub async fn list_orders(&self, params: ListOrdersParams) -> Result<Vec<Order>> {
        let operation = "list orders";
        let mut query = vec![
            (
                "limit",
                page_size(params.limit, DEFAULT_PAGE, MAX_PAGE).to_string(),
            ),
            ("status", params.status.unwrap_or_else(|| "any".into())),
        ];
        if let Some(financial_status) = params.financial_status {
            query.push(("financial_status", financial_status));
        }
        if let Some(fulfillment_status) = params.fulfillment_status {
            query.push(("fulfillment_status", fulfillment_status));
        }
        if let Some(created_at_min) = params.created_at_min {
            query.push(("created_at_min", created_at_min));
        }

        let response = self.get("orders.json", &query, operation).await?;
        decode(&response, "orders", operation)
    }

    pub async fn get_order(&self, order_id: u64) -> Result<Order> {
        let operation = "get order";
        let response = self
            .get(&format!("orders/{order_id}.json"), &[], operation)
            .await?;
        decode(&response, "order", operation)
    }
}

/// Every line needs either a variant or a custom title with a price.
fn validate_line_items(items: &[LineItemInput]) -> Result<()> {
    if items.is_empty() {
        return Err(AdapterError::invalid_params(TOOL, "line_items must not be empty"));
    }
    for (index, item) in items.iter().enumerate() {
        if item.quantity == 0 {
            return Err(AdapterError::invalid_params(
                TOOL,
                format!("line_items[{index}].quantity must be at least 1"),
            ));
        }
        let custom = item.title.is_some() && item.price.is_some();
        if item.variant_id.is_none() && !custom {
            return Err(AdapterError::invalid_params(
                TOOL,
                format!("line_items[{index}] needs a variant_id or a title and price"),
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(variant_id: Option<u64>, title: Option<&str>, price: Option<&str>) -> LineItemInput {
        LineItemInput {
            variant_id,
            title: title.map(str::to_string),
            price: price.map(str::to_string),
            quantity: 1,
        }
    }

    #[test]
    fn variant_and_custom_lines_are_accepted() {
        let items = vec![line(Some(1), None, None), line(None, Some("Gift wrap"), Some("2.00"))];
        assert!(validate_line_items(&items).is_ok());
    }

    #[test]
    fn empty_and_incomplete_lines_are_rejected() {
        assert!(validate_line_items(&[]).is_err());

        let err = validate_line_items(&[line(None, Some("Gift wrap"), None)]).unwrap_err();
        assert!(err.to_string().contains("line_items[0]"));

        let mut zero = line(Some(1), None, None);
        zero.quantity = 0;
        assert!(validate_line_items(&[zero]).is_err());
    }
}
