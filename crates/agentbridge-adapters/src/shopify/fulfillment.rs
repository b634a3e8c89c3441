//! Fulfillment creation with optional tracking.
//!
//! Three sequential calls: look up the order's fulfillment orders, create a
//! fulfillment covering the open ones, then attach tracking details when the
//! caller supplied any.  A tracking failure leaves the fulfillment in place;
//! the outcome reports it instead of failing the whole operation.

use serde_json::{Map, Value, json};
use tracing::{info, warn};

use super::client::{ShopifyClient, set_opt};
use super::types::{CreateFulfillmentParams, Fulfillment, FulfillmentOrder, FulfillmentOutcome};
use crate::error::{AdapterError, Result};
use crate::http::decode;

impl ShopifyClient {
    pub async fn create_fulfillment(
        &self,
        params: CreateFulfillmentParams,
    ) -> Result<FulfillmentOutcome> {
        let order_id = params.order_id;
        let open = self.open_fulfillment_orders(order_id).await?;
        if open.is_empty() {
            return Err(AdapterError::ExecutionFailed {
                tool_name: "shopify_create_fulfillment".into(),
                reason: format!("order {order_id} has no open fulfillment orders"),
            });
        }

        let operation = "create fulfillment";
        let line_items: Vec<Value> = open
            .iter()
            .map(|fo| json!({ "fulfillment_order_id": fo.id }))
            .collect();
        let body = json!({
            "fulfillment": {
                "line_items_by_fulfillment_order": line_items,
                "notify_customer": params.notify_customer,
            }
        });
        let response = self.post("fulfillments.json", &body, operation).await?;
        let fulfillment: Fulfillment = decode(&response, "fulfillment", operation)?;
        info!(order_id, fulfillment_id = fulfillment.id, "fulfillment created");

        let Some(tracking_info) = tracking_info(&params) else {
            return Ok(FulfillmentOutcome {
                fulfillment,
                tracking_updated: false,
                tracking_error: None,
            });
        };

        match self
            .update_tracking(fulfillment.id, tracking_info, params.notify_customer)
            .await
        {
            Ok(updated) => Ok(FulfillmentOutcome {
                fulfillment: updated,
                tracking_updated: true,
                tracking_error: None,
            }),
            Err(e) => {
                warn!(
                    order_id,
                    fulfillment_id = fulfillment.id,
                    error = %e,
                    "tracking update failed, fulfillment kept"
                );
                Ok(FulfillmentOutcome {
                    fulfillment,
                    tracking_updated: false,
                    tracking_error: Some(e.to_string()),
                })
            }
        }
    }

    async fn open_fulfillment_orders(&self, order_id: u64) -> Result<Vec<FulfillmentOrder>> {
        let operation = "get fulfillment orders";
        let response = self
            .get(
                &format!("orders/{order_id}/fulfillment_orders.json"),
                &[],
                operation,
            )
            .await?;
        let orders: Vec<FulfillmentOrder> = decode(&response, "fulfillment_orders", operation)?;
        Ok(orders.into_iter().filter(FulfillmentOrder::is_fulfillable).collect())
    }

    async fn update_tracking(
        &self,
        fulfillment_id: u64,
        tracking_info: Value,
        notify_customer: bool,
    ) -> Result<Fulfillment> {
        let operation = "update tracking";
        let body = json!({
            "fulfillment": {
                "tracking_info": tracking_info,
                "notify_customer": notify_customer,
            }
        });
        let response = self
            .post(
                &format!("fulfillments/{fulfillment_id}/update_tracking.json"),
                &body,
                operation,
            )
            .await?;
        decode(&response, "fulfillment", operation)
    }
}

/// `None` when the caller gave no tracking details at all.
fn tracking_info(params: &CreateFulfillmentParams) -> Option<Value> {
    let mut info = Map::new();
    set_opt(&mut info, "number", params.tracking_number.as_deref());
    set_opt(&mut info, "company", params.tracking_company.as_deref());
    set_opt(&mut info, "url", params.tracking_url.as_deref());
    (!info.is_empty()).then_some(Value::Object(info))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(number: Option<&str>, company: Option<&str>) -> CreateFulfillmentParams {
        CreateFulfillmentParams {
            order_id: 1,
            tracking_number: number.map(str::to_string),
            tracking_company: company.map(str::to_string),
            tracking_url: None,
            notify_customer: false,
        }
    }

    #[test]
    fn no_tracking_fields_means_no_update() {
        assert!(tracking_info(&params(None, None)).is_none());
    }

    #[test]
    fn tracking_info_carries_supplied_fields() {
        let info = tracking_info(&params(Some("1Z999"), Some("UPS"))).unwrap();
        assert_eq!(info, json!({"number": "1Z999", "company": "UPS"}));
    }

    #[test]
    fn only_open_fulfillment_orders_are_fulfillable() {
        let open = FulfillmentOrder { id: 1, status: Some("open".into()) };
        let closed = FulfillmentOrder { id: 2, status: Some("closed".into()) };
        assert!(open.is_fulfillable());
        assert!(!closed.is_fulfillable());
    }
}
