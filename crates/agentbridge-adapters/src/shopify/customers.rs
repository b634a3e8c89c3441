//! Customer operations.

use serde_json::{Map, json};

use super::client::{ShopifyClient, join_tags, set_opt};
use super::products::{DEFAULT_PAGE, MAX_PAGE};
use super::types::{CreateCustomerParams, Customer, SearchCustomersParams};
use crate::error::{AdapterError, Result};
use crate::http::decode;
use crate::mime::validate_address;
use crate::params::page_size;

impl ShopifyClient {
    /// Create a customer.  Shopify requires an email or a phone number.
    pub async fn create_customer(&self, params: CreateCustomerParams) -> Result<Customer> {
        let operation = "create customer";

        let email = non_blank(params.email);
        let phone = non_blank(params.phone);
        if email.is_none() && phone.is_none() {
            return Err(AdapterError::invalid_params(
                "shopify_create_customer",
                "either email or phone is required",
            ));
        }
        if let Some(email) = &email {
            validate_address(email)?;
        }

        let mut customer = Map::new();
        set_opt(&mut customer, "email", email);
        set_opt(&mut customer, "phone", phone);
        set_opt(&mut customer, "first_name", params.first_name);
        set_opt(&mut customer, "last_name", params.last_name);
        set_opt(&mut customer, "tags", join_tags(&params.tags));
        set_opt(&mut customer, "note", params.note);
        set_opt(&mut customer, "send_email_invite", params.send_email_invite);
        if !params.addresses.is_empty() {
            customer.insert("addresses".into(), serde_json::to_value(&params.addresses)?);
        }

        let body = json!({ "customer": customer });
        let response = self.post("customers.json", &body, operation).await?;
        decode(&response, "customer", operation)
    }

    /// Full-text customer search (`email:foo@bar.com`, `last_name:Doe`, ...).
    pub async fn search_customers(&self, params: SearchCustomersParams) -> Result<Vec<Customer>> {
        let operation = "search customers";
        let query = [
            ("query", params.query),
            (
                "limit",
                page_size(params.limit, DEFAULT_PAGE, MAX_PAGE).to_string(),
            ),
        ];
        let response = self.get("customers/search.json", &query, operation).await?;
        decode(&response, "customers", operation)
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
