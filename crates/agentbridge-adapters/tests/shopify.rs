//! Shopify adapter tests against a stubbed Admin API.

use agentbridge_adapters::{Adapter, CredentialContext, Envelope, ShopifyAdapter};
use serde_json::{Value, json};
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const API: &str = "/admin/api/2024-01";

async fn adapter(server: &MockServer) -> ShopifyAdapter {
    let mut adapter = ShopifyAdapter::new("shopify").with_origin(&server.uri());
    adapter.connect().await.unwrap();
    adapter
}

fn ctx() -> CredentialContext {
    CredentialContext::with_token("shpat_test").store_domain("https://acme.myshopify.com/")
}

async fn call(adapter: &ShopifyAdapter, tool: &str, params: Value) -> Value {
    Envelope::from_result(adapter.execute_tool(tool, params, &ctx()).await).into()
}

// ═══════════════════════════════════════════════════════════════════════
//  Customers
// ═══════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn create_customer_success() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(format!("{API}/customers.json")))
        .and(header("X-Shopify-Access-Token", "shpat_test"))
        .and(body_partial_json(json!({"customer": {"email": "a@b.com"}})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "customer": {
                "id": 207119551,
                "email": "a@b.com",
                "first_name": null,
                "last_name": null,
                "state": "disabled",
                "orders_count": 0,
                "admin_graphql_api_id": "gid://shopify/Customer/207119551"
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let adapter = adapter(&server).await;
    let reply = call(&adapter, "shopify_create_customer", json!({"email": "a@b.com"})).await;

    assert_eq!(reply["success"], true);
    assert_eq!(reply["data"]["customer_id"], 207119551);
    assert_eq!(reply["data"]["email"], "a@b.com");
    assert!(reply["data"].get("admin_graphql_api_id").is_none());
    assert!(reply.get("error").is_none());
}

#[tokio::test]
async fn create_customer_rejected_with_field_errors() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(format!("{API}/customers.json")))
        .respond_with(ResponseTemplate::new(422).set_body_json(json!({
            "errors": { "email": ["has already been taken"] }
        })))
        .mount(&server)
        .await;

    let adapter = adapter(&server).await;
    let reply = call(&adapter, "shopify_create_customer", json!({"email": "a@b.com"})).await;

    assert_eq!(
        reply,
        json!({
            "success": false,
            "error": "Failed to create customer: Unprocessable Entity",
            "details": "{\"email\":[\"has already been taken\"]}"
        })
    );
}

#[tokio::test]
async fn search_customers_passes_query_and_default_limit() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("{API}/customers/search.json")))
        .and(query_param("query", "email:jane@example.com"))
        .and(query_param("limit", "50"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "customers": [{ "id": 1, "email": "jane@example.com", "first_name": "Jane" }]
        })))
        .mount(&server)
        .await;

    let adapter = adapter(&server).await;
    let reply = call(
        &adapter,
        "shopify_search_customers",
        json!({"query": "email:jane@example.com"}),
    )
    .await;

    assert_eq!(reply["success"], true);
    assert_eq!(reply["data"]["count"], 1);
    assert_eq!(reply["data"]["customers"][0]["first_name"], "Jane");
}

// ═══════════════════════════════════════════════════════════════════════
//  Collections fan-out
// ═══════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn list_collections_merges_custom_then_smart() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("{API}/custom_collections.json")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "custom_collections": [
                { "id": 11, "title": "Summer", "handle": "summer", "sort_order": "manual" },
                { "id": 12, "title": "Sale", "handle": "sale" }
            ]
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("{API}/smart_collections.json")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "smart_collections": [
                { "id": 21, "title": "New arrivals", "handle": "new", "rules": [] }
            ]
        })))
        .mount(&server)
        .await;

    let adapter = adapter(&server).await;
    let reply = call(&adapter, "shopify_list_collections", json!({})).await;

    assert_eq!(reply["success"], true);
    assert_eq!(reply["data"]["count"], 3);
    assert_eq!(
        reply["data"]["collections"],
        json!([
            { "id": 11, "title": "Summer", "handle": "summer" },
            { "id": 12, "title": "Sale", "handle": "sale" },
            { "id": 21, "title": "New arrivals", "handle": "new" }
        ])
    );
}

#[tokio::test]
async fn list_collections_surfaces_custom_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("{API}/custom_collections.json")))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "errors": "[API] Invalid API key or access token (unrecognized login or wrong password)"
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("{API}/smart_collections.json")))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "smart_collections": [] })),
        )
        .mount(&server)
        .await;

    let adapter = adapter(&server).await;
    let reply = call(&adapter, "shopify_list_collections", json!({})).await;

    assert_eq!(reply["success"], false);
    assert_eq!(reply["error"], "Failed to list custom collections: Unauthorized");
    assert_eq!(
        reply["details"],
        "[API] Invalid API key or access token (unrecognized login or wrong password)"
    );
}

#[tokio::test]
async fn list_collections_prefers_custom_error_when_both_fail() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("{API}/custom_collections.json")))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({ "errors": "custom denied" })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("{API}/smart_collections.json")))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({ "errors": "smart broke" })))
        .mount(&server)
        .await;

    let adapter = adapter(&server).await;
    let reply = call(&adapter, "shopify_list_collections", json!({})).await;

    assert_eq!(reply["error"], "Failed to list custom collections: Forbidden");
    assert_eq!(reply["details"], "custom denied");
}

// ═══════════════════════════════════════════════════════════════════════
//  Products and orders
// ═══════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn create_product_sends_tags_as_string() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(format!("{API}/products.json")))
        .and(body_partial_json(json!({
            "product": {
                "title": "Pineapple Tee",
                "tags": "summer, cotton",
                "variants": [{ "price": "25.00", "sku": "TEE-1" }],
                "images": [{ "src": "https://cdn.example.com/tee.png" }]
            }
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "product": {
                "id": 632910392,
                "title": "Pineapple Tee",
                "handle": "pineapple-tee",
                "status": "active",
                "tags": "cotton, summer",
                "variants": [{ "id": 808950810, "title": "Default Title", "price": "25.00", "sku": "TEE-1" }],
                "images": []
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let adapter = adapter(&server).await;
    let reply = call(
        &adapter,
        "shopify_create_product",
        json!({
            "title": "Pineapple Tee",
            "tags": "summer, cotton",
            "variants": [{ "price": "25.00", "sku": "TEE-1" }],
            "images": ["https://cdn.example.com/tee.png"]
        }),
    )
    .await;

    assert_eq!(reply["success"], true);
    assert_eq!(reply["data"]["product_id"], 632910392);
    assert_eq!(reply["data"]["variants"][0]["id"], 808950810);
}

#[tokio::test]
async fn get_order_accepts_gid() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("{API}/orders/450789469.json")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "order": {
                "id": 450789469,
                "name": "#1001",
                "total_price": "598.94",
                "currency": "USD",
                "line_items": [{ "id": 466157049, "title": "IPod Nano", "quantity": 1, "price": "199.00" }]
            }
        })))
        .mount(&server)
        .await;

    let adapter = adapter(&server).await;
    let reply = call(
        &adapter,
        "shopify_get_order",
        json!({"order_id": "gid://shopify/Order/450789469"}),
    )
    .await;

    assert_eq!(reply["success"], true);
    assert_eq!(reply["data"]["order_id"], 450789469);
    assert_eq!(reply["data"]["line_items"][0]["quantity"], 1);
}

#[tokio::test]
async fn list_orders_defaults_to_any_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("{API}/orders.json")))
        .and(query_param("status", "any"))
        .and(query_param("limit", "50"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "orders": [] })))
        .expect(1)
        .mount(&server)
        .await;

    let adapter = adapter(&server).await;
    let reply = call(&adapter, "shopify_list_orders", json!({})).await;
    assert_eq!(reply["data"], json!({ "count": 0, "orders": [] }));
}

#[tokio::test]
async fn provider_body_without_errors_falls_back_to_unknown() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("{API}/products/1.json")))
        .respond_with(ResponseTemplate::new(404).set_body_string("Not Found"))
        .mount(&server)
        .await;

    let adapter = adapter(&server).await;
    let reply = call(&adapter, "shopify_get_product", json!({"product_id": 1})).await;

    assert_eq!(reply["error"], "Failed to get product: Not Found");
    assert_eq!(reply["details"], "Unknown error");
}

#[tokio::test]
async fn unreachable_store_fails_the_envelope() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let origin = format!("http://{}", listener.local_addr().unwrap());
    drop(listener);

    let mut adapter = ShopifyAdapter::new("shopify").with_origin(&origin);
    adapter.connect().await.unwrap();
    let reply = call(&adapter, "shopify_list_orders", json!({})).await;

    assert_eq!(reply["success"], false);
    assert!(reply.get("data").is_none());
    let error = reply["error"].as_str().unwrap();
    assert!(error.starts_with("Failed to list orders: "), "{error}");
}

// ═══════════════════════════════════════════════════════════════════════
//  Fulfillment
// ═══════════════════════════════════════════════════════════════════════

async fn mount_fulfillment_flow(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path(format!("{API}/orders/450789469/fulfillment_orders.json")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "fulfillment_orders": [
                { "id": 1046000778, "status": "open" },
                { "id": 1046000779, "status": "closed" }
            ]
        })))
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path(format!("{API}/fulfillments.json")))
        .and(body_partial_json(json!({
            "fulfillment": {
                "line_items_by_fulfillment_order": [{ "fulfillment_order_id": 1046000778 }]
            }
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "fulfillment": { "id": 255858046, "order_id": 450789469, "status": "success" }
        })))
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn fulfillment_kept_when_tracking_update_fails() {
    let server = MockServer::start().await;
    mount_fulfillment_flow(&server).await;
    Mock::given(method("POST"))
        .and(path(format!("{API}/fulfillments/255858046/update_tracking.json")))
        .respond_with(ResponseTemplate::new(422).set_body_json(json!({
            "errors": { "tracking_number": ["is invalid"] }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let adapter = adapter(&server).await;
    let reply = call(
        &adapter,
        "shopify_create_fulfillment",
        json!({"order_id": 450789469, "tracking_number": "???", "tracking_company": "UPS"}),
    )
    .await;

    assert_eq!(reply["success"], true);
    assert_eq!(reply["data"]["fulfillment_id"], 255858046);
    assert_eq!(reply["data"]["tracking_updated"], false);
    assert_eq!(
        reply["data"]["tracking_error"],
        "Failed to update tracking: Unprocessable Entity"
    );
}

#[tokio::test]
async fn fulfillment_with_tracking() {
    let server = MockServer::start().await;
    mount_fulfillment_flow(&server).await;
    Mock::given(method("POST"))
        .and(path(format!("{API}/fulfillments/255858046/update_tracking.json")))
        .and(body_partial_json(json!({
            "fulfillment": { "tracking_info": { "number": "1Z999", "company": "UPS" } }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "fulfillment": {
                "id": 255858046,
                "order_id": 450789469,
                "status": "success",
                "tracking_company": "UPS",
                "tracking_number": "1Z999"
            }
        })))
        .mount(&server)
        .await;

    let adapter = adapter(&server).await;
    let reply = call(
        &adapter,
        "shopify_create_fulfillment",
        json!({"order_id": "450789469", "tracking_number": "1Z999", "tracking_company": "UPS"}),
    )
    .await;

    assert_eq!(reply["success"], true);
    assert_eq!(reply["data"]["tracking_updated"], true);
    assert_eq!(reply["data"]["tracking_number"], "1Z999");
    assert!(reply["data"].get("tracking_error").is_none());
}

// ═══════════════════════════════════════════════════════════════════════
//  Credentials
// ═══════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn invalid_context_never_reaches_provider() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let adapter = adapter(&server).await;
    let ctx = CredentialContext::invalid(
        "Shopify connection expired",
        Some("https://auth.example.com/connect/shopify".into()),
    );
    let result = adapter
        .execute_tool("shopify_list_orders", json!({}), &ctx)
        .await;
    let reply: Value = Envelope::from_result(result).into();

    assert_eq!(reply["success"], false);
    let error = reply["error"].as_str().unwrap();
    assert!(error.contains("Shopify connection expired"), "{error}");
    assert!(error.contains("https://auth.example.com/connect/shopify"), "{error}");
}
