//! End-to-end tests: real router on an ephemeral port, Shopify stubbed.

use std::net::SocketAddr;
use std::sync::Arc;

use agentbridge_adapters::{Adapter, ShopifyAdapter};
use agentbridge_web::{AppState, WebConfig, server};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Bind 127.0.0.1:0 and serve the router; returns the `/mcp` URL.
async fn start(shopify_origin: &str) -> String {
    let mut shopify = ShopifyAdapter::new("shopify").with_origin(shopify_origin);
    shopify.connect().await.unwrap();
    let adapters: Vec<Arc<dyn Adapter>> = vec![Arc::new(shopify)];
    let state = Arc::new(AppState::new(WebConfig::default(), adapters));

    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind to port 0");
    let addr: SocketAddr = listener.local_addr().expect("local addr");
    let app = server::router(state);
    tokio::spawn(async move {
        axum::serve(listener, app).await.ok();
    });
    format!("http://{addr}")
}

async fn rpc(base: &str, body: Value, headers: &[(&str, &str)]) -> reqwest::Response {
    let mut req = reqwest::Client::new().post(format!("{base}/mcp")).json(&body);
    for (name, value) in headers {
        req = req.header(*name, *value);
    }
    req.send().await.expect("request sent")
}

fn envelope(reply: &Value) -> Value {
    serde_json::from_str(reply["result"]["content"][0]["text"].as_str().unwrap()).unwrap()
}

#[tokio::test]
async fn health_reports_ok() {
    let stub = MockServer::start().await;
    let base = start(&stub.uri()).await;
    let body: Value = reqwest::get(format!("{base}/health"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body, json!({ "status": "ok" }));
}

#[tokio::test]
async fn tools_list_exposes_every_shopify_tool() {
    let stub = MockServer::start().await;
    let base = start(&stub.uri()).await;
    let reply: Value = rpc(&base, json!({"jsonrpc": "2.0", "id": 1, "method": "tools/list"}), &[])
        .await
        .json()
        .await
        .unwrap();
    let tools = reply["result"]["tools"].as_array().unwrap();
    assert_eq!(tools.len(), 12);
    assert!(tools.iter().any(|t| t["name"] == "shopify_create_fulfillment"));
}

#[tokio::test]
async fn headers_reach_the_provider() {
    let stub = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/admin/api/2024-01/customers/search.json"))
        .and(header("X-Shopify-Access-Token", "shpat_live"))
        .and(query_param("query", "email:bob@example.com"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "customers": [{ "id": 42, "email": "bob@example.com" }]
        })))
        .expect(1)
        .mount(&stub)
        .await;
    let base = start(&stub.uri()).await;

    let reply: Value = rpc(
        &base,
        json!({
            "jsonrpc": "2.0",
            "id": 7,
            "method": "tools/call",
            "params": {
                "name": "shopify_search_customers",
                "arguments": { "query": "email:bob@example.com" }
            }
        }),
        &[
            ("Authorization", "Bearer shpat_live"),
            ("X-Shop-Domain", "acme"),
        ],
    )
    .await
    .json()
    .await
    .unwrap();

    assert_eq!(reply["id"], 7);
    assert!(reply["result"].get("isError").is_none(), "{reply}");
    let env = envelope(&reply);
    assert_eq!(env["success"], true);
    assert_eq!(env["data"]["count"], 1);
    assert_eq!(env["data"]["customers"][0]["customer_id"], 42);
}

#[tokio::test]
async fn invalid_auth_header_short_circuits() {
    let stub = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&stub)
        .await;
    let base = start(&stub.uri()).await;

    let reply: Value = rpc(
        &base,
        json!({
            "jsonrpc": "2.0",
            "id": 2,
            "method": "tools/call",
            "params": { "name": "shopify_list_products", "arguments": {} }
        }),
        &[
            ("X-Auth-Valid", "false"),
            ("X-Auth-Error", "store not connected"),
            ("X-Auth-Url", "https://auth.example.com/shopify"),
        ],
    )
    .await
    .json()
    .await
    .unwrap();

    assert_eq!(reply["result"]["isError"], true);
    let error = envelope(&reply)["error"].as_str().unwrap().to_string();
    assert!(error.contains("store not connected"), "{error}");
    assert!(error.contains("https://auth.example.com/shopify"), "{error}");
}

#[tokio::test]
async fn batch_mixes_replies_and_notifications() {
    let stub = MockServer::start().await;
    let base = start(&stub.uri()).await;
    let reply: Value = rpc(
        &base,
        json!([
            { "jsonrpc": "2.0", "id": 1, "method": "initialize", "params": {} },
            { "jsonrpc": "2.0", "method": "notifications/initialized" },
            { "jsonrpc": "2.0", "id": 2, "method": "ping" }
        ]),
        &[],
    )
    .await
    .json()
    .await
    .unwrap();

    let replies = reply.as_array().unwrap();
    assert_eq!(replies.len(), 2);
    assert_eq!(replies[0]["result"]["protocolVersion"], "2024-11-05");
    assert_eq!(replies[1]["id"], 2);
}

#[tokio::test]
async fn lone_notification_is_accepted() {
    let stub = MockServer::start().await;
    let base = start(&stub.uri()).await;
    let resp = rpc(
        &base,
        json!({ "jsonrpc": "2.0", "method": "notifications/initialized" }),
        &[],
    )
    .await;
    assert_eq!(resp.status(), reqwest::StatusCode::ACCEPTED);
}

#[tokio::test]
async fn malformed_body_is_a_parse_error() {
    let stub = MockServer::start().await;
    let base = start(&stub.uri()).await;
    let reply: Value = reqwest::Client::new()
        .post(format!("{base}/mcp"))
        .body("not json")
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(reply["error"]["code"], -32700);
}
