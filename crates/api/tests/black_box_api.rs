use reqwest::StatusCode;
use serde_json::{json, Value};

use stockflow_core::UserId;
use stockflow_infra::config::ConcurrencyConfig;

struct TestServer {
    base_url: String,
    client: reqwest::Client,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        // Same router as prod, bound to an ephemeral port.
        let app = stockflow_api::app::build_app(&ConcurrencyConfig {
            lock_timeout_ms: 2_000,
            max_attempts: 3,
        })
        .expect("failed to build app");
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url,
            client: reqwest::Client::new(),
            handle,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn post(&self, path: &str, user: Option<UserId>, body: Value) -> (StatusCode, Value) {
        let mut req = self.client.post(self.url(path)).json(&body);
        if let Some(user) = user {
            req = req.header("x-user-id", user.to_string());
        }
        let res = req.send().await.unwrap();
        (res.status(), res.json().await.unwrap_or(Value::Null))
    }

    async fn patch(&self, path: &str, user: UserId, body: Value) -> (StatusCode, Value) {
        let res = self
            .client
            .patch(self.url(path))
            .header("x-user-id", user.to_string())
            .json(&body)
            .send()
            .await
            .unwrap();
        (res.status(), res.json().await.unwrap_or(Value::Null))
    }

    async fn get(&self, path: &str, user: Option<UserId>) -> (StatusCode, Value) {
        let mut req = self.client.get(self.url(path));
        if let Some(user) = user {
            req = req.header("x-user-id", user.to_string());
        }
        let res = req.send().await.unwrap();
        (res.status(), res.json().await.unwrap_or(Value::Null))
    }

    async fn product(&self, name: &str, price: u64, on_hand: i64) -> String {
        let (status, body) = self
            .post(
                "/catalog/products",
                None,
                json!({ "name": name, "price": price, "on_hand": on_hand }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "body={body}");
        body["id"].as_str().unwrap().to_string()
    }

    async fn on_hand(&self, product_id: &str) -> i64 {
        let (status, body) = self.get(&format!("/catalog/products/{product_id}"), None).await;
        assert_eq!(status, StatusCode::OK);
        body["on_hand"].as_i64().unwrap()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn shipping() -> Value {
    json!({ "address": "12 Dock Road, Rotterdam", "method": "freight" })
}

#[tokio::test]
async fn health_is_public() {
    let srv = TestServer::spawn().await;
    let res = srv.client.get(srv.url("/health")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn bulk_order_routes_require_user_header() {
    let srv = TestServer::spawn().await;

    let (status, body) = srv.get("/bulk-orders", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "missing_user");

    let res = srv
        .client
        .get(srv.url("/bulk-orders"))
        .header("x-user-id", "not-a-uuid")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn stock_record_lifecycle_create_update_query() {
    let srv = TestServer::spawn().await;
    let product_id = srv.product("Crate", 1_000, 0).await;

    let (status, record) = srv
        .post(
            "/inventory",
            None,
            json!({
                "product_id": product_id,
                "quantity": 10,
                "min_level": 2,
                "max_level": 100,
                "cost_per_unit": 300,
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "body={record}");
    assert_eq!(record["status"], "in_stock");
    let id = record["id"].as_str().unwrap().to_string();

    let (status, _) = srv
        .post(
            "/inventory",
            None,
            json!({ "product_id": product_id, "quantity": 1, "min_level": 0, "max_level": 5 }),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, record) = srv
        .post(&format!("/inventory/{id}/stock"), None, json!({ "type": "reserve", "quantity": 9 }))
        .await;
    assert_eq!(status, StatusCode::OK, "body={record}");
    assert_eq!(record["quantity"], 1);
    assert_eq!(record["reserved"], 9);
    assert_eq!(record["status"], "low_stock");

    let (status, body) = srv
        .post(&format!("/inventory/{id}/stock"), None, json!({ "type": "release", "quantity": 10 }))
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "invalid_release");

    let (status, body) = srv
        .post(&format!("/inventory/{id}/stock"), None, json!({ "type": "remove", "quantity": 2 }))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "insufficient_stock");

    let (status, body) = srv.get(&format!("/inventory/{id}/movements"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 2);
    assert_eq!(body["movements"][0]["reason"], "Initial stock");
    assert_eq!(body["movements"][1]["direction"], "out");

    let (status, _) = srv
        .get(&format!("/inventory/{id}/movements?from=last-week"), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, by_product) = srv.get(&format!("/inventory/product/{product_id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(by_product["id"], id.as_str());

    let (_, low) = srv.get("/inventory/low-stock", None).await;
    assert_eq!(low["items"].as_array().unwrap().len(), 1);

    let (_, stats) = srv.get("/inventory/stats", None).await;
    assert_eq!(stats["total_records"], 1);
    assert_eq!(stats["low_stock"], 1);
    assert_eq!(stats["total_value"], 300);
    assert_eq!(stats["total_reserved"], 9);
}

#[tokio::test]
async fn unknown_ids_are_not_found() {
    let srv = TestServer::spawn().await;
    let missing = UserId::new().to_string();

    let (status, _) = srv.get(&format!("/inventory/{missing}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = srv.get(&format!("/catalog/products/{missing}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = srv.get("/inventory/not-an-id", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_id");
}

#[tokio::test]
async fn bulk_order_lifecycle_commits_and_restocks_catalog() {
    let srv = TestServer::spawn().await;
    let user = UserId::new();
    let product_id = srv.product("Crate", 24_000, 20).await;

    let (status, order) = srv
        .post(
            "/bulk-orders",
            Some(user),
            json!({
                "items": [{ "product_id": product_id, "quantity": 5 }],
                "shipping_details": shipping(),
                "priority": "high",
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "body={order}");
    assert_eq!(order["status"], "draft");
    assert_eq!(order["priority"], "high");
    assert_eq!(order["total_amount"], 120_000);
    assert_eq!(order["discount_percentage"], 5);
    assert_eq!(order["final_amount"], 114_000);
    assert!(order["order_number"].as_str().unwrap().starts_with("BLK"));
    let id = order["id"].as_str().unwrap().to_string();

    let (status, body) = srv
        .patch(&format!("/bulk-orders/{id}/status"), user, json!({ "status": "shipped" }))
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "invalid_transition");

    for next in ["pending", "approved", "processing"] {
        let (status, body) = srv
            .patch(&format!("/bulk-orders/{id}/status"), user, json!({ "status": next }))
            .await;
        assert_eq!(status, StatusCode::OK, "transition to {next}: body={body}");
        assert_eq!(body["status"], next);
    }
    assert_eq!(srv.on_hand(&product_id).await, 15);

    let (status, cancelled) = srv
        .patch(
            &format!("/bulk-orders/{id}/status"),
            user,
            json!({ "status": "cancelled", "note": "customer withdrew" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cancelled["status_history"].as_array().unwrap().len(), 5);
    assert_eq!(srv.on_hand(&product_id).await, 20);

    let (status, _) = srv
        .patch(&format!("/bulk-orders/{id}/shipping"), user, json!({ "tracking_number": "TRK-1" }))
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn bulk_order_creation_checks_catalog() {
    let srv = TestServer::spawn().await;
    let user = UserId::new();
    let product_id = srv.product("Pallet", 500, 2).await;

    let (status, body) = srv
        .post(
            "/bulk-orders",
            Some(user),
            json!({
                "items": [{ "product_id": product_id, "quantity": 3 }],
                "shipping_details": shipping(),
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "insufficient_stock");

    let (status, _) = srv
        .post(
            "/bulk-orders",
            Some(user),
            json!({
                "items": [{ "product_id": UserId::new().to_string(), "quantity": 1 }],
                "shipping_details": shipping(),
            }),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = srv
        .post(
            "/bulk-orders",
            Some(user),
            json!({ "items": [], "shipping_details": shipping() }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn list_and_summary_are_scoped_to_the_caller() {
    let srv = TestServer::spawn().await;
    let alice = UserId::new();
    let bob = UserId::new();
    let product_id = srv.product("Crate", 1_000, 100).await;

    for (user, quantity) in [(alice, 1), (alice, 2), (bob, 3)] {
        let (status, _) = srv
            .post(
                "/bulk-orders",
                Some(user),
                json!({
                    "items": [{ "product_id": product_id, "quantity": quantity }],
                    "shipping_details": shipping(),
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, list) = srv.get("/bulk-orders?status=draft", Some(alice)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list["items"].as_array().unwrap().len(), 2);

    let (status, _) = srv.get("/bulk-orders?priority=whenever", Some(alice)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, summary) = srv.get("/bulk-orders/summary", Some(alice)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(summary["total_orders"], 2);
    assert_eq!(summary["total_amount"], 3_000);
    assert_eq!(summary["status_counts"]["draft"], 2);
    assert_eq!(summary["orders"].as_array().unwrap().len(), 2);

    let (status, summary) = srv
        .get("/bulk-orders/summary?from=2000-01-01T00:00:00Z&to=2000-12-31T00:00:00Z", Some(bob))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(summary["total_orders"], 0);
}
