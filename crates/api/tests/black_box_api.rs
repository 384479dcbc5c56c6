use std::sync::Arc;

use reqwest::StatusCode;
use serde_json::{Value, json};
use stockroom_api::app::{build_router, services::AppServices};
use stockroom_auth::{Otp, OtpPurpose, User};
use stockroom_core::Entity;
use stockroom_infra::AppConfig;
use stockroom_infra::store::InMemoryDocumentStore;

struct TestServer {
    base_url: String,
    client: reqwest::Client,
    /// Handle on the same store the server writes to.
    services: AppServices,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        Self::spawn_with(AppConfig::default()).await
    }

    async fn spawn_with(config: AppConfig) -> Self {
        // Same router as prod, over a fresh in-memory store, on an ephemeral port.
        let services = AppServices::over(Arc::new(InMemoryDocumentStore::new()), &config)
            .expect("failed to wire services");
        let app = build_router(services.clone(), &config);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let client = reqwest::Client::builder()
            .cookie_store(true)
            .build()
            .unwrap();

        Self {
            base_url: format!("http://{addr}/api"),
            client,
            services,
            handle,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get(&self, path: &str) -> (StatusCode, Value) {
        let res = self.client.get(self.url(path)).send().await.unwrap();
        let status = res.status();
        (status, res.json().await.unwrap_or(Value::Null))
    }

    async fn send(&self, method: reqwest::Method, path: &str, body: Value) -> (StatusCode, Value) {
        let res = self
            .client
            .request(method, self.url(path))
            .json(&body)
            .send()
            .await
            .unwrap();
        let status = res.status();
        (status, res.json().await.unwrap_or(Value::Null))
    }

    async fn post(&self, path: &str, body: Value) -> (StatusCode, Value) {
        self.send(reqwest::Method::POST, path, body).await
    }

    async fn put(&self, path: &str, body: Value) -> (StatusCode, Value) {
        self.send(reqwest::Method::PUT, path, body).await
    }

    /// Register a manager; the cookie store keeps the session.
    async fn sign_in(&self) {
        let (status, body) = self
            .post(
                "/register",
                json!({
                    "email": "manager@example.com",
                    "password": "Passw0rd!",
                    "role": "Inventory Managers",
                    "name": "Manager"
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
    }

    async fn create(&self, path: &str, body: Value) -> String {
        let (status, body) = self.post(path, body).await;
        assert_eq!(status, StatusCode::CREATED, "POST {path}: {body}");
        body["id"].as_str().unwrap().to_string()
    }

    /// The pending one-time code for `email`; codes are only logged, so
    /// read it from the store.
    async fn pending_code(&self, email: &str, purpose: OtpPurpose) -> Option<Otp> {
        self.services
            .docs()
            .list::<Otp>()
            .await
            .unwrap()
            .into_iter()
            .map(|v| v.into_inner())
            .find(|otp| otp.email() == email && otp.purpose() == purpose)
    }

    async fn user(&self, email: &str) -> User {
        self.services
            .docs()
            .find_unique::<User>(email)
            .await
            .unwrap()
            .expect("user exists")
            .into_inner()
    }

    async fn quantity(&self, product_id: &str) -> i64 {
        let (status, body) = self.get(&format!("/stock?product_id={product_id}")).await;
        assert_eq!(status, StatusCode::OK, "{body}");
        body["quantity"].as_i64().unwrap()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[tokio::test]
async fn health_is_public_and_protected_routes_need_a_session() {
    let server = TestServer::spawn().await;

    let (status, body) = server.get("/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "OK");

    let (status, _) = server.get("/products").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let res = server
        .client
        .get(server.url("/me"))
        .header("cookie", "user=forged.value")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn register_then_me_then_logout() {
    let server = TestServer::spawn().await;
    server.sign_in().await;

    let (status, me) = server.get("/me").await;
    assert_eq!(status, StatusCode::OK, "{me}");
    assert_eq!(me["user"]["email"], "manager@example.com");
    assert!(me["user"].get("password_hash").is_none());

    let (status, _) = server
        .post(
            "/register",
            json!({ "email": "MANAGER@example.com", "password": "Passw0rd!", "role": "Warehouse Staff" }),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = server.post("/logout", json!({})).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = server.get("/me").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = server
        .post("/login", json!({ "email": "manager@example.com", "password": "wrong!Pass" }))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = server
        .post("/login", json!({ "email": "manager@example.com", "password": "Passw0rd!" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = server.get("/me").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn unknown_routes_get_a_json_404() {
    let server = TestServer::spawn().await;
    let res = server
        .client
        .get(format!("{}/nowhere", server.base_url.trim_end_matches("/api")))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["message"], "route not found");
}

#[tokio::test]
async fn receipts_and_deliveries_move_stock_atomically() {
    let server = TestServer::spawn().await;
    server.sign_in().await;

    let supplier = server.create("/suppliers", json!({ "name": "Acme Supply" })).await;
    let customer = server.create("/customers", json!({ "name": "Globex" })).await;
    let product = server
        .create("/products", json!({ "name": "Steel bolt", "sku": "BOLT-1", "uom": "pcs" }))
        .await;

    let (status, _) = server
        .post("/products", json!({ "name": "Other bolt", "sku": "bolt-1", "uom": "pcs" }))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    // Receive 10.
    let receipt = server.create("/receipts", json!({ "supplier_id": supplier })).await;
    let (status, body) = server
        .post(
            &format!("/receipts/{receipt}/items"),
            json!({ "product_id": product, "quantity": 10 }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let (status, body) = server.put(&format!("/receipts/{receipt}/validate"), json!({})).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["status"], "Done");
    assert_eq!(server.quantity(&product).await, 10);

    // Validating twice is rejected and changes nothing.
    let (status, _) = server.put(&format!("/receipts/{receipt}/validate"), json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(server.quantity(&product).await, 10);

    // A delivery for more than is on hand fails without touching stock.
    let delivery = server.create("/deliveries", json!({ "customer_id": customer })).await;
    server
        .post(
            &format!("/deliveries/{delivery}/items"),
            json!({ "product_id": product, "quantity": 25 }),
        )
        .await;
    let (status, body) = server.put(&format!("/deliveries/{delivery}/validate"), json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "insufficient_stock");
    assert_eq!(server.quantity(&product).await, 10);

    let (_, moves) = server.get(&format!("/stock/moves?product_id={product}")).await;
    assert_eq!(moves.as_array().unwrap().len(), 1);

    // Done documents cannot be deleted.
    let res = server
        .client
        .delete(server.url(&format!("/receipts/{receipt}")))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn adjustments_and_manual_levels() {
    let server = TestServer::spawn().await;
    server.sign_in().await;

    let product = server
        .create(
            "/products",
            json!({ "name": "Copper wire", "sku": "WIRE-2", "uom": "m", "initial_stock": 40 }),
        )
        .await;
    assert_eq!(server.quantity(&product).await, 40);

    let (status, body) = server
        .post(
            "/adjustments",
            json!({ "product_id": product, "counted_quantity": 35, "reason": "Damage" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["system_quantity"], 40);
    let adjustment = body["id"].as_str().unwrap().to_string();

    let (status, _) = server.put(&format!("/adjustments/{adjustment}/validate"), json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(server.quantity(&product).await, 35);

    let (status, body) = server
        .put("/stock", json!({ "product_id": product, "quantity": 50, "free_to_use": 45 }))
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["free_to_use"], 45);

    let (status, _) = server
        .put("/stock", json!({ "product_id": product, "quantity": 5, "free_to_use": 9 }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, moves) = server.get(&format!("/stock/moves?product_id={product}")).await;
    assert_eq!(moves.as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn never_stocked_products_read_as_zero() {
    let server = TestServer::spawn().await;
    server.sign_in().await;

    let product = server
        .create("/products", json!({ "name": "Hex nut", "sku": "NUT-7", "uom": "pcs" }))
        .await;
    let (status, body) = server.get(&format!("/stock?product_id={product}")).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["quantity"], 0);
    assert_eq!(body["free_to_use"], 0);

    let unknown = stockroom_core::ProductId::new();
    let (status, _) = server.get(&format!("/stock?product_id={unknown}")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = server.get("/stock").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn verify_code_marks_the_email_verified_once() {
    let server = TestServer::spawn().await;
    server.sign_in().await;
    let email = "manager@example.com";

    let (status, _) = server.post("/otp/send", json!({ "email": email, "type": "verify" })).await;
    assert_eq!(status, StatusCode::OK);
    let first = server.pending_code(email, OtpPurpose::Verify).await.unwrap();

    // A new send replaces the earlier code.
    server.post("/otp/send", json!({ "email": email, "type": "verify" })).await;
    let pending = server.pending_code(email, OtpPurpose::Verify).await.unwrap();
    assert_ne!(pending.id(), first.id());
    let count = server.services.docs().list::<Otp>().await.unwrap().len();
    assert_eq!(count, 1);

    let wrong = if pending.code() == "000000" { "111111" } else { "000000" };
    let (status, _) = server
        .post("/otp/verify", json!({ "email": email, "code": wrong, "type": "verify" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let after_miss = server.pending_code(email, OtpPurpose::Verify).await.unwrap();
    assert_eq!(after_miss.attempts(), 1);
    assert!(!server.user(email).await.email_verified());

    let (status, body) = server
        .post(
            "/otp/verify",
            json!({ "email": email, "code": pending.code(), "type": "verify" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert!(server.user(email).await.email_verified());
    assert!(server.pending_code(email, OtpPurpose::Verify).await.is_none());

    // The code was consumed.
    let (status, _) = server
        .post(
            "/otp/verify",
            json!({ "email": email, "code": pending.code(), "type": "verify" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = server
        .post("/otp/send", json!({ "email": "nobody@example.com", "type": "verify" }))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = server.post("/otp/send", json!({ "email": email, "type": "sms" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn forgot_code_resets_the_password() {
    let server = TestServer::spawn().await;
    server.sign_in().await;
    let email = "manager@example.com";

    server.post("/otp/send", json!({ "email": email, "type": "forgot" })).await;
    let pending = server.pending_code(email, OtpPurpose::Forgot).await.unwrap();

    // The policy still applies; the code survives a rejected password.
    let (status, _) = server
        .post(
            "/otp/reset",
            json!({ "email": email, "code": pending.code(), "newPassword": "weak" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(server.pending_code(email, OtpPurpose::Forgot).await.is_some());

    let (status, body) = server
        .post(
            "/otp/reset",
            json!({ "email": email, "code": pending.code(), "newPassword": "N3w!Pass" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert!(server.pending_code(email, OtpPurpose::Forgot).await.is_none());

    let (status, _) = server
        .post("/login", json!({ "email": email, "password": "Passw0rd!" }))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = server
        .post("/login", json!({ "email": email, "password": "N3w!Pass" }))
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn trusted_sessions_answer_me_from_the_claims() {
    let config = AppConfig {
        trust_cookie: true,
        ..AppConfig::default()
    };
    let server = TestServer::spawn_with(config).await;
    server.sign_in().await;

    let user = server.user("manager@example.com").await;
    server
        .services
        .dispatcher
        .delete::<User, _>(user.id(), |_| Ok(()))
        .await
        .unwrap();

    let (status, me) = server.get("/me").await;
    assert_eq!(status, StatusCode::OK, "{me}");
    assert_eq!(me["user"]["email"], "manager@example.com");
}
