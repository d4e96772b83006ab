//! End-to-end HTTP tests for UB Carpool.
//!
//! Every [`TestContext`] boots the real router on an ephemeral port with a
//! fresh in-memory document store, so tests need no database and never see
//! each other's data.
//!
//! ```bash
//! cargo test -p carpool-integration-tests
//! ```

#![allow(clippy::missing_panics_doc)]

use std::sync::Arc;

use reqwest::{Client, Method, StatusCode};
use serde_json::{Value, json};
use tokio::task::JoinHandle;

use carpool_core::Decimal;
use carpool_server::config::ServerConfig;
use carpool_server::state::AppState;
use carpool_server::store::MemoryStore;

/// Password used for every account the helpers create.
pub const PASSWORD: &str = "hunter2-hunter2";

/// A running server plus an HTTP client pointed at it.
pub struct TestContext {
    pub client: Client,
    base_url: String,
    server: JoinHandle<()>,
}

/// Status and decoded JSON body of one response.
///
/// Non-JSON bodies (the liveness probe) decode to `Value::Null`.
#[derive(Debug)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub body: Value,
}

/// A registered, logged-in account.
#[derive(Debug, Clone)]
pub struct TestUser {
    pub id: String,
    pub email: String,
    pub token: String,
}

impl TestContext {
    /// Start a server with default configuration (500 MNT service fee).
    pub async fn new() -> Self {
        let state = AppState::new(ServerConfig::default(), Arc::new(MemoryStore::new()));
        let app = carpool_server::app(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind test listener");
        let addr = listener.local_addr().expect("listener address");
        let server = tokio::spawn(async move {
            axum::serve(listener, app).await.expect("test server failed");
        });

        Self {
            client: Client::new(),
            base_url: format!("http://{addr}"),
            server,
        }
    }

    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    pub async fn send(
        &self,
        method: Method,
        path: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> ApiResponse {
        let mut request = self.client.request(method, self.url(path));
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(&body);
        }

        let resp = request.send().await.expect("request failed");
        let status = resp.status();
        let bytes = resp.bytes().await.expect("read response body");
        ApiResponse {
            status,
            body: serde_json::from_slice(&bytes).unwrap_or(Value::Null),
        }
    }

    pub async fn get(&self, path: &str, token: Option<&str>) -> ApiResponse {
        self.send(Method::GET, path, token, None).await
    }

    pub async fn post(&self, path: &str, token: Option<&str>, body: Value) -> ApiResponse {
        self.send(Method::POST, path, token, Some(body)).await
    }

    pub async fn put(&self, path: &str, token: &str, body: Option<Value>) -> ApiResponse {
        self.send(Method::PUT, path, Some(token), body).await
    }

    /// Register an account. Drivers get vehicle details.
    pub async fn register(&self, role: &str, email: &str) -> ApiResponse {
        let mut body = json!({
            "name": format!("Test {role}"),
            "email": email,
            "phone": "99001122",
            "password": PASSWORD,
            "role": role,
        });
        if role == "driver" {
            body["vehicleModel"] = json!("Toyota Prius");
            body["vehiclePlate"] = json!("0001 УБА");
            body["licenseNumber"] = json!("DL-1");
        }
        self.post("/auth/register", None, body).await
    }

    /// Log in and return the bearer token.
    pub async fn login(&self, email: &str) -> String {
        let resp = self
            .post(
                "/auth/login",
                None,
                json!({ "email": email, "password": PASSWORD }),
            )
            .await;
        assert_eq!(resp.status, StatusCode::OK, "login failed: {}", resp.body);
        resp.body["token"]
            .as_str()
            .expect("token in login response")
            .to_owned()
    }

    /// Register and log in.
    pub async fn signup(&self, role: &str, email: &str) -> TestUser {
        let resp = self.register(role, email).await;
        assert_eq!(resp.status, StatusCode::CREATED, "register failed: {}", resp.body);
        TestUser {
            id: resp.body["user"]["id"]
                .as_str()
                .expect("user id in register response")
                .to_owned(),
            email: email.to_owned(),
            token: self.login(email).await,
        }
    }

    /// Publish a route departing at a fixed time and return it.
    pub async fn publish_route(
        &self,
        driver: &TestUser,
        origin: &str,
        destination: &str,
        seats: u32,
        price_per_seat: u32,
    ) -> Value {
        let resp = self
            .post(
                "/routes/create",
                Some(&driver.token),
                json!({
                    "startPoint": origin,
                    "endPoint": destination,
                    "midpoints": [],
                    "departureTime": "2026-03-02T08:00",
                    "seats": seats,
                    "pricePerSeat": price_per_seat,
                }),
            )
            .await;
        assert_eq!(resp.status, StatusCode::CREATED, "publish failed: {}", resp.body);
        resp.body["route"].clone()
    }

    /// Add money to the caller's wallet.
    pub async fn top_up(&self, user: &TestUser, amount: u32) -> ApiResponse {
        self.post("/wallet/add", Some(&user.token), json!({ "amount": amount }))
            .await
    }
}

impl Drop for TestContext {
    fn drop(&mut self) {
        self.server.abort();
    }
}

/// Decode a serialized `Money` value.
#[must_use]
pub fn money(value: &Value) -> Decimal {
    value
        .as_str()
        .and_then(|s| s.parse().ok())
        .unwrap_or_else(|| panic!("expected a decimal string, got {value}"))
}
