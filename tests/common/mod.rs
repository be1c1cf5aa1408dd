use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::http::HeaderValue;
use reqwest::{Client, Response, StatusCode};
use serde_json::{json, Value};

use surveyor::config::{Config, StoreKind};
use surveyor::store::MemoryStore;

pub const SECRET: &str = "test-admin-secret";
pub const ALLOWED_ORIGIN: &str = "http://localhost:5500";

/// A running test server backed by an in-memory store.
pub struct TestApp {
    pub addr: SocketAddr,
    pub store: Arc<MemoryStore>,
    pub client: Client,
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Submit a JSON survey, return (body, status).
    pub async fn submit_json(&self, data: &Value) -> (Value, StatusCode) {
        let resp = self
            .client
            .post(self.url("/api/submit-survey"))
            .json(data)
            .send()
            .await
            .expect("submit json failed");
        let status = resp.status();
        let body: Value = resp.json().await.unwrap_or(json!(null));
        (body, status)
    }

    /// Submit form-urlencoded survey data, return (body, status).
    pub async fn submit_form(&self, data: &[(&str, &str)]) -> (Value, StatusCode) {
        let resp = self
            .client
            .post(self.url("/api/submit-survey"))
            .form(data)
            .send()
            .await
            .expect("submit form failed");
        let status = resp.status();
        let body: Value = resp.json().await.unwrap_or(json!(null));
        (body, status)
    }

    /// Submit a minimal valid survey for `name`.
    pub async fn submit_named(&self, name: &str) -> Value {
        let (body, status) = self
            .submit_json(&json!({ "name": name, "role": "Engineer", "overall": "4" }))
            .await;
        assert_eq!(status, StatusCode::OK, "submit failed: {body}");
        body
    }

    /// Request the CSV export, optionally with a token.
    pub async fn download(&self, token: Option<&str>) -> Response {
        let path = match token {
            Some(token) => {
                let encoded: String = form_urlencoded::byte_serialize(token.as_bytes()).collect();
                format!("/api/download-survey?token={encoded}")
            }
            None => "/api/download-survey".to_string(),
        };
        self.client
            .get(self.url(&path))
            .send()
            .await
            .expect("download request failed")
    }
}

pub fn test_config() -> Config {
    Config {
        store: StoreKind::Memory,
        database_url: None,
        pg_ssl: false,
        db_max_connections: 1,
        secret_key: SECRET.to_string(),
        host: "127.0.0.1".parse().unwrap(),
        port: 0, // unused, we bind to random port
        allowed_origins: vec![HeaderValue::from_static(ALLOWED_ORIGIN)],
        required_ratings: vec![],
        rate_limit: 1_000,
        rate_limit_window_secs: 60,
        trusted_proxies: vec![],
        max_body_size: 65_536,
        static_dir: PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("static"),
        log_level: "warn".to_string(),
    }
}

pub async fn spawn_app() -> TestApp {
    spawn_app_with(test_config()).await
}

/// Spawn a test app with a custom configuration.
pub async fn spawn_app_with(config: Config) -> TestApp {
    let store = Arc::new(MemoryStore::new());
    let (app, _state) = surveyor::build_app(store.clone(), config);

    // Bind to random port
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind to random port");
    let addr = listener.local_addr().unwrap();

    // Spawn server in background
    tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .expect("Server failed");
    });

    let client = Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap();

    TestApp {
        addr,
        store,
        client,
    }
}
