//! Common test utilities for E2E tests

#![allow(dead_code)]

pub mod schema_validator;

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    Json, Router,
    body::Bytes,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
};
use blogfed::{AppState, config};
use rsa::pkcs1::EncodeRsaPrivateKey;
use rsa::pkcs8::LineEnding;
use serde_json::{Value, json};
use tempfile::TempDir;
use tokio::net::TcpListener;

pub const DOMAIN: &str = "test.example.com";
pub const BLOG_IRI: &str = "https://test.example.com/";

/// Test server instance
pub struct TestServer {
    pub addr: String,
    pub state: AppState,
    pub _temp_dir: TempDir,
    pub client: reqwest::Client,
}

impl TestServer {
    /// Create a new test server with federation enabled
    pub async fn new() -> Self {
        Self::with_federation(true).await
    }

    pub async fn with_federation(enabled: bool) -> Self {
        // Create temporary directory for test database and key
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test.db");
        let key_path = temp_dir.path().join("key.pem");

        let mut rng = rand::thread_rng();
        let key = rsa::RsaPrivateKey::new(&mut rng, 1024).unwrap();
        std::fs::write(&key_path, key.to_pkcs1_pem(LineEnding::LF).unwrap().as_bytes()).unwrap();

        let mut blogs = HashMap::new();
        blogs.insert(
            "main".to_string(),
            config::BlogConfig {
                path: "/".to_string(),
                sections: vec!["posts".to_string()],
            },
        );
        blogs.insert(
            "en".to_string(),
            config::BlogConfig {
                path: "/en".to_string(),
                sections: Vec::new(),
            },
        );

        // Create test configuration
        let config = config::AppConfig {
            server: config::ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 0, // Let OS assign port
                domain: DOMAIN.to_string(),
                protocol: "https".to_string(),
            },
            database: config::DatabaseConfig { path: db_path },
            activitypub: config::ActivityPubConfig {
                enabled,
                key_path: Some(key_path),
            },
            blogs,
            logging: config::LoggingConfig {
                level: "info".to_string(),
                format: "pretty".to_string(),
            },
        };

        // Initialize app state
        let state = AppState::new(config).await.unwrap();

        // Create HTTP client
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap();

        // Bind to random port
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let addr_str = format!("http://{}", addr);

        let app = blogfed::build_router(state.clone());

        // Spawn server in background
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            addr: addr_str,
            state,
            _temp_dir: temp_dir,
            client,
        }
    }

    /// Get base URL for API requests
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.addr, path)
    }

    /// POST a raw body to a blog inbox
    pub async fn post_inbox(&self, blog: &str, body: impl Into<reqwest::Body>) -> reqwest::Response {
        self.client
            .post(self.url(&format!("/activitypub/inbox/{blog}")))
            .header("content-type", "application/activity+json")
            .body(body)
            .send()
            .await
            .unwrap()
    }

    /// POST a JSON activity to a blog inbox
    pub async fn post_activity(&self, blog: &str, activity: &Value) -> reqwest::Response {
        self.post_inbox(blog, serde_json::to_vec(activity).unwrap())
            .await
    }

    pub async fn followers(&self, blog: &str) -> HashMap<String, String> {
        self.state.db.get_followers(blog).await.unwrap()
    }
}

/// A request captured by [`MockRemote`]
#[derive(Debug, Clone)]
pub struct ReceivedRequest {
    pub path: String,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl ReceivedRequest {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).unwrap()
    }
}

#[derive(Clone)]
struct RemoteState {
    base: String,
    received: Arc<Mutex<Vec<ReceivedRequest>>>,
}

/// Remote server hosting actors under `/users/:name`
///
/// Every actor document points at `/users/:name/inbox`. Inbox POSTs are
/// recorded; the actor named `broken` answers them with 500 and
/// `missing` has no actor document.
pub struct MockRemote {
    pub base: String,
    received: Arc<Mutex<Vec<ReceivedRequest>>>,
}

impl MockRemote {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let base = format!("http://{addr}");
        let received = Arc::new(Mutex::new(Vec::new()));

        let app = Router::new()
            .route("/users/:name", get(actor_document))
            .route("/users/:name/inbox", post(record_inbox))
            .with_state(RemoteState {
                base: base.clone(),
                received: received.clone(),
            });

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { base, received }
    }

    pub fn actor(&self, name: &str) -> String {
        format!("{}/users/{}", self.base, name)
    }

    pub fn inbox(&self, name: &str) -> String {
        format!("{}/users/{}/inbox", self.base, name)
    }

    pub fn received(&self) -> Vec<ReceivedRequest> {
        self.received.lock().unwrap().clone()
    }

    pub fn received_at(&self, name: &str) -> Vec<ReceivedRequest> {
        let path = format!("/users/{}/inbox", name);
        self.received()
            .into_iter()
            .filter(|request| request.path == path)
            .collect()
    }

    /// Poll until `count` inbox requests arrived (fan-out is detached)
    pub async fn wait_for(&self, count: usize) -> Vec<ReceivedRequest> {
        for _ in 0..100 {
            if self.received.lock().unwrap().len() >= count {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        self.received()
    }
}

async fn actor_document(
    State(state): State<RemoteState>,
    Path(name): Path<String>,
) -> Result<Json<Value>, StatusCode> {
    if name == "missing" {
        return Err(StatusCode::NOT_FOUND);
    }
    Ok(Json(json!({
        "@context": "https://www.w3.org/ns/activitystreams",
        "id": format!("{}/users/{}", state.base, name),
        "type": "Person",
        "preferredUsername": name,
        "inbox": format!("{}/users/{}/inbox", state.base, name),
    })))
}

async fn record_inbox(
    State(state): State<RemoteState>,
    Path(name): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> (StatusCode, &'static str) {
    state.received.lock().unwrap().push(ReceivedRequest {
        path: format!("/users/{}/inbox", name),
        headers,
        body,
    });

    if name == "broken" {
        (StatusCode::INTERNAL_SERVER_ERROR, "inbox exploded")
    } else {
        (StatusCode::ACCEPTED, "")
    }
}
