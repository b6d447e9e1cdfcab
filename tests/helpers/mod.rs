//! Shared test helpers for integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use cloudbox_api::{build_app, build_state};
use cloudbox_core::config::AppConfig;
use cloudbox_core::types::ManualClock;
use cloudbox_database::store::Stores;
use cloudbox_storage::{LocalObjectStorage, StorageHandles};

/// Strong enough for the password policy.
pub const PASSWORD: &str = "Str0ng!Pass";

/// Public base URL the local provider signs blob URLs under.
pub const BASE_URL: &str = "http://cloudbox.test";

/// Test application context
pub struct TestApp {
    /// The Axum router for making test requests
    pub router: Router,
    /// Clock shared by every component
    pub clock: Arc<ManualClock>,
    /// Stores behind the router, for direct inspection
    pub stores: Stores,
    /// Object storage root; removed on drop
    _storage_dir: TempDir,
}

impl TestApp {
    /// Create a new test application backed by memory stores and a
    /// temp-dir local object store.
    pub async fn new() -> Self {
        let storage_dir = tempfile::tempdir().expect("Failed to create storage dir");
        let clock = Arc::new(ManualClock::default());

        let mut config = AppConfig::default();
        config.auth.jwt_secret = "integration-test-secret".to_string();
        config.share.base_url = BASE_URL.to_string();
        config.storage.local.public_base_url = BASE_URL.to_string();

        let storage = LocalObjectStorage::new(
            storage_dir.path().to_str().expect("Non-UTF-8 temp path"),
            BASE_URL,
            "blob-signing-secret",
            clock.clone(),
        )
        .await
        .expect("Failed to init storage");

        let stores = Stores::in_memory();
        let state = build_state(
            config,
            &stores,
            StorageHandles::local(storage),
            clock.clone(),
        );

        Self {
            router: build_app(state),
            clock,
            stores,
            _storage_dir: storage_dir,
        }
    }

    /// Send a JSON request
    pub async fn request(
        &self,
        method: &str,
        path: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> TestResponse {
        let mut req = Request::builder().method(method).uri(path);

        if let Some(token) = token {
            req = req.header("Authorization", format!("Bearer {token}"));
        }

        let body = match body {
            Some(b) => {
                req = req.header("Content-Type", "application/json");
                Body::from(serde_json::to_string(&b).expect("Failed to serialize body"))
            }
            None => Body::empty(),
        };

        self.send(req.body(body).expect("Failed to build request"))
            .await
    }

    /// Send an arbitrary request
    pub async fn send(&self, req: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(req)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let content_type = response
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        let bytes = axum::body::to_bytes(response.into_body(), 16 * 1024 * 1024)
            .await
            .expect("Failed to read body");

        let body: Value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);

        TestResponse {
            status,
            body,
            content_type,
            bytes: bytes.to_vec(),
        }
    }

    /// Register an account and assert success
    pub async fn register(&self, username: &str, password: &str) -> TestResponse {
        let response = self
            .request(
                "POST",
                "/auth/register",
                Some(serde_json::json!({
                    "username": username,
                    "password": password,
                    "email": format!("{username}@example.com"),
                })),
                None,
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "{:?}", response.body);
        response
    }

    /// Attempt a login
    pub async fn login(&self, username: &str, password: &str) -> TestResponse {
        self.request(
            "POST",
            "/auth/login",
            Some(serde_json::json!({
                "username": username,
                "password": password,
            })),
            None,
        )
        .await
    }

    /// Register and log in, returning the access token
    pub async fn signed_in(&self, username: &str) -> String {
        self.register(username, PASSWORD).await;
        let response = self.login(username, PASSWORD).await;
        assert_eq!(response.status, StatusCode::OK, "{:?}", response.body);
        response.body["data"]["tokens"]["access_token"]
            .as_str()
            .expect("access token")
            .to_string()
    }

    /// Upload `content` as `file_name` and return the file id
    pub async fn upload(&self, token: &str, file_name: &str, content: &[u8]) -> TestResponse {
        let boundary = "cloudbox-test-boundary";
        let mut body = Vec::new();
        body.extend_from_slice(
            format!(
                "--{boundary}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(content);
        body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());

        let req = Request::builder()
            .method("POST")
            .uri("/api/files/upload")
            .header("Authorization", format!("Bearer {token}"))
            .header(
                "Content-Type",
                format!("multipart/form-data; boundary={boundary}"),
            )
            .body(Body::from(body))
            .expect("Failed to build request");

        self.send(req).await
    }
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    /// HTTP status code
    pub status: StatusCode,
    /// Parsed JSON body, `Null` for non-JSON responses
    pub body: Value,
    /// Content-Type header
    pub content_type: String,
    /// Raw body
    pub bytes: Vec<u8>,
}

/// Strip the public base URL from a presigned URL, leaving path and query.
pub fn local_path(url: &str) -> &str {
    url.strip_prefix(BASE_URL).expect("URL outside the test base")
}
