//! Common test utilities for integration tests
//!
//! This module provides shared infrastructure for integration tests:
//! - An in-process app over volatile storage
//! - A scratch upload directory per context
//! - Account helpers (register, login, admin seeding)
//! - Request helpers returning status and parsed JSON
#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::Value;
use std::{path::PathBuf, sync::Arc};
use teamboard_api::{
    app::{build_router, AppState},
    config::Config,
};
use teamboard_shared::{
    auth::{jwt, password},
    models::user::{NewUser, User, UserRole},
    realtime::RealtimeHub,
    store::Storage,
};
use tower::ServiceExt;
use uuid::Uuid;

pub const TEST_SECRET: &str = "integration-test-secret-at-least-32-bytes";

/// Test context containing all necessary resources
pub struct TestContext {
    pub app: Router,
    pub state: AppState,
    pub upload_dir: PathBuf,
}

impl TestContext {
    /// Creates a context with empty volatile storage
    pub fn new() -> Self {
        Self::with_config(|_| {})
    }

    /// Creates a context after letting the caller adjust the configuration
    pub fn with_config(adjust: impl FnOnce(&mut Config)) -> Self {
        let upload_dir = std::env::temp_dir().join(format!("teamboard-test-{}", Uuid::new_v4()));
        let mut config = Config::for_memory(TEST_SECRET, upload_dir.clone());
        adjust(&mut config);

        let state = AppState::new(
            Arc::new(Storage::volatile()),
            Arc::new(RealtimeHub::new()),
            config,
        );
        let app = build_router(state.clone());

        Self {
            app,
            state,
            upload_dir,
        }
    }

    /// Sends a request and returns the status with the parsed body
    ///
    /// Non-JSON bodies come back as `Value::Null`.
    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }

        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        self.dispatch(request).await
    }

    pub async fn dispatch(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, json)
    }

    /// Registers a user and returns the response body
    pub async fn register(&self, email: &str, password: &str) -> Value {
        let (status, body) = self
            .send(
                Method::POST,
                "/api/auth/register",
                None,
                Some(serde_json::json!({ "email": email, "password": password })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "register failed: {}", body);
        body
    }

    /// Logs in and returns the token
    pub async fn login(&self, email: &str, password: &str) -> String {
        let (status, body) = self
            .send(
                Method::POST,
                "/api/auth/login",
                None,
                Some(serde_json::json!({ "email": email, "password": password })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "login failed: {}", body);
        body["token"].as_str().unwrap().to_string()
    }

    /// Registers and logs in; returns (user id, token)
    pub async fn signup(&self, email: &str) -> (String, String) {
        let body = self.register(email, "pw123456").await;
        let token = self.login(email, "pw123456").await;
        (body["user"]["id"].as_str().unwrap().to_string(), token)
    }

    /// Stores an administrator directly and returns it with a token
    pub async fn seed_admin(&self, email: &str) -> (User, String) {
        let user = self
            .state
            .repo()
            .create_user(NewUser {
                email: email.to_string(),
                password_hash: password::hash_password("admin-pass").unwrap(),
                name: "Admin".to_string(),
                role: UserRole::Admin,
                avatar_url: None,
            })
            .await
            .unwrap();
        let token = jwt::issue_for_user(&user, TEST_SECRET).unwrap();
        (user, token)
    }
}

impl Drop for TestContext {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.upload_dir);
    }
}

/// Builds a single-file multipart body; returns (content type, body)
pub fn multipart_body(field: &str, file_name: &str, content_type: &str, data: &[u8]) -> (String, Vec<u8>) {
    let boundary = "teamboard-test-boundary";
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
            field, file_name
        )
        .as_bytes(),
    );
    body.extend_from_slice(format!("Content-Type: {}\r\n\r\n", content_type).as_bytes());
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{}--\r\n", boundary).as_bytes());

    (format!("multipart/form-data; boundary={}", boundary), body)
}
