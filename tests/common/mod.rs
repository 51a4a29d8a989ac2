#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Method, Request, StatusCode, header};
use chrono::Utc;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use grouplib::auth::TokenGenerator;
use grouplib::config::ServerConfig;
use grouplib::server::{AppState, create_router};
use grouplib::store::{SqliteStore, Store};
use grouplib::types::User;

/// An in-process server backed by a throwaway database.
pub struct TestApp {
    _temp_dir: TempDir,
    pub sqlite: Arc<SqliteStore>,
    pub store: Arc<dyn Store>,
    pub state: Arc<AppState>,
    router: Router,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_config(ServerConfig::default())
    }

    pub fn with_config(config: ServerConfig) -> Self {
        Self::with_extensions(config, &[])
    }

    pub fn with_extensions(config: ServerConfig, extensions: &[&str]) -> Self {
        let temp_dir = TempDir::new().expect("create temp dir");
        let sqlite = Arc::new(SqliteStore::new(temp_dir.path().join("test.db")).expect("open db"));
        sqlite
            .initialize_with_extensions(extensions)
            .expect("initialize db");

        let store: Arc<dyn Store> = sqlite.clone();
        let state = Arc::new(AppState::new(store.clone(), config));
        let router = create_router(state.clone());

        Self {
            _temp_dir: temp_dir,
            sqlite,
            store,
            state,
            router,
        }
    }

    /// Creates a user with the given role and returns a raw access token.
    pub fn add_user_with(
        &self,
        email: &str,
        nickname: Option<&str>,
        role: &str,
        org_id: Option<i64>,
    ) -> String {
        let user = User {
            email: email.to_string(),
            nickname: nickname.map(str::to_string),
            contact_email: None,
            role: role.to_string(),
            org_id,
            created_at: Utc::now(),
        };
        self.store.create_user(&user).expect("create user");

        let (token, raw) = TokenGenerator::new().issue(email).expect("issue token");
        self.store.create_token(&token).expect("store token");
        raw
    }

    pub fn add_user(&self, email: &str) -> String {
        self.add_user_with(email, None, "default", None)
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }

        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("build request");

        self.send(request).await
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible");

        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read body");

        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };
        (status, value)
    }

    pub async fn get(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.request(Method::GET, uri, Some(token), None).await
    }

    pub async fn post(&self, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.request(Method::POST, uri, Some(token), Some(body)).await
    }

    pub async fn delete(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.request(Method::DELETE, uri, Some(token), None).await
    }
}

pub fn libraries_uri(group_id: i64) -> String {
    format!("/api/v2.1/groups/{group_id}/libraries/")
}

pub fn library_uri(group_id: i64, repo_id: &str) -> String {
    format!("/api/v2.1/groups/{group_id}/libraries/{repo_id}/")
}
