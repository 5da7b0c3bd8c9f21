#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::{to_bytes, Body},
    http::{Method, Request, StatusCode},
    Router,
};
use serde_json::Value;
use sportfacility_api::{
    app_router,
    auth::{AuthConfig, AuthService, ADMIN_ROLE},
    config::AppConfig,
    db,
    events::{self, EventSender},
    handlers::AppServices,
    models::FacilityFields,
    notifications::LogMailer,
    storage::LocalObjectStorage,
    AppState,
};
use tempfile::TempDir;
use tokio::sync::mpsc;
use tower::ServiceExt;

pub const TEST_JWT_SECRET: &str = "test_secret_key_for_facility_directory_only_48chars";

/// Helper harness for spinning up an application backed by a throwaway SQLite file.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    pub auth_service: Arc<AuthService>,
    admin_token: String,
    _dir: TempDir,
    _event_task: tokio::task::JoinHandle<()>,
}

impl TestApp {
    /// Construct a new test application with fresh database state.
    pub async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    /// Same as `new`, letting the caller adjust the configuration first.
    pub async fn with_config(adjust: impl FnOnce(&mut AppConfig)) -> Self {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        let db_path = dir.path().join("facilities.db");
        let storage_root = dir.path().join("storage");

        let mut cfg = AppConfig::new(
            format!("sqlite://{}?mode=rwc", db_path.display()),
            TEST_JWT_SECRET.to_string(),
            "127.0.0.1".to_string(),
            18_080,
            "test".to_string(),
        );
        cfg.db_max_connections = 1;
        cfg.db_min_connections = 1;
        cfg.storage_root = storage_root.display().to_string();
        cfg.storage_public_url = "http://files.test/static".to_string();
        adjust(&mut cfg);
        let cfg = Arc::new(cfg);

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let db_arc = Arc::new(pool);
        let (event_tx, event_rx) = mpsc::channel(256);
        let event_sender = Arc::new(EventSender::new(event_tx));
        let event_task = tokio::spawn(events::process_events(event_rx, Arc::new(LogMailer)));

        let storage = Arc::new(LocalObjectStorage::new(
            storage_root,
            cfg.storage_public_url.clone(),
        ));
        let services = AppServices::new(db_arc.clone(), cfg.clone(), event_sender, storage);

        let state = AppState {
            db: db_arc,
            config: cfg.clone(),
            services,
        };

        let auth_service = Arc::new(AuthService::new(AuthConfig::new(
            cfg.jwt_secret.clone(),
            Duration::from_secs(3600),
        )));
        let admin_token = auth_service
            .issue_token("admin-1", &[ADMIN_ROLE])
            .expect("issue admin token");

        let router = app_router(state.clone(), auth_service.clone());

        Self {
            router,
            state,
            auth_service,
            admin_token,
            _dir: dir,
            _event_task: event_task,
        }
    }

    pub fn services(&self) -> &AppServices {
        &self.state.services
    }

    /// Bearer token carrying the admin role.
    pub fn admin_token(&self) -> &str {
        &self.admin_token
    }

    /// Bearer token for an authenticated user without the admin role.
    pub fn viewer_token(&self) -> String {
        self.auth_service
            .issue_token("viewer-1", &["viewer"])
            .expect("issue viewer token")
    }

    /// Send a request against the router with an optional bearer token.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> (StatusCode, Value) {
        let body = body.map(|json| serde_json::to_vec(&json).expect("serialize json body"));
        self.request_raw(method, uri, body, "application/json", token)
            .await
    }

    /// Convenience helper for admin JSON requests.
    pub async fn admin(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let token = self.admin_token.clone();
        self.request(method, uri, body, Some(&token)).await
    }

    /// Sends raw bytes and decodes the response as JSON (`Null` when empty).
    pub async fn request_raw(
        &self,
        method: Method,
        uri: &str,
        body: Option<Vec<u8>>,
        content_type: &str,
        token: Option<&str>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(tok) = token {
            builder = builder.header("authorization", format!("Bearer {}", tok));
        }
        let body = match body {
            Some(bytes) => {
                builder = builder.header("content-type", content_type);
                Body::from(bytes)
            }
            None => Body::empty(),
        };

        let response = self
            .router
            .clone()
            .oneshot(builder.body(body).expect("failed to build request"))
            .await
            .expect("router error during test request");

        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read response body");
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };
        (status, json)
    }
}

/// Minimal valid facility payload
pub fn facility(name: &str, type_name: &str) -> FacilityFields {
    FacilityFields::new(name, "City Sports Committee", format!("{name} street 1"), 100.0, type_name)
}
