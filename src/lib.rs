//! Sport Facility API Library
//!
//! Directory of sports facilities: normalized classification vocabularies,
//! facility records, filtered search and bulk workbook import and export.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

// Core modules
pub mod auth;
pub mod common;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod handlers;
pub mod middleware_helpers;
pub mod migrator;
pub mod models;
pub mod notifications;
pub mod openapi;
pub mod services;
pub mod storage;
pub mod tracing;

use axum::{
    extract::{DefaultBodyLimit, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{delete, get, post},
    Extension, Router,
};
use chrono::Utc;
use sea_orm::DatabaseConnection;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::services::ServeDir;

use crate::auth::{AuthRouterExt, AuthService, ADMIN_ROLE};
use crate::handlers::common::UPLOAD_BODY_LIMIT;

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: Arc<config::AppConfig>,
    pub services: handlers::AppServices,
}

// Common response wrappers
#[derive(Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<ResponseMeta>,
}

#[derive(Serialize)]
pub struct ResponseMeta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    pub timestamp: String,
}

impl ResponseMeta {
    fn capture() -> Self {
        Self {
            request_id: crate::tracing::current_request_id().map(|rid| rid.as_str().to_string()),
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            meta: Some(ResponseMeta::capture()),
        }
    }
}


/// Versioned API routes. Reads are public; every mutation needs the admin role.
pub fn api_v1_routes() -> Router<AppState> {
    let facilities_read = Router::new()
        .route("/facility/:id", get(handlers::facilities::get_facility))
        .route(
            "/facility/search",
            post(handlers::facilities::search_facilities),
        );

    let facilities_write = Router::new()
        .route("/facility", post(handlers::facilities::create_facility))
        .route(
            "/facility/:id",
            axum::routing::put(handlers::facilities::replace_facility)
                .patch(handlers::facilities::patch_facility)
                .delete(handlers::facilities::delete_facility),
        )
        .with_role(ADMIN_ROLE);

    let taxonomy = Router::new()
        .route(
            "/facility-type",
            get(handlers::taxonomy::list_facility_types),
        )
        .route(
            "/facility-owning-type",
            get(handlers::taxonomy::list_owning_types),
        )
        .route(
            "/facility-covering-type",
            get(handlers::taxonomy::list_covering_types),
        )
        .route(
            "/facility-paying-type",
            get(handlers::taxonomy::list_paying_types),
        )
        .route("/facility-age", get(handlers::taxonomy::list_ages));

    // Uploads carry whole workbooks and images
    let excel = Router::new()
        .route(
            "/excel/validate",
            post(handlers::spreadsheet::validate_workbook),
        )
        .route("/excel/import", post(handlers::spreadsheet::import_workbook))
        .route("/excel/export", post(handlers::spreadsheet::export_workbook))
        .layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT))
        .with_role(ADMIN_ROLE);

    let photos = Router::new()
        .route("/facility/:id/photo", post(handlers::photos::upload_photo))
        .route(
            "/facility/:id/photo/:photo_id",
            delete(handlers::photos::delete_photo),
        )
        .layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT))
        .with_role(ADMIN_ROLE);

    Router::new()
        .route("/status", get(api_status))
        .merge(facilities_read)
        .merge(facilities_write)
        .merge(taxonomy)
        .merge(excel)
        .merge(photos)
}

/// Full application router: API, health, docs and the public storage directory.
///
/// Callers add CORS, compression and timeouts on top.
pub fn app_router(state: AppState, auth_service: Arc<AuthService>) -> Router {
    let static_files = ServeDir::new(&state.config.storage_root);

    Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1", api_v1_routes())
        .nest_service("/static", static_files)
        .merge(openapi::swagger_ui())
        .layer(crate::tracing::configure_http_tracing())
        // Auth middleware reads the service from request extensions
        .layer(Extension(auth_service))
        .layer(axum::middleware::from_fn(
            middleware_helpers::request_id::request_id_middleware,
        ))
        .with_state(state)
}

async fn api_status(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Value>>, errors::ServiceError> {
    let pending = migrator::pending_migration_count(&state.db).await?;
    let status_data = json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "service": "sportfacility-api",
        "environment": state.config.environment,
        "pending_migrations": pending,
        "timestamp": Utc::now().to_rfc3339(),
    });

    Ok(Json(ApiResponse::success(status_data)))
}

async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let db_status = match db::check_connection(&state.db).await {
        Ok(_) => "healthy",
        Err(_) => "unhealthy",
    };

    let status = if db_status == "healthy" {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    let health_data = json!({
        "status": db_status,
        "checks": {
            "database": db_status,
        },
        "timestamp": Utc::now().to_rfc3339(),
    });

    (status, Json(ApiResponse::success(health_data)))
}
