use super::common::{
    created_response, map_service_error, no_content_response, success_response,
};
use crate::{
    errors::ApiError,
    handlers::AppState,
    models::{FacilityFields, FacilityPatch, SearchCriteria},
};
use axum::{
    extract::{Json, Path, State},
    response::IntoResponse,
};
use tracing::info;
use uuid::Uuid;

#[utoipa::path(
    post,
    path = "/api/v1/facility",
    request_body = FacilityFields,
    responses(
        (status = 201, description = "Facility created", body = crate::models::FacilityView),
        (status = 400, description = "Invalid payload", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
        (status = 409, description = "Facility already exists", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "facility"
)]
pub async fn create_facility(
    State(state): State<AppState>,
    Json(payload): Json<FacilityFields>,
) -> Result<impl IntoResponse, ApiError> {
    let facility = state
        .services
        .facilities
        .create(payload)
        .await
        .map_err(map_service_error)?;

    info!("Facility created: {}", facility.id);
    Ok(created_response(facility))
}

#[utoipa::path(
    put,
    path = "/api/v1/facility/:id",
    params(("id" = Uuid, Path, description = "Facility ID")),
    request_body = FacilityFields,
    responses(
        (status = 200, description = "Facility replaced", body = crate::models::FacilityView),
        (status = 400, description = "Invalid payload", body = crate::errors::ErrorResponse),
        (status = 404, description = "Facility not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Facility already exists", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "facility"
)]
pub async fn replace_facility(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<FacilityFields>,
) -> Result<impl IntoResponse, ApiError> {
    let facility = state
        .services
        .facilities
        .replace(id, payload)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(facility))
}

#[utoipa::path(
    patch,
    path = "/api/v1/facility/:id",
    params(("id" = Uuid, Path, description = "Facility ID")),
    request_body = FacilityPatch,
    responses(
        (status = 200, description = "Facility updated", body = crate::models::FacilityView),
        (status = 400, description = "Invalid payload", body = crate::errors::ErrorResponse),
        (status = 404, description = "Facility not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "facility"
)]
pub async fn patch_facility(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<FacilityPatch>,
) -> Result<impl IntoResponse, ApiError> {
    let facility = state
        .services
        .facilities
        .partial_update(id, payload)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(facility))
}

#[utoipa::path(
    delete,
    path = "/api/v1/facility/:id",
    params(("id" = Uuid, Path, description = "Facility ID")),
    responses(
        (status = 204, description = "Facility deleted"),
        (status = 404, description = "Facility not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "facility"
)]
pub async fn delete_facility(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .services
        .facilities
        .delete(id)
        .await
        .map_err(map_service_error)?;

    info!("Facility deleted: {}", id);
    Ok(no_content_response())
}

#[utoipa::path(
    get,
    path = "/api/v1/facility/:id",
    params(("id" = Uuid, Path, description = "Facility ID")),
    responses(
        (status = 200, description = "Facility fetched", body = crate::models::FacilityView),
        (status = 404, description = "Facility not found", body = crate::errors::ErrorResponse)
    ),
    tag = "facility"
)]
pub async fn get_facility(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let facility = state
        .services
        .facilities
        .get_by_id(id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(facility))
}

#[utoipa::path(
    post,
    path = "/api/v1/facility/search",
    request_body = SearchCriteria,
    responses(
        (status = 200, description = "Matching facilities", body = crate::models::SearchResult),
        (status = 400, description = "Invalid criteria", body = crate::errors::ErrorResponse)
    ),
    tag = "facility"
)]
pub async fn search_facilities(
    State(state): State<AppState>,
    Json(criteria): Json<SearchCriteria>,
) -> Result<impl IntoResponse, ApiError> {
    let result = state
        .services
        .search
        .search(&criteria)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(result))
}
