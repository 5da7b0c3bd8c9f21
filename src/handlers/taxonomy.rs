use super::common::{map_service_error, success_response};
use crate::{errors::ApiError, handlers::AppState, services::taxonomy::TaxonomyAxis};
use axum::{extract::State, response::IntoResponse};

async fn list_axis(state: &AppState, axis: TaxonomyAxis) -> Result<impl IntoResponse, ApiError> {
    let terms = state
        .services
        .taxonomy
        .list(axis)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(terms))
}

#[utoipa::path(
    get,
    path = "/api/v1/facility-type",
    responses((status = 200, description = "Facility type labels", body = Vec<String>)),
    tag = "taxonomy"
)]
pub async fn list_facility_types(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    list_axis(&state, TaxonomyAxis::Type).await
}

#[utoipa::path(
    get,
    path = "/api/v1/facility-owning-type",
    responses((status = 200, description = "Owning type labels", body = Vec<String>)),
    tag = "taxonomy"
)]
pub async fn list_owning_types(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    list_axis(&state, TaxonomyAxis::OwningType).await
}

#[utoipa::path(
    get,
    path = "/api/v1/facility-covering-type",
    responses((status = 200, description = "Covering type labels", body = Vec<String>)),
    tag = "taxonomy"
)]
pub async fn list_covering_types(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ApiError> {
    list_axis(&state, TaxonomyAxis::CoveringType).await
}

#[utoipa::path(
    get,
    path = "/api/v1/facility-paying-type",
    responses((status = 200, description = "Paying type labels", body = Vec<String>)),
    tag = "taxonomy"
)]
pub async fn list_paying_types(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    list_axis(&state, TaxonomyAxis::PayingType).await
}

#[utoipa::path(
    get,
    path = "/api/v1/facility-age",
    responses((status = 200, description = "Age group labels", body = Vec<String>)),
    tag = "taxonomy"
)]
pub async fn list_ages(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    list_axis(&state, TaxonomyAxis::Age).await
}
