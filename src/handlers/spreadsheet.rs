use super::common::{map_service_error, parse_json_body, success_response};
use crate::{
    errors::ApiError,
    handlers::AppState,
    models::{SearchCriteria, Workbook},
};
use axum::{
    extract::{Json, State},
    http::StatusCode,
    response::IntoResponse,
};
use bytes::Bytes;
use tracing::info;

#[utoipa::path(
    post,
    path = "/api/v1/excel/validate",
    request_body = Workbook,
    responses(
        (status = 200, description = "Every row is valid", body = crate::models::ValidationReport),
        (status = 400, description = "Rows with errors", body = crate::models::ValidationReport)
    ),
    security(("bearer_auth" = [])),
    tag = "excel"
)]
pub async fn validate_workbook(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let workbook: Workbook = parse_json_body(&body)?;
    let report = state.services.spreadsheet.validate(&workbook);

    info!(
        "Validated {:.3} KB workbook: {} rows, {} errors",
        body.len() as f64 / 1000.0,
        workbook.data_row_count(),
        report.errors.len()
    );

    let status = if report.is_valid() {
        StatusCode::OK
    } else {
        StatusCode::BAD_REQUEST
    };
    Ok((status, Json(report)))
}

#[utoipa::path(
    post,
    path = "/api/v1/excel/import",
    request_body = Workbook,
    responses(
        (status = 200, description = "Inserted facilities", body = Vec<crate::models::ImportedFacility>),
        (status = 400, description = "Malformed workbook", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "excel"
)]
pub async fn import_workbook(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let workbook: Workbook = parse_json_body(&body)?;
    let imported = state
        .services
        .spreadsheet
        .import(&workbook, body.len())
        .await
        .map_err(map_service_error)?;
    Ok(success_response(imported))
}

#[utoipa::path(
    post,
    path = "/api/v1/excel/export",
    request_body = SearchCriteria,
    responses(
        (status = 200, description = "Exported workbook location", body = crate::models::ExportLink),
        (status = 503, description = "Storage unavailable", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "excel"
)]
pub async fn export_workbook(
    State(state): State<AppState>,
    Json(criteria): Json<SearchCriteria>,
) -> Result<impl IntoResponse, ApiError> {
    let link = state
        .services
        .spreadsheet
        .export(&criteria)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(link))
}
