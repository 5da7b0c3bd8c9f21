use crate::errors::{ApiError, ServiceError};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use bytes::Bytes;
use serde::{de::DeserializeOwned, Serialize};

/// Largest accepted upload (workbooks and photos)
pub const UPLOAD_BODY_LIMIT: usize = 20 * 1024 * 1024;

/// Standard success response
pub fn success_response<T: Serialize>(data: T) -> Response {
    (StatusCode::OK, Json(data)).into_response()
}

/// Standard created response
pub fn created_response<T: Serialize>(data: T) -> Response {
    (StatusCode::CREATED, Json(data)).into_response()
}

/// Standard no content response
pub fn no_content_response() -> Response {
    StatusCode::NO_CONTENT.into_response()
}

/// Map service errors to API errors
pub fn map_service_error(err: ServiceError) -> ApiError {
    ApiError::ServiceError(err)
}

/// Parses a raw JSON body, keeping the byte size available to the caller.
pub fn parse_json_body<T: DeserializeOwned>(body: &Bytes) -> Result<T, ApiError> {
    if body.is_empty() {
        return Err(ApiError::BadRequest {
            message: "Request body is empty".to_string(),
            error_code: Some("EMPTY_BODY".to_string()),
        });
    }
    serde_json::from_slice(body).map_err(|e| ApiError::BadRequest {
        message: format!("Malformed JSON body: {}", e),
        error_code: Some("MALFORMED_JSON".to_string()),
    })
}
