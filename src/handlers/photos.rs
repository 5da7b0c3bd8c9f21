use super::common::{map_service_error, no_content_response, success_response};
use crate::{
    errors::{ApiError, ServiceError},
    handlers::{AppServices, AppState},
    models::PhotoView,
};
use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
};
use bytes::Bytes;
use chrono::Utc;
use serde::Deserialize;
use tracing::{info, warn};
use utoipa::IntoParams;
use uuid::Uuid;

#[derive(Debug, Deserialize, IntoParams)]
pub struct PhotoUploadQuery {
    /// Original file name of the image
    pub filename: String,
}

/// Object key for an uploaded photo
pub fn photo_key(facility_id: Uuid, timestamp: i64, filename: &str) -> String {
    let filename: String = filename
        .trim()
        .chars()
        .map(|c| if c == '/' || c == '\\' { '_' } else { c })
        .collect();
    format!("{}-{}-{}", facility_id, timestamp, filename)
}

/// Writes the image to object storage and links it to the facility. The
/// object is removed again when the link cannot be made.
pub async fn store_photo(
    services: &AppServices,
    facility_id: Uuid,
    filename: &str,
    body: Bytes,
) -> Result<PhotoView, ServiceError> {
    let key = photo_key(facility_id, Utc::now().timestamp(), filename);
    let url = services.storage.put(body, &key).await?;
    match services.photos.attach(facility_id, &url, &key).await {
        Ok(photo) => Ok(photo),
        Err(err) => {
            if let Err(e) = services.storage.delete(&key).await {
                warn!("Failed to remove orphaned photo object {}: {}", key, e);
            }
            Err(err)
        }
    }
}

#[utoipa::path(
    post,
    path = "/api/v1/facility/:id/photo",
    params(("id" = Uuid, Path, description = "Facility ID"), PhotoUploadQuery),
    request_body(content = Vec<u8>, content_type = "application/octet-stream"),
    responses(
        (status = 200, description = "Photo attached", body = crate::models::PhotoView),
        (status = 404, description = "Facility not found", body = crate::errors::ErrorResponse),
        (status = 503, description = "Storage unavailable", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "photo"
)]
pub async fn upload_photo(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<PhotoUploadQuery>,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    if query.filename.trim().is_empty() {
        return Err(ApiError::ValidationError("filename must not be blank".into()));
    }
    if body.is_empty() {
        return Err(ApiError::ValidationError("photo body is empty".into()));
    }

    // Fail before touching storage when the facility is gone.
    state
        .services
        .facilities
        .get_by_id(id)
        .await
        .map_err(map_service_error)?;

    let photo = store_photo(&state.services, id, &query.filename, body)
        .await
        .map_err(map_service_error)?;

    info!("Photo {} uploaded for facility {}", photo.id, id);
    Ok(success_response(photo))
}

#[utoipa::path(
    delete,
    path = "/api/v1/facility/:id/photo/:photo_id",
    params(
        ("id" = Uuid, Path, description = "Facility ID"),
        ("photo_id" = Uuid, Path, description = "Photo ID")
    ),
    responses(
        (status = 204, description = "Photo detached"),
        (status = 404, description = "Facility or photo not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "photo"
)]
pub async fn delete_photo(
    State(state): State<AppState>,
    Path((facility_id, photo_id)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse, ApiError> {
    let key = state
        .services
        .photos
        .detach(facility_id, photo_id)
        .await
        .map_err(map_service_error)?;

    if let Err(e) = state.services.storage.delete(&key).await {
        warn!("Failed to delete photo object {}: {}", key, e);
    }
    Ok(no_content_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn photo_key_embeds_facility_and_timestamp() {
        let id = Uuid::nil();
        assert_eq!(
            photo_key(id, 1_700_000_000, "pool.jpg"),
            "00000000-0000-0000-0000-000000000000-1700000000-pool.jpg"
        );
        assert!(!photo_key(id, 1, "../../etc/passwd").contains('/'));
    }
}
