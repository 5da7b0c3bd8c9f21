use std::{fs, path::Path};

use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

use crate::errors::ServiceError;

/// Registers the bearer JWT scheme referenced by the admin endpoints
pub struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Sport Facility API",
        version = "0.1.0",
        description = r#"
# Sports Facility Directory API

Registry of sports facilities with normalized classification, filtered search
and bulk workbook import and export.

## Authentication

Reads are public. Creating, changing and deleting facilities, uploading photos
and every `/excel` endpoint need a JWT carrying the `admin` role:

```
Authorization: Bearer <your-jwt-token>
```

## Error Handling

Errors share one body shape:

```json
{
  "error": "Conflict",
  "message": "Resource already exists: ...",
  "request_id": "6c1b...",
  "timestamp": "2024-01-01T00:00:00Z"
}
```

## Pagination

`POST /facility/search` takes `limit` and `offset`; `limit` defaults to the
configured page size and is capped by the configured maximum. Send
`"all": true` to receive every match.
        "#,
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development")
    ),
    tags(
        (name = "facility", description = "Facility records and search"),
        (name = "taxonomy", description = "Classification vocabularies"),
        (name = "excel", description = "Bulk workbook validation, import and export"),
        (name = "photo", description = "Facility photos")
    ),
    paths(
        // Facilities
        crate::handlers::facilities::create_facility,
        crate::handlers::facilities::replace_facility,
        crate::handlers::facilities::patch_facility,
        crate::handlers::facilities::delete_facility,
        crate::handlers::facilities::get_facility,
        crate::handlers::facilities::search_facilities,

        // Taxonomy
        crate::handlers::taxonomy::list_facility_types,
        crate::handlers::taxonomy::list_owning_types,
        crate::handlers::taxonomy::list_covering_types,
        crate::handlers::taxonomy::list_paying_types,
        crate::handlers::taxonomy::list_ages,

        // Workbooks
        crate::handlers::spreadsheet::validate_workbook,
        crate::handlers::spreadsheet::import_workbook,
        crate::handlers::spreadsheet::export_workbook,

        // Photos
        crate::handlers::photos::upload_photo,
        crate::handlers::photos::delete_photo,
    ),
    components(
        schemas(
            // Facility types
            crate::models::FacilityFields,
            crate::models::FacilityPatch,
            crate::models::FacilityView,
            crate::models::WorkingHours,
            crate::models::DaySchedule,
            crate::models::PhotoView,

            // Search types
            crate::models::SearchCriteria,
            crate::models::FieldFilter,
            crate::models::SearchResult,

            // Workbook types
            crate::models::Workbook,
            crate::models::Sheet,
            crate::models::RowError,
            crate::models::ValidationReport,
            crate::models::ImportedFacility,
            crate::models::ExportLink,

            crate::services::taxonomy::TaxonomyAxis,

            // Error types
            crate::errors::ErrorResponse
        )
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDocV1;

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDocV1::openapi())
        .config(utoipa_swagger_ui::Config::from("/api-docs/openapi.json").try_it_out_enabled(true))
}

/// Default location of the exported document, relative to the working directory
pub const DEFAULT_EXPORT_PATH: &str = "openapi/sportfacility-api.v1.json";

/// Writes the pretty-printed document to `path`, creating parent directories.
pub fn write_document(path: &Path) -> Result<(), ServiceError> {
    let json = serde_json::to_string_pretty(&ApiDocV1::openapi())
        .map_err(|e| ServiceError::SerializationError(e.to_string()))?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .map_err(|e| ServiceError::InternalError(format!("{}: {}", parent.display(), e)))?;
    }
    fs::write(path, json)
        .map_err(|e| ServiceError::InternalError(format!("{}: {}", path.display(), e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_is_written_to_nested_path() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("docs").join("api.json");

        write_document(&target).unwrap();

        let written: serde_json::Value =
            serde_json::from_slice(&fs::read(&target).unwrap()).unwrap();
        assert_eq!(written["info"]["title"], "Sport Facility API");
    }

    #[test]
    fn test_openapi_generation() {
        let openapi = ApiDocV1::openapi();
        let json = serde_json::to_string_pretty(&openapi).unwrap();
        assert!(json.contains("Sport Facility API"));
        assert!(json.contains("/api/v1/facility/search"));
        assert!(json.contains("/api/v1/excel/import"));
        assert!(json.contains("bearer_auth"));
    }
}
