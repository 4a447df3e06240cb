//! v1 Admin handlers.

use axum::extract::{Path, State};

use crate::api::v1::dto::{InvalidateSchemaRequest, InvalidateSchemaResponse, SchemaReportResponse};
use crate::api::v1::response::{ApiError, ApiResponse, ErrorCode};
use crate::api::AppState;

/// `GET /api/v1/admin/schema/{collection}`
#[utoipa::path(
    get,
    path = "/api/v1/admin/schema/{collection}",
    tag = "admin",
    operation_id = "admin.schema",
    params(("collection" = String, Path, description = "Backend collection name")),
    responses(
        (status = 200, description = "Detected columns", body = SchemaReportResponse),
        (status = 400, description = "Invalid request", body = ApiError),
    )
)]
pub async fn get_schema(
    State(state): State<AppState>,
    Path(collection): Path<String>,
) -> ApiResponse<SchemaReportResponse> {
    if collection.trim().is_empty() {
        return ApiResponse::error(ErrorCode::InvalidRequest, "Collection cannot be empty");
    }

    let report = state.schema.schema_report(&[collection]).await;
    match report.into_iter().next() {
        Some(entry) => ApiResponse::success(SchemaReportResponse::from(entry)),
        None => ApiResponse::error(ErrorCode::InternalError, "An internal error occurred"),
    }
}

/// `POST /api/v1/admin/schema:invalidate`
#[utoipa::path(
    post,
    path = "/api/v1/admin/schema:invalidate",
    tag = "admin",
    operation_id = "admin.schemaInvalidate",
    request_body = InvalidateSchemaRequest,
    responses(
        (status = 200, description = "Cached schemas dropped", body = InvalidateSchemaResponse),
    )
)]
pub async fn invalidate_schema(
    State(state): State<AppState>,
    axum::Json(req): axum::Json<InvalidateSchemaRequest>,
) -> ApiResponse<InvalidateSchemaResponse> {
    let invalidated = match req.collections {
        Some(collections) => collections
            .iter()
            .filter(|c| state.schema.invalidate(c))
            .count(),
        None => state.schema.invalidate_all(),
    };
    tracing::info!(invalidated, "Schema cache invalidated");
    ApiResponse::success(InvalidateSchemaResponse { invalidated })
}
