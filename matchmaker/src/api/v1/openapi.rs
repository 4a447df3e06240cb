use axum::Json;
use utoipa::OpenApi;

use super::dto;
use super::handlers;
use super::response;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Matchmaker API",
        version = "1.0.0",
        description = "Member matching and dashboard metrics over a drifting backend schema.",
    ),
    paths(
        handlers::health::health_check,
        handlers::matches::rank_matches,
        handlers::matches::invalidate_matches,
        handlers::metrics::get_metric,
        handlers::admin::get_schema,
        handlers::admin::invalidate_schema,
    ),
    components(schemas(
        // Response envelope
        response::ErrorCode,
        response::ApiError,
        // Matches
        dto::matches::RankMatchesRequest,
        dto::matches::RankMatchesResponse,
        dto::matches::RankedMatchResponse,
        dto::matches::InvalidateMatchesRequest,
        dto::matches::InvalidateMatchesResponse,
        // Metrics
        dto::metrics::DashboardMetricResponse,
        // Admin
        dto::admin::SchemaReportResponse,
        dto::admin::InvalidateSchemaRequest,
        dto::admin::InvalidateSchemaResponse,
        // Health (handler-local types)
        handlers::health::HealthData,
        handlers::health::BackendStatus,
    )),
    tags(
        (name = "health", description = "Health check"),
        (name = "matches", description = "Candidate ranking and score cache control"),
        (name = "metrics", description = "Dashboard metrics with period-over-period trend"),
        (name = "admin", description = "Schema detection inspection and reset"),
    ),
)]
pub struct ApiDoc;

pub async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
