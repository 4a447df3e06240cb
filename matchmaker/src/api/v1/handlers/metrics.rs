//! v1 Dashboard metric handlers.

use axum::extract::{Path, Query, State};

use crate::api::v1::dto::{DashboardMetricResponse, MetricQuery};
use crate::api::v1::response::{ApiError, ApiResponse, ErrorCode};
use crate::api::AppState;
use crate::models::MetricName;

/// `GET /api/v1/metrics/{name}`
#[utoipa::path(
    get,
    path = "/api/v1/metrics/{name}",
    tag = "metrics",
    operation_id = "metrics.get",
    params(
        ("name" = String, Path, description = "total_members, monthly_events, matching_success or unread_messages"),
        MetricQuery,
    ),
    responses(
        (status = 200, description = "Metric computed", body = DashboardMetricResponse),
        (status = 404, description = "Unknown metric", body = ApiError),
    )
)]
pub async fn get_metric(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Query(query): Query<MetricQuery>,
) -> ApiResponse<DashboardMetricResponse> {
    let name: MetricName = match name.parse() {
        Ok(name) => name,
        Err(e) => return ApiResponse::error(ErrorCode::NotFound, e),
    };

    let metric = state
        .dashboard
        .get_dashboard_metric(name, query.subject_id.as_deref())
        .await;
    ApiResponse::success(DashboardMetricResponse::from(metric))
}
