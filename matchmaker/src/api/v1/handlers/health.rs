use axum::extract::State;
use serde::Serialize;

use crate::api::state::AppState;
use crate::api::v1::response::ApiResponse;

/// Health data returned inside the v1 envelope.
#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HealthData {
    pub status: String,
    pub version: String,
    pub backend: BackendStatus,
    pub weight_preset: String,
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct BackendStatus {
    /// `rest` or `memory`.
    pub kind: String,
    /// `ok` when the signed-in identity resolves, `degraded` otherwise.
    pub status: String,
}

/// `GET /api/v1/health`
#[utoipa::path(
    get,
    path = "/api/v1/health",
    tag = "health",
    responses(
        (status = 200, description = "Service health status", body = HealthData),
    )
)]
pub async fn health_check(State(state): State<AppState>) -> ApiResponse<HealthData> {
    let kind = if state.config.backend.url.is_some() {
        "rest"
    } else {
        "memory"
    };
    let status = match state.data.current_identity().await {
        Ok(_) => "ok",
        Err(e) => {
            tracing::debug!(error = %e, "Identity check failed");
            "degraded"
        }
    };

    ApiResponse::success(HealthData {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        backend: BackendStatus {
            kind: kind.to_string(),
            status: status.to_string(),
        },
        weight_preset: state.config.matching.weight_preset.to_string(),
    })
}
