//! v1 Matching handlers.

use axum::extract::State;

use crate::api::v1::dto::{
    InvalidateMatchesRequest, InvalidateMatchesResponse, RankMatchesRequest, RankMatchesResponse,
    RankedMatchResponse,
};
use crate::api::v1::response::{ApiError, ApiResponse, ErrorCode};
use crate::api::AppState;

/// `POST /api/v1/matches:rank`
#[utoipa::path(
    post,
    path = "/api/v1/matches:rank",
    tag = "matches",
    operation_id = "matches.rank",
    request_body = RankMatchesRequest,
    responses(
        (status = 200, description = "Candidates ranked", body = RankMatchesResponse),
        (status = 400, description = "Invalid request", body = ApiError),
        (status = 409, description = "Superseded by a newer ranking", body = ApiError),
    )
)]
pub async fn rank_matches(
    State(state): State<AppState>,
    axum::Json(req): axum::Json<RankMatchesRequest>,
) -> ApiResponse<RankMatchesResponse> {
    let subject_id = match req.subject_id.filter(|s| !s.trim().is_empty()) {
        Some(id) => id,
        None => match state.data.current_identity().await {
            Ok(identity) => identity.id,
            Err(e) => {
                tracing::warn!(error = %e, "No subjectId and no signed-in identity");
                return ApiResponse::error(
                    ErrorCode::InvalidRequest,
                    "subjectId is required when no identity is signed in",
                );
            }
        },
    };

    match state
        .matching
        .get_ranked_matches(&subject_id, &req.candidate_ids)
        .await
    {
        Ok(ranked) => ApiResponse::success(RankMatchesResponse {
            subject_id,
            matches: ranked.into_iter().map(RankedMatchResponse::from).collect(),
        }),
        Err(e) => e.into(),
    }
}

/// `POST /api/v1/matches:invalidate`
#[utoipa::path(
    post,
    path = "/api/v1/matches:invalidate",
    tag = "matches",
    operation_id = "matches.invalidate",
    request_body = InvalidateMatchesRequest,
    responses(
        (status = 200, description = "Cached scores dropped", body = InvalidateMatchesResponse),
        (status = 400, description = "Invalid request", body = ApiError),
    )
)]
pub async fn invalidate_matches(
    State(state): State<AppState>,
    axum::Json(req): axum::Json<InvalidateMatchesRequest>,
) -> ApiResponse<InvalidateMatchesResponse> {
    if req.subject_id.trim().is_empty() {
        return ApiResponse::error(ErrorCode::InvalidRequest, "subjectId cannot be empty");
    }

    let removed = match req.target_id.as_deref() {
        Some(target_id) => state
            .matching
            .invalidate_pair(&req.subject_id, target_id)
            .await
            .map(u64::from),
        None => state.matching.invalidate_subject(&req.subject_id).await,
    };

    match removed {
        Ok(removed) => ApiResponse::success(InvalidateMatchesResponse { removed }),
        Err(e) => e.into(),
    }
}
