//! Matching DTOs for the v1 API.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::models::{Confidence, RankedMatch};

/// Request body for `POST /v1/matches:rank`.
#[derive(Debug, Clone, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RankMatchesRequest {
    /// Member to rank candidates for. Defaults to the signed-in identity.
    #[serde(default)]
    pub subject_id: Option<String>,
    /// Candidate member ids. Duplicates and the subject itself are ignored.
    pub candidate_ids: Vec<String>,
}

/// One ranked candidate.
#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RankedMatchResponse {
    pub candidate_id: String,
    /// Blended 0-100 score used for ordering.
    pub final_score: u8,
    /// Signal name (`commonTopics`, `communicationStyle`, ...) to 0-100 score.
    pub breakdown: BTreeMap<String, u8>,
    /// `high`, `low` or `none` depending on how many signals fell back.
    #[schema(value_type = String)]
    pub confidence: Confidence,
    /// Served from the durable score cache.
    pub cached: bool,
}

impl From<RankedMatch> for RankedMatchResponse {
    fn from(ranked: RankedMatch) -> Self {
        Self {
            candidate_id: ranked.candidate_id,
            final_score: ranked.final_score,
            breakdown: ranked
                .breakdown
                .into_iter()
                .map(|(signal, score)| (signal.as_str().to_string(), score))
                .collect(),
            confidence: ranked.confidence,
            cached: ranked.cached,
        }
    }
}

/// Response for `POST /v1/matches:rank`.
#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RankMatchesResponse {
    pub subject_id: String,
    /// Ordered by `finalScore` descending, ties by `candidateId`.
    pub matches: Vec<RankedMatchResponse>,
}

/// Request body for `POST /v1/matches:invalidate`.
#[derive(Debug, Clone, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InvalidateMatchesRequest {
    pub subject_id: String,
    /// When omitted, every cached score of the subject is dropped.
    #[serde(default)]
    pub target_id: Option<String>,
}

/// Response for `POST /v1/matches:invalidate`.
#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InvalidateMatchesResponse {
    /// Number of cached scores removed.
    pub removed: u64,
}
