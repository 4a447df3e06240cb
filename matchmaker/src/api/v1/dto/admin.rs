//! Admin DTOs for the v1 API.

use serde::{Deserialize, Serialize};

use crate::schema::{CollectionStatus, SchemaReportEntry};

/// Response for `GET /v1/admin/schema/{collection}`.
#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SchemaReportResponse {
    pub collection: String,
    /// `present`, `empty` or `missing`.
    #[schema(value_type = String)]
    pub status: CollectionStatus,
    /// Columns observed on the sampled row.
    pub columns: Vec<String>,
    #[schema(value_type = Option<String>)]
    pub detected_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl From<SchemaReportEntry> for SchemaReportResponse {
    fn from(entry: SchemaReportEntry) -> Self {
        Self {
            collection: entry.collection,
            status: entry.status,
            columns: entry.columns,
            detected_at: entry.detected_at,
        }
    }
}

/// Request body for `POST /v1/admin/schema:invalidate`.
#[derive(Debug, Clone, Default, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InvalidateSchemaRequest {
    /// Collections to re-detect. When omitted every cached schema is dropped.
    #[serde(default)]
    pub collections: Option<Vec<String>>,
}

/// Response for `POST /v1/admin/schema:invalidate`.
#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InvalidateSchemaResponse {
    /// Number of cached schema detections dropped.
    pub invalidated: usize,
}
