//! Dashboard metric DTOs for the v1 API.

use serde::{Deserialize, Serialize};

use crate::models::{Confidence, DashboardMetric, TrendLabel};

/// Query parameters for `GET /v1/metrics/{name}`.
#[derive(Debug, Clone, Default, Deserialize, utoipa::IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct MetricQuery {
    /// Member the metric is scoped to. Only used by per-member metrics such
    /// as `unread_messages`; defaults to the signed-in identity.
    pub subject_id: Option<String>,
}

/// Response for `GET /v1/metrics/{name}`.
#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DashboardMetricResponse {
    pub name: String,
    pub value: i64,
    /// Change of the trend window against the previous one.
    pub delta: i64,
    pub delta_percent: i64,
    /// `positive`, `negative` or `neutral`.
    #[schema(value_type = String)]
    pub trend_label: TrendLabel,
    /// 1-based position of the strategy that produced `value`; absent when
    /// the fallback constant was used.
    pub source_used: Option<usize>,
    pub source_name: String,
    #[schema(value_type = String)]
    pub confidence: Confidence,
}

impl From<DashboardMetric> for DashboardMetricResponse {
    fn from(metric: DashboardMetric) -> Self {
        Self {
            name: metric.name,
            value: metric.value,
            delta: metric.delta,
            delta_percent: metric.delta_percent,
            trend_label: metric.trend_label,
            source_used: metric.source_used,
            source_name: metric.source_name,
            confidence: metric.confidence,
        }
    }
}
