use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Confidence;

/// Dashboard aggregates the metric aggregator knows how to compute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricName {
    TotalMembers,
    MonthlyEvents,
    MatchingSuccess,
    UnreadMessages,
}

impl MetricName {
    pub const ALL: [MetricName; 4] = [
        MetricName::TotalMembers,
        MetricName::MonthlyEvents,
        MetricName::MatchingSuccess,
        MetricName::UnreadMessages,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TotalMembers => "total_members",
            Self::MonthlyEvents => "monthly_events",
            Self::MatchingSuccess => "matching_success",
            Self::UnreadMessages => "unread_messages",
        }
    }
}

impl std::fmt::Display for MetricName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for MetricName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "total_members" | "members" => Ok(Self::TotalMembers),
            "monthly_events" | "events" => Ok(Self::MonthlyEvents),
            "matching_success" | "matches" => Ok(Self::MatchingSuccess),
            "unread_messages" | "messages" => Ok(Self::UnreadMessages),
            _ => Err(format!(
                "Unknown metric '{s}'. Valid metrics: total_members, monthly_events, matching_success, unread_messages"
            )),
        }
    }
}

/// A derived scalar together with where it came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateMetric {
    pub name: String,
    pub value: i64,
    pub computed_at: DateTime<Utc>,
    pub ttl_secs: u64,
    /// 1-based position of the winning strategy; `None` for the fallback constant.
    pub source_used: Option<usize>,
    pub source_name: String,
    pub confidence: Confidence,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendLabel {
    Positive,
    Negative,
    Neutral,
}

/// Period-over-period change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricDelta {
    pub delta: i64,
    pub delta_percent: i64,
    pub trend_label: TrendLabel,
}

/// What the presentation layer receives for one dashboard card.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardMetric {
    pub name: String,
    pub value: i64,
    pub delta: i64,
    pub delta_percent: i64,
    pub trend_label: TrendLabel,
    pub source_used: Option<usize>,
    pub source_name: String,
    pub confidence: Confidence,
}
