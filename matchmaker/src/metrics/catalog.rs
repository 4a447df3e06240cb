use std::collections::HashMap;
use std::sync::Arc;

use crate::models::MetricName;
use crate::schema::{QueryBuilder, QueryIntent};

use super::sources::{AggregateRow, CollectionCount, DistinctActorCount, WindowField};
use super::MetricStrategy;

/// Unread counts derived from a degraded query are not trusted past this.
pub const DEGRADED_UNREAD_CAP: i64 = 99;

const EVENT_ACTIVITY_TYPES: &[&str] = &["event", "event_participation"];
const MATCHING_ACTIVITY_TYPES: &[&str] =
    &["matching", "matching_success", "profile_exchange", "connection"];
const SUCCESSFUL_MATCH_STATUSES: &[&str] = &["success", "completed"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueWindow {
    AllTime,
    CurrentMonth,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrendWindow {
    Month,
    Day,
}

/// How one dashboard metric is computed.
#[derive(Clone)]
pub struct MetricDefinition {
    pub name: MetricName,
    pub value_window: ValueWindow,
    pub trend_window: TrendWindow,
    pub lower_is_better: bool,
    /// Scoped to the requesting member.
    pub per_subject: bool,
    pub strategies: Vec<Arc<dyn MetricStrategy>>,
    pub fallback: i64,
}

fn owned(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

pub fn default_catalog(queries: &QueryBuilder) -> HashMap<MetricName, MetricDefinition> {
    let q = || queries.clone();
    let mut catalog = HashMap::new();

    catalog.insert(
        MetricName::TotalMembers,
        MetricDefinition {
            name: MetricName::TotalMembers,
            value_window: ValueWindow::AllTime,
            trend_window: TrendWindow::Month,
            lower_is_better: false,
            per_subject: false,
            strategies: vec![
                Arc::new(CollectionCount::new(q(), "profiles").windowed_by(WindowField::Created)),
                Arc::new(CollectionCount::new(q(), "users").windowed_by(WindowField::Created)),
                Arc::new(DistinctActorCount::new(q(), "messages")),
                Arc::new(AggregateRow::new(q(), "dashboard_stats", "total_members")),
            ],
            fallback: 0,
        },
    );

    catalog.insert(
        MetricName::MonthlyEvents,
        MetricDefinition {
            name: MetricName::MonthlyEvents,
            value_window: ValueWindow::CurrentMonth,
            trend_window: TrendWindow::Month,
            lower_is_better: false,
            per_subject: false,
            strategies: vec![
                Arc::new(CollectionCount::new(q(), "events").windowed_by(WindowField::EventDate)),
                Arc::new(
                    CollectionCount::new(q(), "user_activities")
                        .named("user_activities.events")
                        .windowed_by(WindowField::Created)
                        .requiring(QueryIntent::ActivityType(owned(EVENT_ACTIVITY_TYPES))),
                ),
                Arc::new(
                    AggregateRow::new(q(), "dashboard_stats", "monthly_events").current_period(),
                ),
            ],
            fallback: 0,
        },
    );

    catalog.insert(
        MetricName::MatchingSuccess,
        MetricDefinition {
            name: MetricName::MatchingSuccess,
            value_window: ValueWindow::AllTime,
            trend_window: TrendWindow::Month,
            lower_is_better: false,
            per_subject: false,
            strategies: vec![
                Arc::new(
                    CollectionCount::new(q(), "matchings")
                        .windowed_by(WindowField::MatchDate)
                        .filtered(QueryIntent::Status(owned(SUCCESSFUL_MATCH_STATUSES))),
                ),
                Arc::new(
                    CollectionCount::new(q(), "user_activities")
                        .named("user_activities.matchings")
                        .windowed_by(WindowField::Created)
                        .requiring(QueryIntent::ActivityType(owned(MATCHING_ACTIVITY_TYPES))),
                ),
                Arc::new(AggregateRow::new(q(), "dashboard_stats", "matching_success")),
            ],
            fallback: 0,
        },
    );

    catalog.insert(
        MetricName::UnreadMessages,
        MetricDefinition {
            name: MetricName::UnreadMessages,
            value_window: ValueWindow::AllTime,
            trend_window: TrendWindow::Day,
            lower_is_better: true,
            per_subject: true,
            strategies: vec![
                Arc::new(
                    CollectionCount::new(q(), "messages")
                        .named("messages.unread")
                        .windowed_by(WindowField::Created)
                        .for_recipient()
                        .filtered(QueryIntent::Unread)
                        .degraded_cap(DEGRADED_UNREAD_CAP),
                ),
                Arc::new(
                    CollectionCount::new(q(), "notifications")
                        .named("notifications.unread")
                        .windowed_by(WindowField::Created)
                        .for_recipient()
                        .requiring(QueryIntent::Unread),
                ),
            ],
            fallback: 0,
        },
    );

    catalog
}
