mod common;

use std::sync::Arc;

use chrono::Duration;
use pretty_assertions::assert_eq;
use serde_json::json;

use matchmaker::db::{DataAccess, MemoryDataAccess};
use matchmaker::metrics::MetricContext;
use matchmaker::models::{Confidence, MetricName, TrendLabel};

use common::{init_test_logger, manual_clock, state, CountingDataAccess};

// ── Strategy chains ───────────────────────────────────────────────────────

#[tokio::test]
async fn falls_through_to_third_source() {
    init_test_logger();
    // No `profiles` or `users`; 42 distinct senders in the message log.
    let messages = (0..42)
        .map(|i| json!({"sender_id": format!("m{i}"), "content": "hi"}))
        .collect();
    let data = MemoryDataAccess::new().with_collection("messages", messages);
    let state = state(Arc::new(data), manual_clock());

    let metric = state
        .dashboard
        .aggregator()
        .compute_metric(MetricName::TotalMembers, &MetricContext::all_time())
        .await;
    assert_eq!(metric.value, 42);
    assert_eq!(metric.source_used, Some(3));
    assert_eq!(metric.source_name, "messages.distinct_senders");
    assert_eq!(metric.confidence, Confidence::Low);
}

#[tokio::test]
async fn every_source_missing_yields_fallback() {
    init_test_logger();
    let state = state(Arc::new(MemoryDataAccess::new()), manual_clock());

    let metric = state
        .dashboard
        .get_dashboard_metric(MetricName::MatchingSuccess, None)
        .await;
    assert_eq!(metric.value, 0);
    assert_eq!(metric.source_used, None);
    assert_eq!(metric.source_name, "fallback");
    assert_eq!(metric.confidence, Confidence::None);
}

#[tokio::test]
async fn adapts_to_renamed_columns() {
    init_test_logger();
    // `receiver_id`/`read_at` instead of `recipient_id`/`is_read`.
    let messages = vec![
        json!({"from_user_id": "a", "receiver_id": "me", "read_at": null, "created_at": "2024-05-20T08:00:00Z"}),
        json!({"from_user_id": "b", "receiver_id": "me", "read_at": null, "created_at": "2024-05-19T08:00:00Z"}),
        json!({"from_user_id": "c", "receiver_id": "me", "read_at": "2024-05-19T09:00:00Z", "created_at": "2024-05-19T08:30:00Z"}),
        json!({"from_user_id": "a", "receiver_id": "other", "read_at": null, "created_at": "2024-05-20T08:00:00Z"}),
    ];
    let data = MemoryDataAccess::new().with_collection("messages", messages);
    let state = state(Arc::new(data), manual_clock());

    let metric = state
        .dashboard
        .get_dashboard_metric(MetricName::UnreadMessages, Some("me"))
        .await;
    assert_eq!(metric.value, 2);
    assert_eq!(metric.source_used, Some(1));
    assert_eq!(metric.confidence, Confidence::High);
    // One unread today, one yesterday.
    assert_eq!(metric.delta, 0);
    assert_eq!(metric.trend_label, TrendLabel::Neutral);
}

// ── Trends ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn events_rise_from_zero_to_five() {
    init_test_logger();
    let events = (1..=5)
        .map(|day| json!({"id": day, "event_date": format!("2024-05-{:02}T19:00:00Z", day)}))
        .collect();
    let data = MemoryDataAccess::new().with_collection("events", events);
    let state = state(Arc::new(data), manual_clock());

    let metric = state
        .dashboard
        .get_dashboard_metric(MetricName::MonthlyEvents, None)
        .await;
    assert_eq!(metric.value, 5);
    assert_eq!(metric.delta, 5);
    assert_eq!(metric.delta_percent, 100);
    assert_eq!(metric.trend_label, TrendLabel::Positive);
}

// ── Caching ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn metric_cache_expires_after_thirty_seconds() {
    init_test_logger();
    let data = Arc::new(CountingDataAccess::new(
        MemoryDataAccess::new().with_collection("profiles", vec![json!({"id": "a"})]),
    ));
    let clock = manual_clock();
    let state = state(data.clone() as Arc<dyn DataAccess>, clock.clone());
    let aggregator = state.dashboard.aggregator();
    let ctx = MetricContext::all_time();

    let first = aggregator.compute_metric(MetricName::TotalMembers, &ctx).await;
    assert_eq!(first.value, 1);
    assert_eq!(first.ttl_secs, 30);
    let reads = data.calls();

    clock.advance(Duration::seconds(30) - Duration::milliseconds(1));
    aggregator.compute_metric(MetricName::TotalMembers, &ctx).await;
    assert_eq!(data.calls(), reads);

    clock.advance(Duration::milliseconds(2));
    let refreshed = aggregator.compute_metric(MetricName::TotalMembers, &ctx).await;
    // One count; detected schemas stay cached.
    assert_eq!(data.calls(), reads + 1);
    assert_eq!(
        refreshed.computed_at,
        first.computed_at + Duration::seconds(30) + Duration::milliseconds(1)
    );

    aggregator.compute_metric(MetricName::TotalMembers, &ctx).await;
    assert_eq!(data.calls(), reads + 1);
}

#[tokio::test]
async fn concurrent_dashboard_reads_share_one_computation() {
    init_test_logger();
    let data = Arc::new(CountingDataAccess::new(
        MemoryDataAccess::new().with_collection("profiles", vec![json!({"id": "a"})]),
    ));
    let state = state(data.clone() as Arc<dyn DataAccess>, manual_clock());
    let aggregator = state.dashboard.aggregator();
    let ctx = MetricContext::all_time();

    let results = futures::future::join_all(
        (0..8).map(|_| aggregator.compute_metric(MetricName::TotalMembers, &ctx)),
    )
    .await;
    assert!(results.iter().all(|m| m.value == 1));

    // One schema detection and one count, shared by all eight callers.
    assert_eq!(data.calls(), 2);
}
