use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::cache::{Clock, MetricCache, SingleFlight};
use crate::models::{AggregateMetric, Confidence, MetricName};

use super::{first_success, MetricContext, MetricDefinition};

/// Computes metrics through their strategy chains, behind a short-lived
/// cache and single-flight deduplication.
pub struct MetricAggregator {
    definitions: HashMap<MetricName, MetricDefinition>,
    cache: MetricCache,
    flight: SingleFlight<String, AggregateMetric>,
    clock: Arc<dyn Clock>,
    strategy_timeout: Duration,
}

impl MetricAggregator {
    pub fn new(
        definitions: HashMap<MetricName, MetricDefinition>,
        cache: MetricCache,
        clock: Arc<dyn Clock>,
        strategy_timeout: Duration,
    ) -> Self {
        Self {
            definitions,
            cache,
            flight: SingleFlight::new(),
            clock,
            strategy_timeout,
        }
    }

    pub fn definition(&self, name: MetricName) -> Option<&MetricDefinition> {
        self.definitions.get(&name)
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    pub fn cache(&self) -> &MetricCache {
        &self.cache
    }

    /// Never fails: when every strategy is exhausted the definition's
    /// fallback constant is returned with `Confidence::None`.
    pub async fn compute_metric(&self, name: MetricName, ctx: &MetricContext) -> AggregateMetric {
        let key = ctx.cache_key(name.as_str());
        if let Some(hit) = self.cache.get(&key) {
            tracing::debug!(metric = %name, key = %key, "Metric cache hit");
            return hit;
        }

        let Some(definition) = self.definitions.get(&name).cloned() else {
            tracing::warn!(metric = %name, "No definition registered, using fallback");
            return self.fallback(name.as_str(), 0);
        };

        let ctx = ctx.clone();
        let clock = self.clock.clone();
        let timeout = self.strategy_timeout;
        let ttl_secs = self.cache.ttl().as_secs();
        let metric = self
            .flight
            .run(key.clone(), move || async move {
                evaluate(&definition, &ctx, clock.as_ref(), timeout, ttl_secs).await
            })
            .await;

        self.cache.put(key, metric.clone());
        metric
    }

    fn fallback(&self, name: &str, value: i64) -> AggregateMetric {
        AggregateMetric {
            name: name.to_string(),
            value,
            computed_at: self.clock.now(),
            ttl_secs: self.cache.ttl().as_secs(),
            source_used: None,
            source_name: "fallback".to_string(),
            confidence: Confidence::None,
        }
    }
}

async fn evaluate(
    definition: &MetricDefinition,
    ctx: &MetricContext,
    clock: &dyn Clock,
    timeout: Duration,
    ttl_secs: u64,
) -> AggregateMetric {
    let name = definition.name.as_str();
    let outcome = first_success(name, &definition.strategies, ctx, timeout).await;

    match outcome {
        Some(outcome) => {
            let confidence = if outcome.index == 0 && !outcome.value.degraded {
                Confidence::High
            } else {
                Confidence::Low
            };
            AggregateMetric {
                name: name.to_string(),
                value: outcome.value.value,
                computed_at: clock.now(),
                ttl_secs,
                source_used: Some(outcome.index + 1),
                source_name: outcome.source_name,
                confidence,
            }
        }
        None => {
            tracing::warn!(
                metric = name,
                fallback = definition.fallback,
                "All metric strategies exhausted, using fallback"
            );
            AggregateMetric {
                name: name.to_string(),
                value: definition.fallback,
                computed_at: clock.now(),
                ttl_secs,
                source_used: None,
                source_name: "fallback".to_string(),
                confidence: Confidence::None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ManualClock;
    use crate::error::MatchError;
    use crate::metrics::strategy::testing::Canned;
    use crate::metrics::{MetricStrategy, StrategyValue, TrendWindow, ValueWindow};
    use chrono::{TimeZone, Utc};

    fn definition(strategies: Vec<Arc<dyn MetricStrategy>>) -> MetricDefinition {
        MetricDefinition {
            name: MetricName::TotalMembers,
            value_window: ValueWindow::AllTime,
            trend_window: TrendWindow::Month,
            lower_is_better: false,
            per_subject: false,
            strategies,
            fallback: 0,
        }
    }

    fn aggregator(strategies: Vec<Arc<dyn MetricStrategy>>) -> (MetricAggregator, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2024, 5, 10, 12, 0, 0).unwrap(),
        ));
        let mut definitions = HashMap::new();
        definitions.insert(MetricName::TotalMembers, definition(strategies));
        let cache = MetricCache::new(16, Duration::from_secs(30), clock.clone());
        (
            MetricAggregator::new(definitions, cache, clock.clone(), Duration::from_secs(1)),
            clock,
        )
    }

    #[tokio::test]
    async fn falls_through_to_third_strategy() {
        let (aggregator, _clock) = aggregator(vec![
            Canned::ok("profiles.count", || Err(MatchError::DataUnavailable("profiles".into()))),
            Canned::ok("users.count", || Err(MatchError::Backend("500".into()))),
            Canned::ok("messages.distinct_senders", || Ok(Some(StrategyValue::exact(42)))),
        ]);
        let metric = aggregator
            .compute_metric(MetricName::TotalMembers, &MetricContext::all_time())
            .await;
        assert_eq!(metric.value, 42);
        assert_eq!(metric.source_used, Some(3));
        assert_eq!(metric.confidence, Confidence::Low);
    }

    #[tokio::test]
    async fn first_undegraded_strategy_is_high_confidence() {
        let (aggregator, _clock) =
            aggregator(vec![Canned::ok("profiles.count", || Ok(Some(StrategyValue::exact(7))))]);
        let metric = aggregator
            .compute_metric(MetricName::TotalMembers, &MetricContext::all_time())
            .await;
        assert_eq!(metric.confidence, Confidence::High);
        assert_eq!(metric.source_used, Some(1));
    }

    #[tokio::test]
    async fn degraded_first_strategy_is_low_confidence() {
        let (aggregator, _clock) = aggregator(vec![Canned::ok("messages.unread", || {
            Ok(Some(StrategyValue {
                value: 99,
                degraded: true,
            }))
        })]);
        let metric = aggregator
            .compute_metric(MetricName::TotalMembers, &MetricContext::all_time())
            .await;
        assert_eq!(metric.confidence, Confidence::Low);
    }

    #[tokio::test]
    async fn total_failure_returns_fallback() {
        let (aggregator, _clock) = aggregator(vec![
            Canned::ok("a", || Err(MatchError::DataUnavailable("a".into()))),
            Canned::ok("b", || Ok(None)),
        ]);
        let metric = aggregator
            .compute_metric(MetricName::TotalMembers, &MetricContext::all_time())
            .await;
        assert_eq!(metric.value, 0);
        assert_eq!(metric.source_used, None);
        assert_eq!(metric.confidence, Confidence::None);
    }

    #[tokio::test]
    async fn unregistered_metric_is_fallback() {
        let (aggregator, _clock) = aggregator(vec![]);
        let metric = aggregator
            .compute_metric(MetricName::MonthlyEvents, &MetricContext::all_time())
            .await;
        assert_eq!(metric.name, "monthly_events");
        assert_eq!(metric.confidence, Confidence::None);
    }
}
