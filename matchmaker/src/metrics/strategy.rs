use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};

use crate::error::{MatchError, Result};

/// Inclusive `[from, to]` interval in UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimeWindow {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Period {
    AllTime,
    /// The window containing "now".
    Current(TimeWindow),
    Previous(TimeWindow),
}

impl Period {
    pub fn window(&self) -> Option<TimeWindow> {
        match self {
            Period::AllTime => None,
            Period::Current(w) | Period::Previous(w) => Some(*w),
        }
    }

    fn label(&self) -> String {
        match self.window() {
            None => "all".to_string(),
            Some(w) => format!(
                "{}..{}",
                w.from.to_rfc3339_opts(SecondsFormat::Secs, true),
                w.to.to_rfc3339_opts(SecondsFormat::Secs, true)
            ),
        }
    }
}

/// Inputs shared by every strategy evaluating one metric.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MetricContext {
    pub period: Period,
    pub subject_id: Option<String>,
}

impl MetricContext {
    pub fn all_time() -> Self {
        Self {
            period: Period::AllTime,
            subject_id: None,
        }
    }

    pub fn with_period(mut self, period: Period) -> Self {
        self.period = period;
        self
    }

    pub fn with_subject(mut self, subject_id: Option<String>) -> Self {
        self.subject_id = subject_id;
        self
    }

    pub fn cache_key(&self, metric: &str) -> String {
        format!(
            "{metric}|{}|{}",
            self.subject_id.as_deref().unwrap_or("-"),
            self.period.label()
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StrategyValue {
    pub value: i64,
    /// Produced by a query that dropped at least one filter.
    pub degraded: bool,
}

impl StrategyValue {
    pub fn exact(value: i64) -> Self {
        Self {
            value,
            degraded: false,
        }
    }
}

/// One way of computing a metric. `Ok(None)` means the strategy does not
/// apply to this context and the next one should be tried.
#[async_trait]
pub trait MetricStrategy: Send + Sync {
    fn name(&self) -> &str;
    async fn evaluate(&self, ctx: &MetricContext) -> Result<Option<StrategyValue>>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StrategyOutcome {
    pub value: StrategyValue,
    /// 0-based position of the winning strategy.
    pub index: usize,
    pub source_name: String,
}

/// Evaluates `strategies` in order, each bounded by `timeout`, and returns
/// the first value produced. Failures are logged and skipped.
pub async fn first_success(
    metric: &str,
    strategies: &[Arc<dyn MetricStrategy>],
    ctx: &MetricContext,
    timeout: Duration,
) -> Option<StrategyOutcome> {
    for (index, strategy) in strategies.iter().enumerate() {
        let result = match tokio::time::timeout(timeout, strategy.evaluate(ctx)).await {
            Ok(result) => result,
            Err(_) => Err(MatchError::Timeout(timeout)),
        };

        match result {
            Ok(Some(value)) => {
                tracing::debug!(
                    metric,
                    strategy = strategy.name(),
                    value = value.value,
                    degraded = value.degraded,
                    "Metric strategy succeeded"
                );
                return Some(StrategyOutcome {
                    value,
                    index,
                    source_name: strategy.name().to_string(),
                });
            }
            Ok(None) => {
                tracing::debug!(metric, strategy = strategy.name(), "Metric strategy not applicable");
            }
            Err(e) if e.is_recoverable() => {
                tracing::warn!(
                    metric,
                    strategy = strategy.name(),
                    error = %e,
                    "Metric strategy failed, trying next"
                );
            }
            Err(e) => {
                tracing::error!(
                    metric,
                    strategy = strategy.name(),
                    error = %e,
                    "Metric strategy failed unexpectedly, trying next"
                );
            }
        }
    }
    None
}
