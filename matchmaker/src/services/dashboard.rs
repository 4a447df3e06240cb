use std::sync::Arc;

use crate::db::DataAccess;
use crate::metrics::{
    compute_delta, day_window, month_window, MetricAggregator, MetricContext, Period, TimeWindow,
    TrendWindow, ValueWindow,
};
use crate::models::{Confidence, DashboardMetric, MetricDelta, MetricName, TrendLabel};

/// Dashboard figures with their period-over-period trend.
pub struct DashboardService {
    aggregator: Arc<MetricAggregator>,
    data: Arc<dyn DataAccess>,
}

impl DashboardService {
    pub fn new(aggregator: Arc<MetricAggregator>, data: Arc<dyn DataAccess>) -> Self {
        Self { aggregator, data }
    }

    pub fn aggregator(&self) -> &Arc<MetricAggregator> {
        &self.aggregator
    }

    /// Never fails. Per-member metrics default to the signed-in identity;
    /// without one their strategies do not apply and the fallback is used.
    pub async fn get_dashboard_metric(
        &self,
        name: MetricName,
        subject_id: Option<&str>,
    ) -> DashboardMetric {
        let (value_window, trend_window, lower_is_better, per_subject) =
            match self.aggregator.definition(name) {
                Some(d) => (d.value_window, d.trend_window, d.lower_is_better, d.per_subject),
                None => (ValueWindow::AllTime, TrendWindow::Month, false, false),
            };

        let subject = if per_subject {
            self.resolve_subject(subject_id).await
        } else {
            None
        };

        let now = self.aggregator.clock().now();
        let (current, previous) = trend_windows(trend_window, now);
        let base = MetricContext::all_time().with_subject(subject);
        let value_ctx = match value_window {
            ValueWindow::AllTime => base.clone(),
            ValueWindow::CurrentMonth => base.clone().with_period(Period::Current(month_window(now, 0))),
        };

        let current_ctx = base.clone().with_period(Period::Current(current));
        let previous_ctx = base.clone().with_period(Period::Previous(previous));
        let (value, current, previous) = tokio::join!(
            self.aggregator.compute_metric(name, &value_ctx),
            self.aggregator.compute_metric(name, &current_ctx),
            self.aggregator.compute_metric(name, &previous_ctx)
        );

        // Periods read from different sources are not comparable.
        let comparable =
            current.source_used.is_some() && current.source_used == previous.source_used;
        let (delta, confidence) = if comparable {
            (
                compute_delta(current.value, previous.value, lower_is_better),
                value.confidence,
            )
        } else {
            tracing::warn!(
                metric = %name,
                current_source = %current.source_name,
                previous_source = %previous.source_name,
                "Trend periods resolved to different sources, reporting no change"
            );
            (unchanged(), value.confidence.min(Confidence::Low))
        };
        tracing::debug!(
            metric = %name,
            value = value.value,
            current = current.value,
            previous = previous.value,
            delta_percent = delta.delta_percent,
            "Dashboard metric computed"
        );

        DashboardMetric {
            name: name.as_str().to_string(),
            value: value.value,
            delta: delta.delta,
            delta_percent: delta.delta_percent,
            trend_label: delta.trend_label,
            source_used: value.source_used,
            source_name: value.source_name,
            confidence,
        }
    }

    async fn resolve_subject(&self, explicit: Option<&str>) -> Option<String> {
        if let Some(id) = explicit.map(str::trim).filter(|id| !id.is_empty()) {
            return Some(id.to_string());
        }
        match self.data.current_identity().await {
            Ok(identity) => Some(identity.id),
            Err(e) => {
                tracing::warn!(error = %e, "No identity for per-member metric");
                None
            }
        }
    }
}

fn unchanged() -> MetricDelta {
    MetricDelta {
        delta: 0,
        delta_percent: 0,
        trend_label: TrendLabel::Neutral,
    }
}

fn trend_windows(trend: TrendWindow, now: chrono::DateTime<chrono::Utc>) -> (TimeWindow, TimeWindow) {
    match trend {
        TrendWindow::Month => (month_window(now, 0), month_window(now, -1)),
        TrendWindow::Day => (day_window(now, 0), day_window(now, -1)),
    }
}
