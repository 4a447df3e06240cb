//! Concrete metric strategies backed by the schema-adaptive query builder.

use std::collections::HashSet;

use async_trait::async_trait;

use crate::db::{Query, Sort};
use crate::error::Result;
use crate::models::{row_f64, row_string, SENDER_COLUMNS};
use crate::schema::{QueryBuilder, QueryIntent};

use super::{MetricContext, MetricStrategy, Period, StrategyValue, TimeWindow};

/// Upper bound on rows scanned when a count has to be derived client-side.
pub const DISTINCT_SCAN_LIMIT: usize = 10_000;

/// Which column family a windowed count filters on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowField {
    EventDate,
    MatchDate,
    Created,
}

impl WindowField {
    fn intent(&self, window: TimeWindow) -> QueryIntent {
        let TimeWindow { from, to } = window;
        match self {
            Self::EventDate => QueryIntent::EventDateRange { from, to },
            Self::MatchDate => QueryIntent::MatchDateRange { from, to },
            Self::Created => QueryIntent::CreatedRange { from, to },
        }
    }
}

/// Row count of one collection, filtered by intents resolved against the
/// detected schema.
pub struct CollectionCount {
    name: String,
    collection: &'static str,
    queries: QueryBuilder,
    window_field: Option<WindowField>,
    recipient_scoped: bool,
    fixed: Vec<QueryIntent>,
    required: Vec<&'static str>,
    degraded_cap: Option<i64>,
}

impl CollectionCount {
    pub fn new(queries: QueryBuilder, collection: &'static str) -> Self {
        Self {
            name: format!("{collection}.count"),
            collection,
            queries,
            window_field: None,
            recipient_scoped: false,
            fixed: Vec::new(),
            required: Vec::new(),
            degraded_cap: None,
        }
    }

    pub fn windowed_by(mut self, field: WindowField) -> Self {
        self.window_field = Some(field);
        self
    }

    /// Restricts the count to rows addressed to the context subject. The
    /// recipient column is mandatory.
    pub fn for_recipient(mut self) -> Self {
        self.recipient_scoped = true;
        self.required.push("recipient");
        self
    }

    pub fn filtered(mut self, intent: QueryIntent) -> Self {
        self.fixed.push(intent);
        self
    }

    /// Like [`filtered`](Self::filtered), but the strategy yields nothing
    /// when no column for the intent exists.
    pub fn requiring(mut self, intent: QueryIntent) -> Self {
        self.required.push(intent.name());
        self.fixed.push(intent);
        self
    }

    /// Clamps the value when any filter had to be dropped.
    pub fn degraded_cap(mut self, cap: i64) -> Self {
        self.degraded_cap = Some(cap);
        self
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    fn intents(&self, ctx: &MetricContext) -> Option<Vec<QueryIntent>> {
        let mut intents = self.fixed.clone();
        if let Some(window) = ctx.period.window() {
            intents.push(self.window_field?.intent(window));
        }
        if self.recipient_scoped {
            intents.push(QueryIntent::Recipient(ctx.subject_id.clone()?));
        }
        Some(intents)
    }
}

#[async_trait]
impl MetricStrategy for CollectionCount {
    fn name(&self) -> &str {
        &self.name
    }

    async fn evaluate(&self, ctx: &MetricContext) -> Result<Option<StrategyValue>> {
        let Some(intents) = self.intents(ctx) else {
            return Ok(None);
        };

        if !self.required.is_empty() {
            if let crate::schema::QueryPlan::Ready(plan) =
                self.queries.build_query_all(self.collection, &intents).await
            {
                if let Some(missing) = self.required.iter().find(|r| plan.is_unavailable(r)) {
                    tracing::debug!(
                        collection = self.collection,
                        intent = *missing,
                        "Required filter unavailable"
                    );
                    return Ok(None);
                }
            }
        }

        let counted = self.queries.count(self.collection, &intents, &[]).await?;
        let mut value = counted.value as i64;
        if counted.degraded {
            if let Some(cap) = self.degraded_cap {
                value = value.min(cap);
            }
        }
        Ok(Some(StrategyValue {
            value,
            degraded: counted.degraded,
        }))
    }
}

/// Number of distinct senders in the interaction log. All-time only.
pub struct DistinctActorCount {
    name: String,
    collection: &'static str,
    queries: QueryBuilder,
}

impl DistinctActorCount {
    pub fn new(queries: QueryBuilder, collection: &'static str) -> Self {
        Self {
            name: format!("{collection}.distinct_senders"),
            collection,
            queries,
        }
    }
}

#[async_trait]
impl MetricStrategy for DistinctActorCount {
    fn name(&self) -> &str {
        &self.name
    }

    async fn evaluate(&self, ctx: &MetricContext) -> Result<Option<StrategyValue>> {
        if ctx.period != Period::AllTime {
            return Ok(None);
        }
        let rows = self
            .queries
            .read(
                self.collection,
                &[],
                &Query::new().limit(DISTINCT_SCAN_LIMIT),
            )
            .await?;
        let senders: HashSet<String> = rows
            .value
            .iter()
            .filter_map(|row| row_string(row, SENDER_COLUMNS))
            .collect();
        if senders.is_empty() {
            return Ok(None);
        }
        Ok(Some(StrategyValue {
            value: senders.len() as i64,
            // A truncated scan undercounts.
            degraded: rows.value.len() >= DISTINCT_SCAN_LIMIT,
        }))
    }
}

/// Reads a precomputed value from the most recent row of an aggregate
/// collection.
pub struct AggregateRow {
    name: String,
    collection: &'static str,
    column: &'static str,
    queries: QueryBuilder,
    current_period_ok: bool,
}

impl AggregateRow {
    pub fn new(queries: QueryBuilder, collection: &'static str, column: &'static str) -> Self {
        Self {
            name: format!("{collection}.{column}"),
            collection,
            column,
            queries,
            current_period_ok: false,
        }
    }

    /// The stored value also describes the current period, not only all time.
    pub fn current_period(mut self) -> Self {
        self.current_period_ok = true;
        self
    }
}

#[async_trait]
impl MetricStrategy for AggregateRow {
    fn name(&self) -> &str {
        &self.name
    }

    async fn evaluate(&self, ctx: &MetricContext) -> Result<Option<StrategyValue>> {
        let applies = match ctx.period {
            Period::AllTime => !self.current_period_ok,
            Period::Current(_) => self.current_period_ok,
            Period::Previous(_) => false,
        };
        if !applies {
            return Ok(None);
        }

        let rows = self
            .queries
            .read(
                self.collection,
                &[],
                &Query::new().sort(Sort::desc("updated_at")).limit(1),
            )
            .await?;
        Ok(rows
            .value
            .first()
            .and_then(|row| row_f64(row, &[self.column]))
            .map(|v| StrategyValue::exact(v.round() as i64)))
    }
}
