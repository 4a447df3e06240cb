//! Multi-source metric aggregation.
//!
//! Each metric is an ordered list of independently fallible strategies
//! evaluated by [`first_success`]; the aggregator caches results briefly and
//! shares in-flight computations between concurrent callers.

mod aggregator;
mod catalog;
mod delta;
pub mod sources;
pub(crate) mod strategy;

pub use aggregator::MetricAggregator;
pub use catalog::{
    default_catalog, MetricDefinition, TrendWindow, ValueWindow, DEGRADED_UNREAD_CAP,
};
pub use delta::{compute_delta, day_window, month_window};
pub use strategy::{
    first_success, MetricContext, MetricStrategy, Period, StrategyOutcome, StrategyValue,
    TimeWindow,
};
