use std::sync::Arc;
use std::time::Duration;

use crate::cache::{Clock, MetricCache, ScoreCache};
use crate::config::Config;
use crate::db::{DataAccess, ScoreStore};
use crate::metrics::{default_catalog, MetricAggregator};
use crate::schema::{QueryBuilder, SchemaDetector};
use crate::scoring::{BaselineHeuristic, ScoreAggregator};
use crate::services::{DashboardService, MatchingService};
use crate::signals::{default_extractors, InteractionSource};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    /// Remote data service, already wrapped in its timeout layer.
    pub data: Arc<dyn DataAccess>,
    pub schema: Arc<SchemaDetector>,
    pub matching: Arc<MatchingService>,
    pub dashboard: Arc<DashboardService>,
}

impl AppState {
    /// Wires every service over one data backend, one score store and one
    /// clock.
    pub fn new(
        config: Config,
        data: Arc<dyn DataAccess>,
        score_store: Arc<dyn ScoreStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let config = Arc::new(config);
        let schema = Arc::new(SchemaDetector::new(data.clone(), clock.clone()));
        let queries = QueryBuilder::new(schema.clone());

        let matching_config = &config.matching;
        let scorer = ScoreAggregator::new(
            default_extractors(&queries, matching_config),
            BaselineHeuristic::new(InteractionSource::new(queries.clone())),
            matching_config.weight_preset,
            Duration::from_millis(matching_config.signal_timeout_ms),
        );
        let score_cache = ScoreCache::new(
            score_store,
            Duration::from_secs(matching_config.score_ttl_secs),
            clock.clone(),
        );
        let matching = MatchingService::new(
            Arc::new(scorer),
            Arc::new(score_cache),
            matching_config.max_concurrency,
        );

        let metrics_config = &config.metrics;
        let aggregator = MetricAggregator::new(
            default_catalog(&queries),
            MetricCache::new(
                metrics_config.cache_capacity,
                Duration::from_secs(metrics_config.cache_ttl_secs),
                clock.clone(),
            ),
            clock,
            Duration::from_millis(metrics_config.strategy_timeout_ms),
        );
        let dashboard = DashboardService::new(Arc::new(aggregator), data.clone());

        Self {
            config,
            data,
            schema,
            matching: Arc::new(matching),
            dashboard: Arc::new(dashboard),
        }
    }
}
