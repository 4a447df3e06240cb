// Common test utilities for integration tests
#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Once};

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};

use matchmaker::api::AppState;
use matchmaker::cache::{Clock, ManualClock};
use matchmaker::config::Config;
use matchmaker::db::{DataAccess, Filter, Identity, MemoryScoreStore, Query, ScoreStore};
use matchmaker::error::{MatchError, Result};
use matchmaker::models::Row;
use matchmaker::scoring::WeightPreset;

static INIT: Once = Once::new();

/// Initialize tracing subscriber once for tests
pub fn init_test_logger() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .try_init();
    });
}

// Re-export commonly used crates for convenience
pub use serial_test::serial;
pub use tempfile;
pub use wiremock;

/// Wraps a backend and counts every call that reaches it.
pub struct CountingDataAccess {
    inner: Arc<dyn DataAccess>,
    calls: AtomicUsize,
}

impl CountingDataAccess {
    pub fn new(inner: impl DataAccess + 'static) -> Self {
        Self {
            inner: Arc::new(inner),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DataAccess for CountingDataAccess {
    async fn read(&self, collection: &str, query: &Query) -> Result<Vec<Row>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.read(collection, query).await
    }

    async fn count(&self, collection: &str, filters: &[Filter]) -> Result<u64> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.count(collection, filters).await
    }

    async fn current_identity(&self) -> Result<Identity> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.current_identity().await
    }
}

/// Wraps a backend that can be taken down; while down, every read and count
/// fails as if the service were unreachable.
pub struct SwitchableDataAccess {
    inner: Arc<dyn DataAccess>,
    down: AtomicBool,
}

impl SwitchableDataAccess {
    pub fn new(inner: impl DataAccess + 'static) -> Self {
        Self {
            inner: Arc::new(inner),
            down: AtomicBool::new(false),
        }
    }

    pub fn set_down(&self, down: bool) {
        self.down.store(down, Ordering::SeqCst);
    }

    fn check(&self) -> Result<()> {
        if self.down.load(Ordering::SeqCst) {
            return Err(MatchError::Backend("connection refused".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl DataAccess for SwitchableDataAccess {
    async fn read(&self, collection: &str, query: &Query) -> Result<Vec<Row>> {
        self.check()?;
        self.inner.read(collection, query).await
    }

    async fn count(&self, collection: &str, filters: &[Filter]) -> Result<u64> {
        self.check()?;
        self.inner.count(collection, filters).await
    }

    async fn current_identity(&self) -> Result<Identity> {
        self.inner.current_identity().await
    }
}

/// Fixed starting instant shared by the fixtures below.
pub fn test_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 20, 12, 0, 0).unwrap()
}

pub fn manual_clock() -> Arc<ManualClock> {
    Arc::new(ManualClock::new(test_now()))
}

/// Environment-independent configuration on the four-signal preset.
pub fn test_config() -> Config {
    let mut config = Config::default();
    config.backend.url = None;
    config.matching.weight_preset = WeightPreset::Simple;
    config.matching.max_concurrency = 4;
    config
}

pub fn state_with(
    data: Arc<dyn DataAccess>,
    store: Arc<dyn ScoreStore>,
    clock: Arc<ManualClock>,
) -> AppState {
    let clock: Arc<dyn Clock> = clock;
    AppState::new(test_config(), data, store, clock)
}

pub fn state(data: Arc<dyn DataAccess>, clock: Arc<ManualClock>) -> AppState {
    state_with(data, Arc::new(MemoryScoreStore::new()), clock)
}

pub fn ids(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}
