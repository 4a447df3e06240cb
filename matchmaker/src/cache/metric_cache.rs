use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use lru::LruCache;

use super::Clock;
use crate::models::AggregateMetric;

struct CachedMetric {
    metric: AggregateMetric,
    stored_at: DateTime<Utc>,
}

/// Short-lived read-through cache for dashboard aggregates.
///
/// Entries are bounded by an LRU capacity and expire `ttl` after they were
/// stored; an expired entry is evicted on the read that finds it.
#[derive(Clone)]
pub struct MetricCache {
    entries: Arc<Mutex<LruCache<String, CachedMetric>>>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl MetricCache {
    pub fn new(capacity: usize, ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Arc::new(Mutex::new(LruCache::new(capacity))),
            ttl,
            clock,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn get(&self, key: &str) -> Option<AggregateMetric> {
        let now = self.clock.now();
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let expired = match entries.get(key) {
            Some(entry) => is_expired(entry.stored_at, now, self.ttl),
            None => return None,
        };
        if expired {
            entries.pop(key);
            tracing::debug!(key, "Metric cache entry expired");
            return None;
        }
        entries.get(key).map(|entry| entry.metric.clone())
    }

    pub fn put(&self, key: impl Into<String>, metric: AggregateMetric) {
        let stored_at = self.clock.now();
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .put(key.into(), CachedMetric { metric, stored_at });
    }

    pub fn invalidate(&self, key: &str) -> bool {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).pop(key).is_some()
    }

    pub fn clear(&self) {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).clear();
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn is_expired(stored_at: DateTime<Utc>, now: DateTime<Utc>, ttl: Duration) -> bool {
    match chrono::Duration::from_std(ttl) {
        Ok(ttl) => now >= stored_at + ttl,
        Err(_) => false,
    }
}
