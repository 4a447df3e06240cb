use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::db::traits::{DataAccess, Filter, Identity, Query};
use crate::error::{MatchError, Result};
use crate::models::Row;

/// Bounds every call on the wrapped backend, turning overruns into
/// `MatchError::Timeout`.
pub struct TimeoutLayer {
    inner: Arc<dyn DataAccess>,
    timeout: Duration,
}

impl TimeoutLayer {
    pub fn new(inner: Arc<dyn DataAccess>, timeout: Duration) -> Self {
        Self { inner, timeout }
    }

    async fn bounded<T>(&self, fut: impl std::future::Future<Output = Result<T>>) -> Result<T> {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(MatchError::Timeout(self.timeout)),
        }
    }
}

#[async_trait]
impl DataAccess for TimeoutLayer {
    async fn read(&self, collection: &str, query: &Query) -> Result<Vec<Row>> {
        self.bounded(self.inner.read(collection, query)).await
    }

    async fn count(&self, collection: &str, filters: &[Filter]) -> Result<u64> {
        self.bounded(self.inner.count(collection, filters)).await
    }

    async fn current_identity(&self) -> Result<Identity> {
        self.bounded(self.inner.current_identity()).await
    }
}
