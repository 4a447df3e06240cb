use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;
use crate::models::Row;

// ---------------------------------------------------------------------------
// Query types
// ---------------------------------------------------------------------------

/// Column predicate understood by every [`DataAccess`] backend.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Eq(String, Value),
    In(String, Vec<Value>),
    Gte(String, Value),
    Lte(String, Value),
    IsNull(String),
    And(Vec<Filter>),
    Or(Vec<Filter>),
}

impl Filter {
    pub fn eq(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Filter::Eq(column.into(), value.into())
    }

    pub fn gte(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Filter::Gte(column.into(), value.into())
    }

    pub fn lte(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Filter::Lte(column.into(), value.into())
    }

    pub fn is_null(column: impl Into<String>) -> Self {
        Filter::IsNull(column.into())
    }

    pub fn one_of<V: Into<Value>>(column: impl Into<String>, values: Vec<V>) -> Self {
        Filter::In(column.into(), values.into_iter().map(Into::into).collect())
    }

    /// Every column this predicate touches, nested ones included.
    pub fn columns(&self) -> Vec<&str> {
        match self {
            Filter::Eq(c, _) | Filter::In(c, _) | Filter::Gte(c, _) | Filter::Lte(c, _) => {
                vec![c.as_str()]
            }
            Filter::IsNull(c) => vec![c.as_str()],
            Filter::And(inner) | Filter::Or(inner) => {
                inner.iter().flat_map(|f| f.columns()).collect()
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sort {
    pub column: String,
    pub descending: bool,
}

impl Sort {
    pub fn desc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            descending: true,
        }
    }

    pub fn asc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            descending: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    pub filters: Vec<Filter>,
    pub sort: Option<Sort>,
    pub limit: Option<usize>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn sort(mut self, sort: Sort) -> Self {
        self.sort = Some(sort);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// The member on whose behalf the service is acting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: String,
}

// ---------------------------------------------------------------------------
// Store traits
// ---------------------------------------------------------------------------

/// Generic remote structured-data service with column-filter, sort, limit and
/// count operations.
///
/// Backends report a missing collection as `MatchError::DataUnavailable` and a
/// predicate on an unknown column as `MatchError::FieldUnavailable`.
#[async_trait]
pub trait DataAccess: Send + Sync {
    async fn read(&self, collection: &str, query: &Query) -> Result<Vec<Row>>;
    async fn count(&self, collection: &str, filters: &[Filter]) -> Result<u64>;
    async fn current_identity(&self) -> Result<Identity>;
}

/// Durable key-value storage for pairwise score entries.
#[async_trait]
pub trait ScoreStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;
    async fn put(&self, key: &str, value: &str) -> Result<()>;
    async fn remove(&self, key: &str) -> Result<bool>;
    /// Deletes every entry whose key starts with `prefix`.
    async fn remove_prefix(&self, prefix: &str) -> Result<u64>;
}
