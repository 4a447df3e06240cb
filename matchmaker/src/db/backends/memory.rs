//! In-process [`DataAccess`] backend.
//!
//! Mirrors the failure semantics of a hosted structured-data service so the
//! fallback paths can be exercised offline: an unknown collection yields
//! `DataUnavailable`, a predicate or sort on a column that no row carries
//! yields `FieldUnavailable`.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::Path;
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use crate::db::traits::{DataAccess, Filter, Identity, Query, ScoreStore};
use crate::error::{MatchError, Result};
use crate::models::{parse_timestamp, Row};

#[derive(Debug, Deserialize)]
struct Fixture {
    identity: Option<String>,
    #[serde(default)]
    collections: HashMap<String, Vec<Row>>,
}

#[derive(Default)]
pub struct MemoryDataAccess {
    collections: RwLock<HashMap<String, Vec<Row>>>,
    identity: RwLock<Option<Identity>>,
}

impl MemoryDataAccess {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads `{"identity": "...", "collections": {"name": [rows]}}` from disk.
    pub fn from_fixture(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let fixture: Fixture = serde_json::from_str(&raw)?;
        let backend = Self::new();
        for (name, rows) in fixture.collections {
            backend.put_collection(&name, rows);
        }
        if let Some(id) = fixture.identity {
            backend.set_identity(id);
        }
        tracing::info!(
            path = %path.as_ref().display(),
            collections = backend.collection_names().len(),
            "Loaded in-memory fixture"
        );
        Ok(backend)
    }

    pub fn with_collection(self, name: &str, rows: Vec<Value>) -> Self {
        let rows = rows
            .into_iter()
            .filter_map(|value| match value {
                Value::Object(map) => Some(map),
                _ => None,
            })
            .collect();
        self.put_collection(name, rows);
        self
    }

    pub fn with_identity(self, id: impl Into<String>) -> Self {
        self.set_identity(id);
        self
    }

    pub fn put_collection(&self, name: &str, rows: Vec<Row>) {
        self.collections
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.to_string(), rows);
    }

    pub fn insert(&self, name: &str, row: Row) {
        self.collections
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(name.to_string())
            .or_default()
            .push(row);
    }

    pub fn drop_collection(&self, name: &str) -> bool {
        self.collections
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(name)
            .is_some()
    }

    pub fn set_identity(&self, id: impl Into<String>) {
        *self.identity.write().unwrap_or_else(PoisonError::into_inner) =
            Some(Identity { id: id.into() });
    }

    pub fn collection_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .collections
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }

    fn matching_rows(&self, collection: &str, filters: &[Filter]) -> Result<Vec<Row>> {
        let collections = self.collections.read().unwrap_or_else(PoisonError::into_inner);
        let rows = collections
            .get(collection)
            .ok_or_else(|| MatchError::DataUnavailable(collection.to_string()))?;

        let known = known_columns(rows);
        for filter in filters {
            ensure_columns(collection, &known, filter.columns())?;
        }

        Ok(rows
            .iter()
            .filter(|row| filters.iter().all(|f| evaluate(f, row)))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl DataAccess for MemoryDataAccess {
    async fn read(&self, collection: &str, query: &Query) -> Result<Vec<Row>> {
        let mut rows = self.matching_rows(collection, &query.filters)?;

        if let Some(sort) = &query.sort {
            {
                let collections = self.collections.read().unwrap_or_else(PoisonError::into_inner);
                if let Some(all) = collections.get(collection) {
                    ensure_columns(collection, &known_columns(all), vec![sort.column.as_str()])?;
                }
            }
            rows.sort_by(|a, b| {
                let ordering = compare_nulls_last(a.get(&sort.column), b.get(&sort.column));
                if sort.descending {
                    ordering.reverse()
                } else {
                    ordering
                }
            });
        }

        if let Some(limit) = query.limit {
            rows.truncate(limit);
        }

        Ok(rows)
    }

    async fn count(&self, collection: &str, filters: &[Filter]) -> Result<u64> {
        Ok(self.matching_rows(collection, filters)?.len() as u64)
    }

    async fn current_identity(&self) -> Result<Identity> {
        self.identity
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or_else(|| MatchError::Backend("No signed-in identity".to_string()))
    }
}

/// Process-local [`ScoreStore`], used when the durable cache is configured as
/// `:memory:` and in tests.
#[derive(Default)]
pub struct MemoryScoreStore {
    entries: RwLock<BTreeMap<String, String>>,
}

impl MemoryScoreStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ScoreStore for MemoryScoreStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.read().unwrap_or_else(PoisonError::into_inner).get(key).cloned())
    }

    async fn put(&self, key: &str, value: &str) -> Result<()> {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<bool> {
        Ok(self
            .entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key)
            .is_some())
    }

    async fn remove_prefix(&self, prefix: &str) -> Result<u64> {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let before = entries.len();
        entries.retain(|key, _| !key.starts_with(prefix));
        Ok((before - entries.len()) as u64)
    }
}

fn known_columns(rows: &[Row]) -> BTreeSet<&str> {
    rows.iter()
        .flat_map(|row| row.keys().map(String::as_str))
        .collect()
}

fn ensure_columns(collection: &str, known: &BTreeSet<&str>, columns: Vec<&str>) -> Result<()> {
    // An empty collection exposes no columns, so there is nothing to check against.
    if known.is_empty() {
        return Ok(());
    }
    match columns.into_iter().find(|c| !known.contains(c)) {
        Some(missing) => Err(MatchError::field_unavailable(collection, missing)),
        None => Ok(()),
    }
}

fn evaluate(filter: &Filter, row: &Row) -> bool {
    match filter {
        Filter::Eq(column, expected) => match row.get(column) {
            None | Some(Value::Null) => expected.is_null(),
            Some(actual) => loosely_equal(actual, expected),
        },
        Filter::In(column, options) => row
            .get(column)
            .is_some_and(|actual| options.iter().any(|o| loosely_equal(actual, o))),
        Filter::Gte(column, bound) => row
            .get(column)
            .and_then(|actual| compare(actual, bound))
            .is_some_and(|o| o != Ordering::Less),
        Filter::Lte(column, bound) => row
            .get(column)
            .and_then(|actual| compare(actual, bound))
            .is_some_and(|o| o != Ordering::Greater),
        Filter::IsNull(column) => row.get(column).map_or(true, Value::is_null),
        Filter::And(inner) => inner.iter().all(|f| evaluate(f, row)),
        Filter::Or(inner) => inner.iter().any(|f| evaluate(f, row)),
    }
}

fn loosely_equal(a: &Value, b: &Value) -> bool {
    if a == b {
        return true;
    }
    match (a, b) {
        (Value::Number(n), Value::String(s)) | (Value::String(s), Value::Number(n)) => {
            n.to_string() == *s
        }
        _ => false,
    }
}

fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => match (parse_timestamp(a), parse_timestamp(b)) {
            (Some(ta), Some(tb)) => Some(ta.cmp(&tb)),
            _ => Some(x.cmp(y)),
        },
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

fn compare_nulls_last(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    let a = a.filter(|v| !v.is_null());
    let b = b.filter(|v| !v.is_null());
    match (a, b) {
        (Some(x), Some(y)) => compare(x, y).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
