use std::sync::Arc;

use crate::db::{DataAccess, Filter, Query};
use crate::error::{MatchError, Result};
use crate::models::Row;

use super::{QueryIntent, SchemaDetector, DetectedSchema};

/// A query adapted to the columns a collection actually has.
#[derive(Debug, Clone, PartialEq)]
pub struct BuiltQuery {
    pub collection: String,
    pub query: Query,
    /// At least one intent had no matching column and was dropped.
    pub field_unavailable: bool,
    /// `(intent, column)` for every intent that could be expressed.
    pub chosen_fields: Vec<(&'static str, String)>,
    pub unavailable_intents: Vec<&'static str>,
}

impl BuiltQuery {
    pub fn is_unavailable(&self, intent: &str) -> bool {
        self.unavailable_intents.iter().any(|i| *i == intent)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum QueryPlan {
    Ready(BuiltQuery),
    CollectionMissing,
}

/// Result of an adaptive read together with whether any filter was dropped.
#[derive(Debug, Clone, PartialEq)]
pub struct Adapted<T> {
    pub value: T,
    pub degraded: bool,
}

/// Plans and runs queries through the schema detector.
#[derive(Clone)]
pub struct QueryBuilder {
    detector: Arc<SchemaDetector>,
}

impl QueryBuilder {
    pub fn new(detector: Arc<SchemaDetector>) -> Self {
        Self { detector }
    }

    pub fn detector(&self) -> &Arc<SchemaDetector> {
        &self.detector
    }

    fn data(&self) -> &Arc<dyn DataAccess> {
        self.detector.data()
    }

    pub async fn build_query(&self, collection: &str, intent: QueryIntent) -> QueryPlan {
        self.build_query_all(collection, &[intent]).await
    }

    /// Picks, for each intent, the first candidate column present in the
    /// detected schema. Unmatched intents are dropped and flagged rather than
    /// failing the query.
    pub async fn build_query_all(&self, collection: &str, intents: &[QueryIntent]) -> QueryPlan {
        let descriptor = match self.detector.detect_schema(collection).await {
            DetectedSchema::Missing => return QueryPlan::CollectionMissing,
            DetectedSchema::Present(descriptor) => descriptor,
        };

        let mut built = BuiltQuery {
            collection: collection.to_string(),
            query: Query::new(),
            field_unavailable: false,
            chosen_fields: Vec::new(),
            unavailable_intents: Vec::new(),
        };

        for intent in intents {
            match intent.candidates().iter().find(|c| descriptor.has(c)) {
                Some(column) => {
                    built.query = intent.apply(built.query, column);
                    built.chosen_fields.push((intent.name(), column.to_string()));
                }
                None => {
                    tracing::debug!(
                        collection,
                        intent = intent.name(),
                        "No candidate column present, dropping filter"
                    );
                    built.field_unavailable = true;
                    built.unavailable_intents.push(intent.name());
                }
            }
        }

        QueryPlan::Ready(built)
    }

    async fn plan(&self, collection: &str, intents: &[QueryIntent]) -> Result<BuiltQuery> {
        match self.build_query_all(collection, intents).await {
            QueryPlan::Ready(built) => Ok(built),
            QueryPlan::CollectionMissing => {
                Err(MatchError::DataUnavailable(collection.to_string()))
            }
        }
    }

    /// Counts rows matching `intents` plus fixed `extra` predicates.
    ///
    /// An unexpected `FieldUnavailable` from the backend means the cached
    /// schema is stale: it is invalidated and the query planned once more.
    pub async fn count(
        &self,
        collection: &str,
        intents: &[QueryIntent],
        extra: &[Filter],
    ) -> Result<Adapted<u64>> {
        let built = self.plan(collection, intents).await?;
        let filters = with_extra(&built, extra);
        match self.data().count(collection, &filters).await {
            Err(MatchError::FieldUnavailable { field, .. }) => {
                tracing::warn!(collection, field = %field, "Column vanished, re-detecting schema");
                self.detector.invalidate(collection);
                let built = self.plan(collection, intents).await?;
                let filters = with_extra(&built, extra);
                let value = self.data().count(collection, &filters).await?;
                Ok(Adapted {
                    value,
                    degraded: built.field_unavailable,
                })
            }
            other => Ok(Adapted {
                value: other?,
                degraded: built.field_unavailable,
            }),
        }
    }

    /// Reads rows matching `intents`, applying `base`'s extra filters, sort
    /// and limit. A sort column missing from the schema is dropped.
    pub async fn read(
        &self,
        collection: &str,
        intents: &[QueryIntent],
        base: &Query,
    ) -> Result<Adapted<Vec<Row>>> {
        let built = self.plan(collection, intents).await?;
        let query = self.merge(&built, base).await;
        match self.data().read(collection, &query).await {
            Err(MatchError::FieldUnavailable { field, .. }) => {
                tracing::warn!(collection, field = %field, "Column vanished, re-detecting schema");
                self.detector.invalidate(collection);
                let built = self.plan(collection, intents).await?;
                let query = self.merge(&built, base).await;
                let value = self.data().read(collection, &query).await?;
                Ok(Adapted {
                    value,
                    degraded: built.field_unavailable,
                })
            }
            other => Ok(Adapted {
                value: other?,
                degraded: built.field_unavailable,
            }),
        }
    }

    async fn merge(&self, built: &BuiltQuery, base: &Query) -> Query {
        let mut query = built.query.clone();
        query.filters.extend(base.filters.iter().cloned());
        query.limit = base.limit;
        if let Some(sort) = &base.sort {
            let sortable = match self.detector.detect_schema(&built.collection).await {
                DetectedSchema::Present(d) => d.columns.is_empty() || d.has(&sort.column),
                DetectedSchema::Missing => false,
            };
            if sortable {
                query.sort = Some(sort.clone());
            } else {
                tracing::debug!(
                    collection = %built.collection,
                    column = %sort.column,
                    "Sort column absent, returning unsorted"
                );
            }
        }
        query
    }
}

fn with_extra(built: &BuiltQuery, extra: &[Filter]) -> Vec<Filter> {
    let mut filters = built.query.filters.clone();
    filters.extend(extra.iter().cloned());
    filters
}
