use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, PoisonError, RwLock};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::cache::Clock;
use crate::db::{DataAccess, Query};
use crate::error::MatchError;

/// Columns observed on one sample row of a collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaDescriptor {
    pub collection_name: String,
    pub columns: BTreeSet<String>,
    pub detected_at: DateTime<Utc>,
}

impl SchemaDescriptor {
    pub fn has(&self, column: &str) -> bool {
        self.columns.contains(column)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DetectedSchema {
    Present(SchemaDescriptor),
    /// The collection does not exist on the backend.
    Missing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CollectionStatus {
    Present,
    /// Exists but had no rows to sample.
    Empty,
    Missing,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaReportEntry {
    pub collection: String,
    pub status: CollectionStatus,
    pub columns: Vec<String>,
    pub detected_at: Option<DateTime<Utc>>,
}

/// Detects and caches the observed columns of backend collections.
///
/// Detection never fails: a missing collection is reported as
/// [`DetectedSchema::Missing`], any other detection failure degrades to an empty
/// descriptor which is not cached.
pub struct SchemaDetector {
    data: Arc<dyn DataAccess>,
    clock: Arc<dyn Clock>,
    detected: RwLock<HashMap<String, DetectedSchema>>,
}

impl SchemaDetector {
    pub fn new(data: Arc<dyn DataAccess>, clock: Arc<dyn Clock>) -> Self {
        Self {
            data,
            clock,
            detected: RwLock::new(HashMap::new()),
        }
    }

    pub fn data(&self) -> &Arc<dyn DataAccess> {
        &self.data
    }

    pub async fn detect_schema(&self, collection: &str) -> DetectedSchema {
        let cached = self
            .detected
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(collection)
            .cloned();
        if let Some(schema) = cached {
            return schema;
        }

        let detected_at = self.clock.now();
        let empty = || {
            DetectedSchema::Present(SchemaDescriptor {
                collection_name: collection.to_string(),
                columns: BTreeSet::new(),
                detected_at,
            })
        };

        match self.data.read(collection, &Query::new().limit(1)).await {
            Ok(rows) => match rows.first() {
                Some(row) => {
                    let schema = DetectedSchema::Present(SchemaDescriptor {
                        collection_name: collection.to_string(),
                        columns: row.keys().cloned().collect(),
                        detected_at,
                    });
                    tracing::debug!(collection, columns = row.len(), "Detected schema");
                    self.remember(collection, schema.clone());
                    schema
                }
                None => {
                    tracing::debug!(collection, "Collection is empty, schema left undetected");
                    empty()
                }
            },
            Err(MatchError::DataUnavailable(_)) => {
                tracing::info!(collection, "Collection missing");
                self.remember(collection, DetectedSchema::Missing);
                DetectedSchema::Missing
            }
            Err(e) => {
                tracing::warn!(collection, error = %e, "Schema detection failed, degrading");
                empty()
            }
        }
    }

    fn remember(&self, collection: &str, schema: DetectedSchema) {
        self.detected
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(collection.to_string(), schema);
    }

    pub fn invalidate(&self, collection: &str) -> bool {
        let removed = self
            .detected
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(collection)
            .is_some();
        if removed {
            tracing::debug!(collection, "Schema invalidated");
        }
        removed
    }

    pub fn invalidate_all(&self) -> usize {
        let mut detected = self.detected.write().unwrap_or_else(PoisonError::into_inner);
        let count = detected.len();
        detected.clear();
        count
    }

    pub async fn schema_report(&self, collections: &[String]) -> Vec<SchemaReportEntry> {
        let mut report = Vec::with_capacity(collections.len());
        for collection in collections {
            let entry = match self.detect_schema(collection).await {
                DetectedSchema::Missing => SchemaReportEntry {
                    collection: collection.clone(),
                    status: CollectionStatus::Missing,
                    columns: Vec::new(),
                    detected_at: None,
                },
                DetectedSchema::Present(descriptor) => SchemaReportEntry {
                    collection: collection.clone(),
                    status: if descriptor.columns.is_empty() {
                        CollectionStatus::Empty
                    } else {
                        CollectionStatus::Present
                    },
                    columns: descriptor.columns.into_iter().collect(),
                    detected_at: Some(descriptor.detected_at),
                },
            };
            report.push(entry);
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::SystemClock;
    use crate::db::MemoryDataAccess;
    use serde_json::json;

    fn detector(data: MemoryDataAccess) -> SchemaDetector {
        SchemaDetector::new(Arc::new(data), Arc::new(SystemClock))
    }

    #[tokio::test]
    async fn detects_columns_from_sample_row() {
        let detector = detector(MemoryDataAccess::new().with_collection(
            "events",
            vec![json!({"id": 1, "title": "Mixer", "start_date": "2024-05-02"})],
        ));
        match detector.detect_schema("events").await {
            DetectedSchema::Present(d) => {
                assert!(d.has("start_date"));
                assert!(!d.has("event_date"));
            }
            DetectedSchema::Missing => panic!("expected present"),
        }
    }

    #[tokio::test]
    async fn missing_collection_is_cached() {
        let data = Arc::new(MemoryDataAccess::new());
        let detector = SchemaDetector::new(data.clone(), Arc::new(SystemClock));
        assert_eq!(detector.detect_schema("matchings").await, DetectedSchema::Missing);

        data.put_collection("matchings", vec![]);
        assert_eq!(detector.detect_schema("matchings").await, DetectedSchema::Missing);

        detector.invalidate("matchings");
        assert!(matches!(
            detector.detect_schema("matchings").await,
            DetectedSchema::Present(_)
        ));
    }

    #[tokio::test]
    async fn empty_sample_is_not_cached() {
        let data = Arc::new(MemoryDataAccess::new().with_collection("events", vec![]));
        let detector = SchemaDetector::new(data.clone(), Arc::new(SystemClock));
        assert!(matches!(
            detector.detect_schema("events").await,
            DetectedSchema::Present(ref d) if d.columns.is_empty()
        ));

        data.insert("events", json!({"event_date": "2024-05-01"}).as_object().cloned().unwrap());
        assert!(matches!(
            detector.detect_schema("events").await,
            DetectedSchema::Present(ref d) if d.has("event_date")
        ));
    }

    #[tokio::test]
    async fn report_lists_status_per_collection() {
        let detector = detector(
            MemoryDataAccess::new()
                .with_collection("profiles", vec![json!({"id": "u1", "industry": "IT"})])
                .with_collection("events", vec![]),
        );
        let report = detector
            .schema_report(&["profiles".into(), "events".into(), "matchings".into()])
            .await;
        let statuses: Vec<_> = report.iter().map(|e| e.status).collect();
        assert_eq!(
            statuses,
            vec![
                CollectionStatus::Present,
                CollectionStatus::Empty,
                CollectionStatus::Missing
            ]
        );
        assert_eq!(report[0].columns, vec!["id", "industry"]);
    }
}
