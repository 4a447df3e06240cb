use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Clock;
use crate::db::ScoreStore;
use crate::error::{MatchError, Result};
use crate::models::{Breakdown, MatchScore, Signal};

pub const SCORE_KEY_PREFIX: &str = "match_score";

pub fn score_key(subject_id: &str, target_id: &str) -> String {
    format!("{SCORE_KEY_PREFIX}:{subject_id}:{target_id}")
}

/// Persisted JSON layout of one pairwise entry: `{score, breakdown,
/// timestamp}` plus optional detail. Freshness is always `timestamp + ttl`.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredScore {
    /// Final (blended) score.
    score: u8,
    breakdown: Breakdown,
    timestamp: StoredAt,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    overall_score: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    baseline_score: Option<u8>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    degraded: Vec<Signal>,
}

/// Entries are written with RFC 3339 timestamps; older writers stored epoch
/// milliseconds.
#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
enum StoredAt {
    Millis(i64),
    Rfc3339(DateTime<Utc>),
}

impl StoredAt {
    fn resolve(&self) -> Option<DateTime<Utc>> {
        match self {
            StoredAt::Millis(ms) => DateTime::from_timestamp_millis(*ms),
            StoredAt::Rfc3339(at) => Some(*at),
        }
    }
}

/// Durable pairwise score cache with a fixed TTL.
pub struct ScoreCache {
    store: Arc<dyn ScoreStore>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl ScoreCache {
    pub fn new(store: Arc<dyn ScoreStore>, ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self { store, ttl, clock }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Expiry for an entry computed at `computed_at`.
    pub fn expires_at(&self, computed_at: DateTime<Utc>) -> DateTime<Utc> {
        chrono::Duration::from_std(self.ttl)
            .ok()
            .and_then(|ttl| computed_at.checked_add_signed(ttl))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    /// Returns the entry only while it is fresh. Unreadable entries are
    /// treated as a miss and removed.
    pub async fn get(&self, subject_id: &str, target_id: &str) -> Option<MatchScore> {
        let key = score_key(subject_id, target_id);
        let raw = match self.store.get(&key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Score cache read failed");
                return None;
            }
        };

        let parsed = serde_json::from_str::<StoredScore>(&raw)
            .map_err(|e| MatchError::MalformedData(e.to_string()))
            .and_then(|stored| match stored.timestamp.resolve() {
                Some(at) => Ok((stored, at)),
                None => Err(MatchError::MalformedData("timestamp out of range".to_string())),
            });
        let (stored, computed_at) = match parsed {
            Ok(parsed) => parsed,
            Err(err) => {
                tracing::warn!(key = %key, error = %err, "Discarding unreadable score cache entry");
                if let Err(e) = self.store.remove(&key).await {
                    tracing::warn!(key = %key, error = %e, "Failed to remove score cache entry");
                }
                return None;
            }
        };

        let expires_at = self.expires_at(computed_at);
        if self.clock.now() >= expires_at {
            tracing::debug!(key = %key, expires_at = %expires_at, "Score cache entry stale");
            return None;
        }

        Some(MatchScore {
            subject_id: subject_id.to_string(),
            target_id: target_id.to_string(),
            overall_score: stored.overall_score.unwrap_or(stored.score),
            baseline_score: stored.baseline_score.unwrap_or(stored.score),
            final_score: stored.score,
            breakdown: stored.breakdown,
            degraded: stored.degraded,
            computed_at,
            expires_at,
        })
    }

    pub async fn put(&self, score: &MatchScore) -> Result<()> {
        let stored = StoredScore {
            score: score.final_score,
            breakdown: score.breakdown.clone(),
            timestamp: StoredAt::Rfc3339(score.computed_at),
            overall_score: Some(score.overall_score),
            baseline_score: Some(score.baseline_score),
            degraded: score.degraded.clone(),
        };
        let key = score_key(&score.subject_id, &score.target_id);
        self.store.put(&key, &serde_json::to_string(&stored)?).await
    }

    pub async fn invalidate(&self, subject_id: &str, target_id: &str) -> Result<bool> {
        self.store.remove(&score_key(subject_id, target_id)).await
    }

    /// Drops every entry scored on behalf of `subject_id`.
    pub async fn invalidate_subject(&self, subject_id: &str) -> Result<u64> {
        self.store
            .remove_prefix(&format!("{SCORE_KEY_PREFIX}:{subject_id}:"))
            .await
    }
}
