use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, PoisonError};

use futures::stream::{self, StreamExt};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::cache::{score_key, ScoreCache, SingleFlight};
use crate::error::{MatchError, Result};
use crate::models::{MatchScore, RankedMatch};
use crate::scoring::ScoreAggregator;

/// Ranks candidates for a member, reading through the durable score cache.
pub struct MatchingService {
    scorer: Arc<ScoreAggregator>,
    cache: Arc<ScoreCache>,
    flight: Arc<SingleFlight<String, MatchScore>>,
    max_concurrency: usize,
    /// Latest ranking request per subject.
    active: Arc<Mutex<HashMap<String, (Uuid, CancellationToken)>>>,
}

impl MatchingService {
    pub fn new(scorer: Arc<ScoreAggregator>, cache: Arc<ScoreCache>, max_concurrency: usize) -> Self {
        Self {
            scorer,
            cache,
            flight: Arc::new(SingleFlight::new()),
            max_concurrency: max_concurrency.max(1),
            active: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn cache(&self) -> &Arc<ScoreCache> {
        &self.cache
    }

    /// Scores every candidate against `subject_id` and returns them by
    /// `final_score` descending, ties by candidate id.
    ///
    /// Candidates are deduplicated and the subject itself is skipped. A newer
    /// call for the same subject supersedes this one, which then returns
    /// `MatchError::Superseded` without its results.
    pub async fn get_ranked_matches(
        &self,
        subject_id: &str,
        candidate_ids: &[String],
    ) -> Result<Vec<RankedMatch>> {
        let subject_id = subject_id.trim();
        if subject_id.is_empty() {
            return Err(MatchError::Validation("subjectId must not be empty".to_string()));
        }

        let mut seen = HashSet::new();
        let candidates: Vec<&str> = candidate_ids
            .iter()
            .map(|c| c.trim())
            .filter(|c| !c.is_empty() && *c != subject_id && seen.insert(*c))
            .collect();

        let request = self.begin(subject_id);
        tracing::info!(
            request_id = %request.id,
            subject = subject_id,
            candidates = candidates.len(),
            concurrency = self.max_concurrency,
            "Ranking candidates"
        );

        let pending: Vec<_> = candidates
            .into_iter()
            .map(|candidate| self.score_candidate(subject_id, candidate))
            .collect();
        let scoring = stream::iter(pending)
            .buffer_unordered(self.max_concurrency)
            .collect::<Vec<_>>();

        let mut ranked = tokio::select! {
            biased;
            _ = request.token.cancelled() => {
                tracing::info!(
                    request_id = %request.id,
                    subject = subject_id,
                    "Ranking superseded, discarding results"
                );
                return Err(MatchError::Superseded(subject_id.to_string()));
            }
            ranked = scoring => ranked,
        };

        ranked.sort_by(|a, b| {
            b.final_score
                .cmp(&a.final_score)
                .then_with(|| a.candidate_id.cmp(&b.candidate_id))
        });
        Ok(ranked)
    }

    /// Cached score for the pair, computing and storing it on a miss.
    /// Concurrent misses for the same pair share one computation. A score
    /// with any degraded signal is returned but not stored.
    pub async fn score_pair(&self, subject_id: &str, target_id: &str) -> (MatchScore, bool) {
        if let Some(hit) = self.cache.get(subject_id, target_id).await {
            return (hit, true);
        }

        let scorer = self.scorer.clone();
        let cache = self.cache.clone();
        let (subject, target) = (subject_id.to_string(), target_id.to_string());
        let score = self
            .flight
            .run(score_key(subject_id, target_id), move || async move {
                let now = cache.clock().now();
                let score = scorer
                    .compute_match_score(&subject, &target, now, cache.expires_at(now))
                    .await;
                if !score.degraded.is_empty() {
                    tracing::info!(
                        subject = %subject,
                        target = %target,
                        degraded = score.degraded.len(),
                        "Degraded match score not cached"
                    );
                } else if let Err(e) = cache.put(&score).await {
                    tracing::warn!(subject = %subject, target = %target, error = %e, "Failed to persist match score");
                }
                score
            })
            .await;
        (score, false)
    }

    async fn score_candidate(&self, subject_id: &str, candidate_id: &str) -> RankedMatch {
        let (score, cached) = self.score_pair(subject_id, candidate_id).await;
        RankedMatch {
            candidate_id: candidate_id.to_string(),
            final_score: score.final_score,
            confidence: score.confidence(),
            breakdown: score.breakdown,
            cached,
        }
    }

    /// Drops the cached score so the next request recomputes it.
    pub async fn invalidate_pair(&self, subject_id: &str, target_id: &str) -> Result<bool> {
        self.cache.invalidate(subject_id, target_id).await
    }

    pub async fn invalidate_subject(&self, subject_id: &str) -> Result<u64> {
        self.cache.invalidate_subject(subject_id).await
    }

    /// Registers a new ranking for `subject_id`, cancelling the previous one.
    fn begin(&self, subject_id: &str) -> ActiveRequest {
        let id = Uuid::new_v4();
        let token = CancellationToken::new();
        let previous = self
            .active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(subject_id.to_string(), (id, token.clone()));
        if let Some((_, stale)) = previous {
            stale.cancel();
        }
        ActiveRequest {
            id,
            subject_id: subject_id.to_string(),
            token,
            active: self.active.clone(),
        }
    }
}

/// Clears its registration on drop unless a newer request replaced it.
struct ActiveRequest {
    id: Uuid,
    subject_id: String,
    token: CancellationToken,
    active: Arc<Mutex<HashMap<String, (Uuid, CancellationToken)>>>,
}

impl Drop for ActiveRequest {
    fn drop(&mut self) {
        let mut active = self.active.lock().unwrap_or_else(PoisonError::into_inner);
        if active.get(&self.subject_id).is_some_and(|(id, _)| *id == self.id) {
            active.remove(&self.subject_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{ManualClock, SystemClock};
    use crate::db::{MemoryDataAccess, MemoryScoreStore};
    use crate::error::Result;
    use crate::models::{Confidence, Signal};
    use crate::schema::{QueryBuilder, SchemaDetector};
    use crate::scoring::{BaselineHeuristic, WeightPreset};
    use crate::signals::{InteractionSource, SignalExtractor};
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Scores each target by a fixed table, counting calls.
    struct Table {
        signal: Signal,
        scores: HashMap<&'static str, u8>,
        calls: Arc<AtomicUsize>,
        delay: Duration,
    }

    #[async_trait]
    impl SignalExtractor for Table {
        fn signal(&self) -> Signal {
            self.signal
        }

        async fn extract(&self, _: &str, target_id: &str) -> Result<u8> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            Ok(self.scores.get(target_id).copied().unwrap_or(50))
        }
    }

    /// Tracks how many distinct targets are being scored at the same time.
    #[derive(Default)]
    struct InFlight {
        targets: Mutex<HashMap<String, usize>>,
        peak: AtomicUsize,
    }

    struct Tracked {
        signal: Signal,
        in_flight: Arc<InFlight>,
    }

    #[async_trait]
    impl SignalExtractor for Tracked {
        fn signal(&self) -> Signal {
            self.signal
        }

        async fn extract(&self, _: &str, target_id: &str) -> Result<u8> {
            {
                let mut targets = self.in_flight.targets.lock().unwrap();
                *targets.entry(target_id.to_string()).or_default() += 1;
                self.in_flight.peak.fetch_max(targets.len(), Ordering::SeqCst);
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
            let mut targets = self.in_flight.targets.lock().unwrap();
            if let Some(running) = targets.get_mut(target_id) {
                *running -= 1;
                if *running == 0 {
                    targets.remove(target_id);
                }
            }
            Ok(60)
        }
    }

    fn service(
        scores: &[(&'static str, u8)],
        delay: Duration,
    ) -> (MatchingService, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let extractors: Vec<Arc<dyn SignalExtractor>> = WeightPreset::Simple
            .signals()
            .into_iter()
            .map(|signal| {
                Arc::new(Table {
                    signal,
                    scores: scores.iter().copied().collect(),
                    calls: calls.clone(),
                    delay,
                }) as Arc<dyn SignalExtractor>
            })
            .collect();
        (build(extractors, 4), calls)
    }

    fn build(extractors: Vec<Arc<dyn SignalExtractor>>, max_concurrency: usize) -> MatchingService {
        let queries = QueryBuilder::new(Arc::new(SchemaDetector::new(
            Arc::new(MemoryDataAccess::new().with_collection(
                "profiles",
                vec![json!({"id": "x"})],
            )),
            Arc::new(SystemClock),
        )));
        let scorer = ScoreAggregator::new(
            extractors,
            BaselineHeuristic::new(InteractionSource::new(queries)),
            WeightPreset::Simple,
            Duration::from_secs(5),
        );
        let clock = Arc::new(ManualClock::new(Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap()));
        let cache = ScoreCache::new(
            Arc::new(MemoryScoreStore::new()),
            Duration::from_secs(7 * 24 * 3600),
            clock,
        );
        MatchingService::new(Arc::new(scorer), Arc::new(cache), max_concurrency)
    }

    fn ids(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[tokio::test]
    async fn ranks_descending_with_id_tie_break() {
        let (service, _) = service(&[("b", 90), ("c", 20), ("a", 90)], Duration::ZERO);
        let ranked = service
            .get_ranked_matches("me", &ids(&["c", "b", "a"]))
            .await
            .unwrap();
        let order: Vec<_> = ranked.iter().map(|r| r.candidate_id.as_str()).collect();
        assert_eq!(order, vec!["a", "b", "c"]);
        // 90 overall, neutral baseline: 15 + 63
        assert_eq!(ranked[0].final_score, 78);
        assert_eq!(ranked[0].confidence, Confidence::High);
    }

    #[tokio::test]
    async fn fan_out_is_bounded_by_max_concurrency() {
        let in_flight = Arc::new(InFlight::default());
        let extractors = WeightPreset::Simple
            .signals()
            .into_iter()
            .map(|signal| {
                Arc::new(Tracked {
                    signal,
                    in_flight: in_flight.clone(),
                }) as Arc<dyn SignalExtractor>
            })
            .collect();
        let service = build(extractors, 3);
        let candidates: Vec<String> = (0..10).map(|i| format!("c{i}")).collect();

        let ranked = service.get_ranked_matches("me", &candidates).await.unwrap();
        assert_eq!(ranked.len(), 10);
        let peak = in_flight.peak.load(Ordering::SeqCst);
        assert!(peak <= 3, "peak concurrency {peak}");
        assert!(peak >= 2, "pairs never overlapped");
    }

    #[tokio::test]
    async fn dedupes_and_skips_subject() {
        let (service, _) = service(&[], Duration::ZERO);
        let ranked = service
            .get_ranked_matches("me", &ids(&["a", "me", "a", " ", "b"]))
            .await
            .unwrap();
        assert_eq!(ranked.len(), 2);
    }

    #[tokio::test]
    async fn second_ranking_is_served_from_cache() {
        let (service, calls) = service(&[("a", 70)], Duration::ZERO);
        let first = service.get_ranked_matches("me", &ids(&["a"])).await.unwrap();
        let after_first = calls.load(Ordering::SeqCst);
        let second = service.get_ranked_matches("me", &ids(&["a"])).await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), after_first);
        assert_eq!(first[0].breakdown, second[0].breakdown);
        assert!(!first[0].cached);
        assert!(second[0].cached);
    }

    #[tokio::test]
    async fn concurrent_rankings_share_pair_computation() {
        let (service, calls) = service(&[("a", 70)], Duration::from_millis(50));
        let (left, right) = tokio::join!(service.score_pair("me", "a"), service.score_pair("me", "a"));
        assert_eq!(left.0, right.0);
        assert_eq!(calls.load(Ordering::SeqCst), WeightPreset::Simple.signals().len());
    }

    #[tokio::test]
    async fn newer_ranking_supersedes_older() {
        let (service, _) = service(&[("a", 70)], Duration::from_millis(100));
        let service = Arc::new(service);

        let stale = {
            let service = service.clone();
            tokio::spawn(async move { service.get_ranked_matches("me", &ids(&["a", "b"])).await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        let fresh = service.get_ranked_matches("me", &ids(&["a"])).await.unwrap();

        let stale = stale.await.unwrap();
        assert!(matches!(stale, Err(MatchError::Superseded(_))));
        assert_eq!(fresh.len(), 1);
    }

    #[tokio::test]
    async fn invalidated_pair_is_recomputed() {
        let (service, calls) = service(&[("a", 70)], Duration::ZERO);
        service.score_pair("me", "a").await;
        assert!(service.invalidate_pair("me", "a").await.unwrap());
        let (_, cached) = service.score_pair("me", "a").await;
        assert!(!cached);
        assert_eq!(calls.load(Ordering::SeqCst), 2 * WeightPreset::Simple.signals().len());
    }
}
