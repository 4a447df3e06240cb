use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::future::join_all;

use crate::models::{clamp_score, Breakdown, MatchScore, Signal, NEUTRAL_SCORE};
use crate::signals::SignalExtractor;

use super::{BaselineHeuristic, WeightPreset};

/// Share of the final score taken from the baseline heuristic.
pub const BASELINE_BLEND_WEIGHT: f64 = 0.3;
/// Share of the final score taken from the weighted signals.
pub const SIGNAL_BLEND_WEIGHT: f64 = 0.7;

/// `round(baseline × 0.3 + overall × 0.7)`, or the baseline alone when the
/// signal score is zero.
pub fn blend(baseline: u8, overall: u8) -> u8 {
    if overall == 0 {
        return baseline;
    }
    clamp_score(baseline as f64 * BASELINE_BLEND_WEIGHT + overall as f64 * SIGNAL_BLEND_WEIGHT)
}

/// Weighted signal score with its breakdown.
#[derive(Debug, Clone, PartialEq)]
pub struct OverallScore {
    pub overall_score: u8,
    pub breakdown: Breakdown,
    pub degraded: Vec<Signal>,
}

/// Runs the extractors a preset needs and blends their output.
pub struct ScoreAggregator {
    extractors: HashMap<Signal, Arc<dyn SignalExtractor>>,
    baseline: BaselineHeuristic,
    preset: WeightPreset,
    signal_timeout: Duration,
}

impl ScoreAggregator {
    pub fn new(
        extractors: Vec<Arc<dyn SignalExtractor>>,
        baseline: BaselineHeuristic,
        preset: WeightPreset,
        signal_timeout: Duration,
    ) -> Self {
        let extractors = extractors.into_iter().map(|e| (e.signal(), e)).collect();
        Self {
            extractors,
            baseline,
            preset,
            signal_timeout,
        }
    }

    pub fn preset(&self) -> WeightPreset {
        self.preset
    }

    /// Every signal in the preset runs concurrently under its own timeout.
    /// A failed, timed-out or unregistered signal scores neutral and is
    /// listed in `degraded`; it never aborts the others.
    pub async fn compute_overall_score(&self, subject_id: &str, target_id: &str) -> OverallScore {
        let signals = self.preset.signals();
        let results = join_all(
            signals
                .iter()
                .map(|signal| self.extract_one(*signal, subject_id, target_id)),
        )
        .await;

        let mut breakdown = Breakdown::new();
        let mut degraded = Vec::new();
        for (signal, result) in signals.into_iter().zip(results) {
            match result {
                Some(score) => {
                    breakdown.insert(signal, score);
                }
                None => {
                    breakdown.insert(signal, NEUTRAL_SCORE);
                    degraded.push(signal);
                }
            }
        }

        OverallScore {
            overall_score: self.preset.apply(&breakdown),
            breakdown,
            degraded,
        }
    }

    async fn extract_one(&self, signal: Signal, subject_id: &str, target_id: &str) -> Option<u8> {
        let Some(extractor) = self.extractors.get(&signal) else {
            tracing::warn!(signal = %signal, "No extractor registered, using neutral");
            return None;
        };
        match tokio::time::timeout(self.signal_timeout, extractor.extract(subject_id, target_id))
            .await
        {
            Ok(Ok(score)) => Some(score.min(crate::models::SCORE_MAX)),
            Ok(Err(e)) if e.is_recoverable() => {
                tracing::warn!(
                    signal = %signal,
                    subject = subject_id,
                    target = target_id,
                    error = %e,
                    "Signal extraction failed, using neutral"
                );
                None
            }
            Ok(Err(e)) => {
                tracing::error!(
                    signal = %signal,
                    subject = subject_id,
                    target = target_id,
                    error = %e,
                    "Signal extraction failed unexpectedly, using neutral"
                );
                None
            }
            Err(_) => {
                tracing::warn!(
                    signal = %signal,
                    subject = subject_id,
                    target = target_id,
                    timeout_ms = self.signal_timeout.as_millis() as u64,
                    "Signal extraction timed out, using neutral"
                );
                None
            }
        }
    }

    /// Full pair score: signals and baseline computed concurrently, then
    /// blended.
    pub async fn compute_match_score(
        &self,
        subject_id: &str,
        target_id: &str,
        computed_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> MatchScore {
        let (overall, baseline) = tokio::join!(
            self.compute_overall_score(subject_id, target_id),
            self.baseline.score(target_id)
        );
        let final_score = blend(baseline, overall.overall_score);
        tracing::debug!(
            subject = subject_id,
            target = target_id,
            overall = overall.overall_score,
            baseline,
            final_score,
            degraded = overall.degraded.len(),
            "Pair scored"
        );

        MatchScore {
            subject_id: subject_id.to_string(),
            target_id: target_id.to_string(),
            overall_score: overall.overall_score,
            baseline_score: baseline,
            final_score,
            breakdown: overall.breakdown,
            degraded: overall.degraded,
            computed_at,
            expires_at,
        }
    }
}
