use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Confidence;

/// Lowest and highest value any score may take.
pub const SCORE_MIN: u8 = 0;
pub const SCORE_MAX: u8 = 100;

/// Value substituted whenever a signal has nothing to go on.
pub const NEUTRAL_SCORE: u8 = 50;

/// Rounds and clamps a raw value into the `[0, 100]` score range.
pub fn clamp_score(value: f64) -> u8 {
    if value.is_nan() {
        return NEUTRAL_SCORE;
    }
    value.round().clamp(SCORE_MIN as f64, SCORE_MAX as f64) as u8
}

/// One normalized sub-score contributing to the overall match score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Signal {
    #[serde(rename = "commonTopics")]
    Topics,
    #[serde(rename = "communicationStyle")]
    Communication,
    #[serde(rename = "emotionalSync")]
    Emotion,
    #[serde(rename = "activityOverlap")]
    Activity,
    #[serde(rename = "profileMatch")]
    Profile,
}

impl Signal {
    pub const ALL: [Signal; 5] = [
        Signal::Topics,
        Signal::Communication,
        Signal::Emotion,
        Signal::Activity,
        Signal::Profile,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Topics => "commonTopics",
            Self::Communication => "communicationStyle",
            Self::Emotion => "emotionalSync",
            Self::Activity => "activityOverlap",
            Self::Profile => "profileMatch",
        }
    }
}

impl std::fmt::Display for Signal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Signal name to score, returned alongside every overall score.
pub type Breakdown = BTreeMap<Signal, u8>;

/// Result of scoring one (subject, target) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchScore {
    pub subject_id: String,
    pub target_id: String,
    /// Weighted blend of the signal breakdown.
    pub overall_score: u8,
    /// Profile-completeness heuristic computed independently of the signals.
    pub baseline_score: u8,
    /// `overall_score` blended with `baseline_score`; the ranking key.
    pub final_score: u8,
    pub breakdown: Breakdown,
    /// Signals that fell back to the neutral default because of an error.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub degraded: Vec<Signal>,
    pub computed_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl MatchScore {
    pub fn confidence(&self) -> Confidence {
        if self.degraded.is_empty() {
            Confidence::High
        } else if self.degraded.len() < self.breakdown.len() {
            Confidence::Low
        } else {
            Confidence::None
        }
    }
}

/// One entry of a ranked candidate list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedMatch {
    pub candidate_id: String,
    pub final_score: u8,
    pub breakdown: Breakdown,
    pub confidence: Confidence,
    /// Served from the durable score cache without recomputation.
    pub cached: bool,
}
