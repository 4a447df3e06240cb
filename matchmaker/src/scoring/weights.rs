use serde::{Deserialize, Serialize};

use crate::models::{clamp_score, Breakdown, Signal};

/// Tolerance on the sum of a weight vector.
pub const WEIGHT_SUM_EPSILON: f64 = 1e-6;

/// Named weight vector applied to a signal breakdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeightPreset {
    /// Four signals, no sentiment history required.
    #[default]
    Simple,
    /// Adds emotional sync.
    Full,
}

impl WeightPreset {
    pub fn weights(&self) -> &'static [(Signal, f64)] {
        match self {
            Self::Simple => &[
                (Signal::Topics, 0.35),
                (Signal::Communication, 0.25),
                (Signal::Activity, 0.20),
                (Signal::Profile, 0.20),
            ],
            Self::Full => &[
                (Signal::Topics, 0.30),
                (Signal::Communication, 0.20),
                (Signal::Emotion, 0.20),
                (Signal::Activity, 0.15),
                (Signal::Profile, 0.15),
            ],
        }
    }

    /// Signals this preset needs extracted.
    pub fn signals(&self) -> Vec<Signal> {
        self.weights().iter().map(|(signal, _)| *signal).collect()
    }

    pub fn weight_sum(&self) -> f64 {
        self.weights().iter().map(|(_, w)| w).sum()
    }

    /// `round(Σ weight × score)`. Signals missing from the breakdown count as
    /// neutral.
    pub fn apply(&self, breakdown: &Breakdown) -> u8 {
        let total: f64 = self
            .weights()
            .iter()
            .map(|(signal, weight)| {
                let score = breakdown
                    .get(signal)
                    .copied()
                    .unwrap_or(crate::models::NEUTRAL_SCORE);
                weight * score as f64
            })
            .sum();
        clamp_score(total)
    }
}

impl std::fmt::Display for WeightPreset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Simple => write!(f, "simple"),
            Self::Full => write!(f, "full"),
        }
    }
}

impl std::str::FromStr for WeightPreset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "simple" => Ok(Self::Simple),
            "full" | "ai" => Ok(Self::Full),
            _ => Err(format!("Unknown weight preset '{s}'. Valid presets: simple, full")),
        }
    }
}
