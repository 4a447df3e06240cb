//! Blending signal scores into a ranked match score.

mod aggregator;
mod baseline;
mod weights;

pub use aggregator::{blend, OverallScore, ScoreAggregator, BASELINE_BLEND_WEIGHT, SIGNAL_BLEND_WEIGHT};
pub use baseline::{baseline_from_profile, BaselineHeuristic};
pub use weights::{WeightPreset, WEIGHT_SUM_EPSILON};
