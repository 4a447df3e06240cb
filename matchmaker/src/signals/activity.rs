use std::collections::BTreeSet;

use async_trait::async_trait;
use chrono::Timelike;

use crate::error::Result;
use crate::models::{clamp_score, InteractionRecord, Signal, NEUTRAL_SCORE};

use super::{InteractionSource, SignalExtractor};

const HOURS_PER_DAY: f64 = 24.0;

/// Overlap ratio is scaled by this before capping at 100, so sharing half
/// the day already scores full marks.
pub const ACTIVITY_OVERLAP_SCALE: f64 = 2.0;

/// UTC hours of day in which any of `records` was sent.
pub fn active_hours(records: &[InteractionRecord]) -> BTreeSet<u32> {
    records.iter().map(|r| r.timestamp.hour()).collect()
}

/// `min(common_hours / 24 × 2 × 100, 100)`; neutral when either side has no
/// activity.
pub fn activity_score(subject: &BTreeSet<u32>, target: &BTreeSet<u32>) -> u8 {
    if subject.is_empty() || target.is_empty() {
        return NEUTRAL_SCORE;
    }
    let overlap = subject.intersection(target).count() as f64;
    clamp_score(overlap / HOURS_PER_DAY * 100.0 * ACTIVITY_OVERLAP_SCALE)
}

/// Whether the pair tend to be online at the same hours.
pub struct ActivityOverlap {
    source: InteractionSource,
    window: usize,
}

impl ActivityOverlap {
    pub fn new(source: InteractionSource, window: usize) -> Self {
        Self { source, window }
    }
}

#[async_trait]
impl SignalExtractor for ActivityOverlap {
    fn signal(&self) -> Signal {
        Signal::Activity
    }

    async fn extract(&self, subject_id: &str, target_id: &str) -> Result<u8> {
        let (subject, target) = tokio::join!(
            self.source.sent_by(subject_id, self.window),
            self.source.sent_by(target_id, self.window)
        );
        let (subject, target) = (active_hours(&subject?), active_hours(&target?));
        Ok(activity_score(&subject, &target))
    }
}
