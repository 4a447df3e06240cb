use async_trait::async_trait;
use chrono::Duration;

use crate::error::Result;
use crate::models::{clamp_score, InteractionRecord, Signal, NEUTRAL_SCORE};

use super::{InteractionSource, SignalExtractor};

/// `(more than this many messages, bonus)`, checked in order.
const VOLUME_TIERS: [(usize, u8); 3] = [(20, 20), (10, 15), (5, 10)];

/// `(mean reply gap under this many hours, bonus)`, checked in order.
const LATENCY_TIERS: [(i64, u8); 3] = [(1, 20), (6, 15), (24, 10)];

/// Mean gap between consecutive messages where the sender changes. `None`
/// when nobody ever replied. Expects `records` oldest first.
pub fn mean_reply_gap(records: &[InteractionRecord]) -> Option<Duration> {
    let gaps: Vec<Duration> = records
        .windows(2)
        .filter(|pair| pair[0].sender_id != pair[1].sender_id)
        .map(|pair| pair[1].timestamp - pair[0].timestamp)
        .collect();
    if gaps.is_empty() {
        return None;
    }
    let total_ms: i64 = gaps.iter().map(|g| g.num_milliseconds()).sum();
    Some(Duration::milliseconds(total_ms / gaps.len() as i64))
}

/// Base 50 plus a volume bonus and a reply-latency bonus.
pub fn communication_score(message_count: usize, reply_gap: Option<Duration>) -> u8 {
    let mut score = NEUTRAL_SCORE as f64;

    if let Some((_, bonus)) = VOLUME_TIERS
        .iter()
        .find(|(threshold, _)| message_count > *threshold)
    {
        score += *bonus as f64;
    }

    if let Some(gap) = reply_gap {
        if let Some((_, bonus)) = LATENCY_TIERS
            .iter()
            .find(|(hours, _)| gap < Duration::hours(*hours))
        {
            score += *bonus as f64;
        }
    }

    clamp_score(score)
}

/// How much and how promptly the pair talk to each other.
pub struct CommunicationCompatibility {
    source: InteractionSource,
    window: usize,
}

impl CommunicationCompatibility {
    pub fn new(source: InteractionSource, window: usize) -> Self {
        Self { source, window }
    }
}

#[async_trait]
impl SignalExtractor for CommunicationCompatibility {
    fn signal(&self) -> Signal {
        Signal::Communication
    }

    async fn extract(&self, subject_id: &str, target_id: &str) -> Result<u8> {
        let history = self.source.between(subject_id, target_id, self.window).await?;
        let gap = mean_reply_gap(&history);
        tracing::debug!(
            subject = subject_id,
            target = target_id,
            messages = history.len(),
            reply_gap_mins = gap.map(|g| g.num_minutes()),
            "Pairwise history read"
        );
        Ok(communication_score(history.len(), gap))
    }
}
