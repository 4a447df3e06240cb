use async_trait::async_trait;

use crate::error::Result;
use crate::models::{clamp_score, InteractionRecord, Signal, NEUTRAL_SCORE};

use super::{InteractionSource, SignalExtractor};

fn sign(value: f64) -> i8 {
    if value > 0.0 {
        1
    } else if value < 0.0 {
        -1
    } else {
        0
    }
}

/// Share of consecutive sentiment-labelled messages whose sentiment sign
/// agrees, × 100. Unlabelled messages are skipped; fewer than two labelled
/// messages is neutral. Expects `records` oldest first.
pub fn emotional_sync_score(records: &[InteractionRecord]) -> u8 {
    let signs: Vec<i8> = records.iter().filter_map(|r| r.sentiment).map(sign).collect();
    if signs.len() < 2 {
        return NEUTRAL_SCORE;
    }
    let agreeing = signs.windows(2).filter(|w| w[0] == w[1]).count() as f64;
    let pairs = (signs.len() - 1) as f64;
    clamp_score(agreeing / pairs * 100.0)
}

/// Whether the pair's conversational mood moves together. Needs
/// sentiment-labelled history.
pub struct EmotionalSync {
    source: InteractionSource,
    window: usize,
}

impl EmotionalSync {
    pub fn new(source: InteractionSource, window: usize) -> Self {
        Self { source, window }
    }
}

#[async_trait]
impl SignalExtractor for EmotionalSync {
    fn signal(&self) -> Signal {
        Signal::Emotion
    }

    async fn extract(&self, subject_id: &str, target_id: &str) -> Result<u8> {
        let history = self.source.between(subject_id, target_id, self.window).await?;
        Ok(emotional_sync_score(&history))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryDataAccess;
    use crate::signals::testing;
    use chrono::Utc;
    use serde_json::json;

    fn labelled(sentiments: &[Option<f64>]) -> Vec<InteractionRecord> {
        sentiments
            .iter()
            .map(|s| InteractionRecord {
                sender_id: "a".into(),
                recipient_id: None,
                content: String::new(),
                timestamp: Utc::now(),
                sentiment: *s,
            })
            .collect()
    }

    #[test]
    fn fewer_than_two_labels_is_neutral() {
        assert_eq!(emotional_sync_score(&labelled(&[Some(0.5), None])), 50);
        assert_eq!(emotional_sync_score(&[]), 50);
    }

    #[test]
    fn agreement_over_pairs() {
        let records = labelled(&[Some(0.4), Some(0.9), None, Some(-0.2), Some(-0.1)]);
        // Signs + + - -: two of three consecutive pairs agree.
        assert_eq!(emotional_sync_score(&records), 67);
    }

    #[test]
    fn zero_is_its_own_class() {
        assert_eq!(emotional_sync_score(&labelled(&[Some(0.0), Some(0.3)])), 0);
        assert_eq!(emotional_sync_score(&labelled(&[Some(0.0), Some(0.0)])), 100);
    }

    #[tokio::test]
    async fn reads_pairwise_history() {
        let source = testing::source(MemoryDataAccess::new().with_collection(
            "messages",
            vec![
                json!({"sender_id": "a", "recipient_id": "b", "content": "great", "created_at": "2024-05-01T09:00:00Z", "sentiment": 0.8}),
                json!({"sender_id": "b", "recipient_id": "a", "content": "glad", "created_at": "2024-05-01T09:05:00Z", "sentiment": 0.6}),
            ],
        ));
        let extractor = EmotionalSync::new(source, 100);
        assert_eq!(extractor.extract("a", "b").await.unwrap(), 100);
    }
}
