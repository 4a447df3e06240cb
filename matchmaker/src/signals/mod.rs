//! Signal extractors.
//!
//! Each extractor scores one aspect of a (subject, target) pair on the
//! `[0, 100]` scale. Sparse or unknown data yields the neutral score; errors
//! are returned to the caller, which substitutes the neutral score and marks
//! the result degraded.

mod activity;
mod communication;
mod emotion;
mod profile_match;
mod source;
mod topics;

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::MatchingConfig;
use crate::error::Result;
use crate::models::Signal;
use crate::schema::QueryBuilder;

pub use activity::{activity_score, active_hours, ActivityOverlap};
pub use communication::{communication_score, mean_reply_gap, CommunicationCompatibility};
pub use emotion::{emotional_sync_score, EmotionalSync};
pub use profile_match::{profile_match_score, ProfileAttributeMatch};
pub use source::InteractionSource;
pub use topics::{extract_topics, topic_score, Topic, TopicSimilarity};

/// Computes one signal for a pair of members.
#[async_trait]
pub trait SignalExtractor: Send + Sync {
    fn signal(&self) -> Signal;

    async fn extract(&self, subject_id: &str, target_id: &str) -> Result<u8>;
}

/// One extractor per [`Signal`], reading through `queries`.
pub fn default_extractors(
    queries: &QueryBuilder,
    config: &MatchingConfig,
) -> Vec<Arc<dyn SignalExtractor>> {
    let source = InteractionSource::new(queries.clone());
    vec![
        Arc::new(TopicSimilarity::new(source.clone(), config.topic_window)),
        Arc::new(CommunicationCompatibility::new(source.clone(), config.pair_window)),
        Arc::new(EmotionalSync::new(source.clone(), config.pair_window)),
        Arc::new(ActivityOverlap::new(source.clone(), config.activity_window)),
        Arc::new(ProfileAttributeMatch::new(source)),
    ]
}
