use std::collections::BTreeSet;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{clamp_score, Profile, Signal, NEUTRAL_SCORE};

use super::{InteractionSource, SignalExtractor};

const INDUSTRY_MATCH_POINTS: u32 = 40;
const LOCATION_MATCH_POINTS: u32 = 30;
const SHARED_SKILL_POINTS: u32 = 10;
const SHARED_SKILL_CAP: u32 = 30;

fn same(a: &Option<String>, b: &Option<String>) -> bool {
    match (a.as_deref(), b.as_deref()) {
        (Some(a), Some(b)) => !a.is_empty() && a == b,
        _ => false,
    }
}

/// Point rubric over discrete profile attributes.
pub fn profile_match_score(subject: &Profile, target: &Profile) -> u8 {
    let mut points = 0;
    if same(&subject.industry, &target.industry) {
        points += INDUSTRY_MATCH_POINTS;
    }
    if same(&subject.location, &target.location) {
        points += LOCATION_MATCH_POINTS;
    }

    let subject_skills: BTreeSet<&str> = subject.skills.iter().map(String::as_str).collect();
    let shared = target
        .skills
        .iter()
        .filter(|s| subject_skills.contains(s.as_str()))
        .count() as u32;
    points += (shared * SHARED_SKILL_POINTS).min(SHARED_SKILL_CAP);

    clamp_score(points as f64)
}

/// Industry, location and skill overlap between the two profiles.
pub struct ProfileAttributeMatch {
    source: InteractionSource,
}

impl ProfileAttributeMatch {
    pub fn new(source: InteractionSource) -> Self {
        Self { source }
    }
}

#[async_trait]
impl SignalExtractor for ProfileAttributeMatch {
    fn signal(&self) -> Signal {
        Signal::Profile
    }

    async fn extract(&self, subject_id: &str, target_id: &str) -> Result<u8> {
        let (subject, target) = tokio::join!(
            self.source.profile(subject_id),
            self.source.profile(target_id)
        );
        match (subject?, target?) {
            (Some(subject), Some(target)) => Ok(profile_match_score(&subject, &target)),
            _ => Ok(NEUTRAL_SCORE),
        }
    }
}
