use crate::models::{clamp_score, Profile, NEUTRAL_SCORE};
use crate::signals::InteractionSource;

const BASE_POINTS: u32 = 50;
const TITLE_POINTS: u32 = 10;
const COMPANY_POINTS: u32 = 10;
const BIO_POINTS: u32 = 10;
const SKILLS_POINTS: u32 = 10;
const INDUSTRY_POINTS: u32 = 5;
const LOCATION_POINTS: u32 = 5;

/// A bio must be longer than this many characters to count.
const BIO_MIN_CHARS: usize = 50;

fn filled(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|v| !v.trim().is_empty())
}

/// Profile-completeness heuristic. Missing profile is neutral.
pub fn baseline_from_profile(profile: Option<&Profile>) -> u8 {
    let Some(profile) = profile else {
        return NEUTRAL_SCORE;
    };

    let mut points = BASE_POINTS;
    if filled(&profile.title) {
        points += TITLE_POINTS;
    }
    if filled(&profile.company) {
        points += COMPANY_POINTS;
    }
    if profile
        .bio
        .as_deref()
        .is_some_and(|bio| bio.chars().count() > BIO_MIN_CHARS)
    {
        points += BIO_POINTS;
    }
    if !profile.skills.is_empty() {
        points += SKILLS_POINTS;
    }
    if filled(&profile.industry) {
        points += INDUSTRY_POINTS;
    }
    if filled(&profile.location) {
        points += LOCATION_POINTS;
    }
    clamp_score(points as f64)
}

/// Cheap ranking signal computed from the target's profile alone,
/// independent of the extractor pipeline.
#[derive(Clone)]
pub struct BaselineHeuristic {
    source: InteractionSource,
}

impl BaselineHeuristic {
    pub fn new(source: InteractionSource) -> Self {
        Self { source }
    }

    pub async fn score(&self, target_id: &str) -> u8 {
        match self.source.profile(target_id).await {
            Ok(profile) => baseline_from_profile(profile.as_ref()),
            Err(e) => {
                tracing::warn!(target = target_id, error = %e, "Baseline profile read failed, using neutral");
                NEUTRAL_SCORE
            }
        }
    }
}
