mod common;

use std::sync::Arc;

use chrono::Duration;
use pretty_assertions::assert_eq;
use serde_json::json;
use tokio_test::{assert_err, assert_ok};

use matchmaker::db::{DataAccess, MemoryDataAccess};
use matchmaker::error::MatchError;
use matchmaker::models::{Confidence, Signal, NEUTRAL_SCORE};

use common::{ids, init_test_logger, manual_clock, state, CountingDataAccess, SwitchableDataAccess};

// ── Test Helpers ──────────────────────────────────────────────────────────

fn conversation() -> MemoryDataAccess {
    MemoryDataAccess::new()
        .with_collection(
            "messages",
            vec![
                json!({
                    "sender_id": "alice",
                    "recipient_id": "bob",
                    "content": "Working on an AI startup, want to chat?",
                    "created_at": "2024-05-10T10:00:00Z"
                }),
                json!({
                    "sender_id": "bob",
                    "recipient_id": "alice",
                    "content": "Sure, my startup does AI too",
                    "created_at": "2024-05-10T10:30:00Z"
                }),
            ],
        )
        .with_collection(
            "profiles",
            vec![
                json!({"id": "alice", "industry": "IT", "location": "Osaka"}),
                json!({"id": "carol", "industry": "IT", "location": "Osaka", "skills": ["Go"]}),
            ],
        )
}

// ── Ranking ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn breakdown_reflects_shared_conversation() {
    init_test_logger();
    let state = state(Arc::new(conversation()), manual_clock());

    let ranked = assert_ok!(
        state
            .matching
            .get_ranked_matches("alice", &ids(&["bob"]))
            .await
    );
    assert_eq!(ranked.len(), 1);

    let breakdown = &ranked[0].breakdown;
    // Both talk about AI and startups.
    assert_eq!(breakdown[&Signal::Topics], 100);
    // Two messages, answered within the hour.
    assert_eq!(breakdown[&Signal::Communication], 70);
    // One shared UTC hour out of 24, doubled.
    assert_eq!(breakdown[&Signal::Activity], 8);
    // Bob has no profile row.
    assert_eq!(breakdown[&Signal::Profile], NEUTRAL_SCORE);
    assert_eq!(ranked[0].confidence, Confidence::High);
}

#[tokio::test]
async fn profile_overlap_orders_candidates() {
    init_test_logger();
    let state = state(Arc::new(conversation()), manual_clock());

    let ranked = assert_ok!(
        state
            .matching
            .get_ranked_matches("alice", &ids(&["carol", "dave", "carol", "alice"]))
            .await
    );
    let order: Vec<&str> = ranked.iter().map(|r| r.candidate_id.as_str()).collect();
    assert_eq!(order, vec!["carol", "dave"]);
    assert_eq!(ranked[0].breakdown[&Signal::Profile], 70);
    assert!(ranked[0].final_score > ranked[1].final_score);
}

#[tokio::test]
async fn no_history_scores_neutral_everywhere() {
    init_test_logger();
    let data = MemoryDataAccess::new()
        .with_collection("messages", vec![])
        .with_collection("profiles", vec![]);
    let state = state(Arc::new(data), manual_clock());

    let ranked = assert_ok!(
        state
            .matching
            .get_ranked_matches("x", &ids(&["y", "z"]))
            .await
    );
    for ranked in &ranked {
        assert!(ranked.breakdown.values().all(|score| *score == NEUTRAL_SCORE));
        assert_eq!(ranked.final_score, NEUTRAL_SCORE);
    }
    // Equal scores fall back to id order.
    assert_eq!(ranked[0].candidate_id, "y");
}

#[tokio::test]
async fn missing_collections_degrade_instead_of_failing() {
    init_test_logger();
    let state = state(Arc::new(MemoryDataAccess::new()), manual_clock());

    let ranked = assert_ok!(
        state
            .matching
            .get_ranked_matches("x", &ids(&["y"]))
            .await
    );
    assert_eq!(ranked[0].final_score, NEUTRAL_SCORE);
    assert_eq!(ranked[0].confidence, Confidence::None);
}

#[tokio::test]
async fn profiles_keyed_by_user_id_still_match() {
    init_test_logger();
    let data = MemoryDataAccess::new()
        .with_collection("messages", vec![])
        .with_collection(
            "profiles",
            vec![
                json!({"user_id": "alice", "industry": "IT", "location": "Osaka"}),
                json!({"user_id": "carol", "industry": "IT", "location": "Osaka"}),
            ],
        );
    let state = state(Arc::new(data), manual_clock());

    let ranked = assert_ok!(
        state
            .matching
            .get_ranked_matches("alice", &ids(&["carol"]))
            .await
    );
    assert_eq!(ranked[0].breakdown[&Signal::Profile], 70);
    assert_eq!(ranked[0].confidence, Confidence::High);
}

#[tokio::test]
async fn blank_subject_is_rejected() {
    let state = state(Arc::new(MemoryDataAccess::new()), manual_clock());
    let err = assert_err!(state.matching.get_ranked_matches("  ", &ids(&["a"])).await);
    assert!(matches!(err, MatchError::Validation(_)));
}

// ── Caching ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn repeated_ranking_makes_no_backend_reads() {
    init_test_logger();
    let data = Arc::new(CountingDataAccess::new(conversation()));
    let state = state(data.clone() as Arc<dyn DataAccess>, manual_clock());
    let candidates = ids(&["bob", "carol"]);

    let first = assert_ok!(state.matching.get_ranked_matches("alice", &candidates).await);
    let reads = data.calls();
    assert!(reads > 0);

    let second = assert_ok!(state.matching.get_ranked_matches("alice", &candidates).await);
    assert_eq!(data.calls(), reads);

    assert!(first.iter().all(|r| !r.cached));
    assert!(second.iter().all(|r| r.cached));
    let scores = |ranked: &[matchmaker::models::RankedMatch]| {
        ranked
            .iter()
            .map(|r| (r.candidate_id.clone(), r.final_score, r.breakdown.clone()))
            .collect::<Vec<_>>()
    };
    assert_eq!(scores(&first), scores(&second));
}

#[tokio::test]
async fn cached_score_expires_after_seven_days() {
    init_test_logger();
    let clock = manual_clock();
    let state = state(Arc::new(conversation()), clock.clone());

    let (score, cached) = state.matching.score_pair("alice", "bob").await;
    assert!(!cached);
    assert_eq!(score.expires_at - score.computed_at, Duration::days(7));

    clock.set(score.expires_at - Duration::milliseconds(1));
    let (_, cached) = state.matching.score_pair("alice", "bob").await;
    assert!(cached);

    clock.set(score.expires_at + Duration::milliseconds(1));
    let (fresh, cached) = state.matching.score_pair("alice", "bob").await;
    assert!(!cached);
    assert_eq!(fresh.computed_at, score.expires_at + Duration::milliseconds(1));
}

#[tokio::test]
async fn invalidating_subject_forces_recompute() {
    init_test_logger();
    let state = state(Arc::new(conversation()), manual_clock());
    let candidates = ids(&["bob", "carol"]);

    assert_ok!(state.matching.get_ranked_matches("alice", &candidates).await);
    let removed = assert_ok!(state.matching.invalidate_subject("alice").await);
    assert_eq!(removed, 2);

    let ranked = assert_ok!(state.matching.get_ranked_matches("alice", &candidates).await);
    assert!(ranked.iter().all(|r| !r.cached));
}

#[tokio::test]
async fn outage_scores_are_not_cached() {
    init_test_logger();
    let data = Arc::new(SwitchableDataAccess::new(conversation()));
    let state = state(data.clone() as Arc<dyn DataAccess>, manual_clock());

    data.set_down(true);
    let (outage, cached) = state.matching.score_pair("alice", "bob").await;
    assert!(!cached);
    assert_eq!(outage.final_score, NEUTRAL_SCORE);
    assert_eq!(outage.confidence(), Confidence::None);

    data.set_down(false);
    let (recovered, cached) = state.matching.score_pair("alice", "bob").await;
    assert!(!cached);
    assert_eq!(recovered.breakdown[&Signal::Topics], 100);
    assert_eq!(recovered.confidence(), Confidence::High);

    let (_, cached) = state.matching.score_pair("alice", "bob").await;
    assert!(cached);
}
