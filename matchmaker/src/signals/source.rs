use crate::db::Query;
use crate::error::Result;
use crate::models::{InteractionRecord, Profile};
use crate::schema::{QueryBuilder, QueryIntent};

pub const MESSAGES: &str = "messages";
pub const PROFILES: &str = "profiles";

/// Bounded reads of the interaction log and profiles shared by the
/// extractors. Holds no state beyond the query builder.
#[derive(Clone)]
pub struct InteractionSource {
    queries: QueryBuilder,
}

impl InteractionSource {
    pub fn new(queries: QueryBuilder) -> Self {
        Self { queries }
    }

    pub fn queries(&self) -> &QueryBuilder {
        &self.queries
    }

    /// Most recent `limit` messages sent by `member`, newest first.
    pub async fn sent_by(&self, member: &str, limit: usize) -> Result<Vec<InteractionRecord>> {
        let rows = self
            .queries
            .read(
                MESSAGES,
                &[QueryIntent::Sender(member.to_string()), QueryIntent::Newest],
                &Query::new().limit(limit),
            )
            .await?;
        let mut records = parse(rows.value, |r| r.sender_id == member);
        newest_first(&mut records);
        records.truncate(limit);
        Ok(records)
    }

    /// Messages exchanged between `a` and `b` in either direction, oldest
    /// first, at most `limit` of the most recent.
    pub async fn between(&self, a: &str, b: &str, limit: usize) -> Result<Vec<InteractionRecord>> {
        let (from_a, from_b) = tokio::join!(self.directed(a, b, limit), self.directed(b, a, limit));
        let mut records = from_a?;
        records.extend(from_b?);
        newest_first(&mut records);
        records.truncate(limit);
        records.reverse();
        Ok(records)
    }

    async fn directed(&self, from: &str, to: &str, limit: usize) -> Result<Vec<InteractionRecord>> {
        let rows = self
            .queries
            .read(
                MESSAGES,
                &[
                    QueryIntent::Sender(from.to_string()),
                    QueryIntent::Recipient(to.to_string()),
                    QueryIntent::Newest,
                ],
                &Query::new().limit(limit),
            )
            .await?;
        Ok(parse(rows.value, |r| {
            r.sender_id == from && r.recipient_id.as_deref() == Some(to)
        }))
    }

    /// `Ok(None)` when the member has no profile row.
    pub async fn profile(&self, member: &str) -> Result<Option<Profile>> {
        let rows = self
            .queries
            .read(
                PROFILES,
                &[QueryIntent::Member(member.to_string())],
                &Query::new().limit(1),
            )
            .await?;
        Ok(rows
            .value
            .iter()
            .filter_map(Profile::from_row)
            .find(|profile| profile.id == member))
    }
}

/// Rows whose filter column was dropped come back unfiltered, so the
/// predicate is re-checked on the normalised record.
fn parse(
    rows: Vec<crate::models::Row>,
    keep: impl Fn(&InteractionRecord) -> bool,
) -> Vec<InteractionRecord> {
    rows.iter()
        .filter_map(InteractionRecord::from_row)
        .filter(|r| keep(r))
        .collect()
}

fn newest_first(records: &mut [InteractionRecord]) {
    records.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryDataAccess;
    use crate::signals::testing;
    use serde_json::json;

    fn log() -> MemoryDataAccess {
        MemoryDataAccess::new().with_collection(
            "messages",
            vec![
                json!({"sender_id": "a", "recipient_id": "b", "content": "1", "created_at": "2024-05-01T09:00:00Z"}),
                json!({"sender_id": "b", "recipient_id": "a", "content": "2", "created_at": "2024-05-01T10:00:00Z"}),
                json!({"sender_id": "a", "recipient_id": "c", "content": "3", "created_at": "2024-05-01T11:00:00Z"}),
                json!({"sender_id": "a", "recipient_id": "b", "content": "4", "created_at": "2024-05-01T12:00:00Z"}),
            ],
        )
    }

    #[tokio::test]
    async fn sent_by_is_newest_first_and_bounded() {
        let source = testing::source(log());
        let sent = source.sent_by("a", 2).await.unwrap();
        let contents: Vec<_> = sent.iter().map(|r| r.content.as_str()).collect();
        assert_eq!(contents, vec!["4", "3"]);
    }

    #[tokio::test]
    async fn between_merges_both_directions_oldest_first() {
        let source = testing::source(log());
        let pair = source.between("a", "b", 10).await.unwrap();
        let contents: Vec<_> = pair.iter().map(|r| r.content.as_str()).collect();
        assert_eq!(contents, vec!["1", "2", "4"]);
    }

    #[tokio::test]
    async fn profile_lookup_by_id() {
        let source = testing::source(MemoryDataAccess::new().with_collection(
            "profiles",
            vec![json!({"id": "a", "industry": "IT"}), json!({"id": "b"})],
        ));
        let profile = source.profile("a").await.unwrap().unwrap();
        assert_eq!(profile.industry.as_deref(), Some("IT"));
        assert!(source.profile("z").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn profile_lookup_by_alternate_key() {
        let source = testing::source(MemoryDataAccess::new().with_collection(
            "profiles",
            vec![
                json!({"user_id": "a", "industry": "IT"}),
                json!({"user_id": "b", "industry": "Retail"}),
            ],
        ));
        let profile = source.profile("b").await.unwrap().unwrap();
        assert_eq!(profile.id, "b");
        assert_eq!(profile.industry.as_deref(), Some("Retail"));

        let source = testing::source(MemoryDataAccess::new().with_collection(
            "profiles",
            vec![json!({"member_id": "m1", "location": "Osaka"})],
        ));
        let profile = source.profile("m1").await.unwrap().unwrap();
        assert_eq!(profile.location.as_deref(), Some("Osaka"));
    }

    #[tokio::test]
    async fn recent_window_orders_by_sent_at() {
        let source = testing::source(MemoryDataAccess::new().with_collection(
            "messages",
            vec![
                json!({"sender_id": "a", "body": "old", "sent_at": "2024-05-01T09:00:00Z"}),
                json!({"sender_id": "a", "body": "mid", "sent_at": "2024-05-02T09:00:00Z"}),
                json!({"sender_id": "a", "body": "new", "sent_at": "2024-05-03T09:00:00Z"}),
            ],
        ));
        let sent = source.sent_by("a", 2).await.unwrap();
        let contents: Vec<_> = sent.iter().map(|r| r.content.as_str()).collect();
        assert_eq!(contents, vec!["new", "mid"]);
    }
}
