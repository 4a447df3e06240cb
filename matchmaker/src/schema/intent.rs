use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::Value;

use crate::db::{Filter, Query, Sort};
use crate::models::{PROFILE_ID_COLUMNS, TIMESTAMP_COLUMNS};

/// What a caller wants to filter on, independent of how the column is named
/// in a particular deployment.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryIntent {
    EventDateRange {
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    },
    MatchDateRange {
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    },
    CreatedRange {
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    },
    Unread,
    Recipient(String),
    Sender(String),
    /// The row describing this member.
    Member(String),
    /// Newest rows first.
    Newest,
    /// Status in the given set, or unset.
    Status(Vec<String>),
    ActivityType(Vec<String>),
}

impl QueryIntent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::EventDateRange { .. } => "event_date_range",
            Self::MatchDateRange { .. } => "match_date_range",
            Self::CreatedRange { .. } => "created_range",
            Self::Unread => "unread",
            Self::Recipient(_) => "recipient",
            Self::Sender(_) => "sender",
            Self::Member(_) => "member",
            Self::Newest => "newest",
            Self::Status(_) => "status",
            Self::ActivityType(_) => "activity_type",
        }
    }

    /// Candidate columns, most preferred first.
    pub fn candidates(&self) -> &'static [&'static str] {
        match self {
            Self::EventDateRange { .. } => &["event_date", "date", "start_date", "created_at"],
            Self::MatchDateRange { .. } => &["matched_at", "created_at"],
            Self::CreatedRange { .. } => &["created_at", "inserted_at"],
            Self::Unread => &["is_read", "read_at", "read"],
            Self::Recipient(_) => &["recipient_id", "to_user_id", "receiver_id"],
            Self::Sender(_) => &["sender_id", "from_user_id", "user_id"],
            Self::Member(_) => PROFILE_ID_COLUMNS,
            Self::Newest => TIMESTAMP_COLUMNS,
            Self::Status(_) => &["status", "state"],
            Self::ActivityType(_) => &["activity_type", "type", "action"],
        }
    }

    /// Adds this intent to `query` against `column`.
    pub fn apply(&self, query: Query, column: &str) -> Query {
        match self.filter_for(column) {
            Some(filter) => query.filter(filter),
            None => query.sort(Sort::desc(column)),
        }
    }

    /// Predicate expressing this intent against `column`; `None` for
    /// ordering intents.
    pub fn filter_for(&self, column: &str) -> Option<Filter> {
        let filter = match self {
            Self::EventDateRange { from, to }
            | Self::MatchDateRange { from, to }
            | Self::CreatedRange { from, to } => Filter::And(vec![
                Filter::gte(column, timestamp(from)),
                Filter::lte(column, timestamp(to)),
            ]),
            Self::Unread => match column {
                "read_at" => Filter::is_null(column),
                _ => Filter::eq(column, false),
            },
            Self::Recipient(id) | Self::Sender(id) | Self::Member(id) => {
                Filter::eq(column, id.as_str())
            }
            Self::Newest => return None,
            Self::Status(values) => Filter::Or(vec![
                Filter::In(
                    column.to_string(),
                    values.iter().map(|v| Value::from(v.as_str())).collect(),
                ),
                Filter::is_null(column),
            ]),
            Self::ActivityType(values) => Filter::In(
                column.to_string(),
                values.iter().map(|v| Value::from(v.as_str())).collect(),
            ),
        };
        Some(filter)
    }
}

fn timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn unread_predicate_depends_on_column() {
        assert_eq!(QueryIntent::Unread.filter_for("read_at"), Some(Filter::is_null("read_at")));
        assert_eq!(QueryIntent::Unread.filter_for("is_read"), Some(Filter::eq("is_read", false)));
    }

    #[test]
    fn date_range_is_inclusive_pair() {
        let from = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();
        let to = Utc.with_ymd_and_hms(2024, 5, 31, 23, 59, 59).unwrap();
        let filter = QueryIntent::EventDateRange { from, to }.filter_for("start_date");
        assert_eq!(
            filter,
            Some(Filter::And(vec![
                Filter::gte("start_date", "2024-05-01T00:00:00.000Z"),
                Filter::lte("start_date", "2024-05-31T23:59:59.000Z"),
            ]))
        );
    }

    #[test]
    fn event_dates_prefer_event_date() {
        let now = Utc::now();
        let intent = QueryIntent::EventDateRange { from: now, to: now };
        assert_eq!(intent.candidates()[0], "event_date");
        assert_eq!(intent.candidates().last(), Some(&"created_at"));
    }

    #[test]
    fn newest_orders_instead_of_filtering() {
        let query = QueryIntent::Newest.apply(Query::new().limit(5), "sent_at");
        assert!(query.filters.is_empty());
        assert_eq!(query.sort, Some(Sort::desc("sent_at")));
    }

    #[test]
    fn member_accepts_alternate_key_columns() {
        let intent = QueryIntent::Member("u1".into());
        assert_eq!(intent.candidates(), &["id", "user_id", "member_id"]);
        let query = intent.apply(Query::new(), "member_id");
        assert_eq!(query.filters, vec![Filter::eq("member_id", "u1")]);
    }
}
