use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{row_f64, row_string, row_tags, row_timestamp, Row};

pub const PROFILE_ID_COLUMNS: &[&str] = &["id", "user_id", "member_id"];
pub const SENDER_COLUMNS: &[&str] = &["sender_id", "from_user_id", "user_id"];
pub const RECIPIENT_COLUMNS: &[&str] = &["recipient_id", "receiver_id", "to_user_id"];
pub const CONTENT_COLUMNS: &[&str] = &["content", "body", "message"];
pub const TIMESTAMP_COLUMNS: &[&str] = &["created_at", "sent_at", "timestamp"];
pub const SENTIMENT_COLUMNS: &[&str] = &["sentiment", "sentiment_score"];

/// Snapshot of a member profile, immutable for the duration of a scoring pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub id: String,
    pub display_name: Option<String>,
    pub title: Option<String>,
    pub company: Option<String>,
    pub industry: Option<String>,
    pub location: Option<String>,
    pub skills: Vec<String>,
    pub bio: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub last_active_at: Option<DateTime<Utc>>,
}

impl Profile {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    /// Builds a profile from a backend row, tolerating the column spellings
    /// seen across deployments. Returns `None` when the row carries no id.
    pub fn from_row(row: &Row) -> Option<Self> {
        Some(Self {
            id: row_string(row, PROFILE_ID_COLUMNS)?,
            display_name: row_string(row, &["display_name", "name", "full_name"]),
            title: row_string(row, &["title", "position"]),
            company: row_string(row, &["company", "company_name"]),
            industry: row_string(row, &["industry"]),
            location: row_string(row, &["location", "region"]),
            skills: row_tags(row, &["skills", "tags"]),
            bio: row_string(row, &["bio", "introduction"]),
            created_at: row_timestamp(row, &["created_at"]),
            last_active_at: row_timestamp(row, &["last_active_at", "last_login_at", "updated_at"]),
        })
    }
}

/// One message in the historical interaction log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InteractionRecord {
    pub sender_id: String,
    pub recipient_id: Option<String>,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    /// Signed sentiment label, present only on sentiment-labeled history.
    pub sentiment: Option<f64>,
}

impl InteractionRecord {
    /// Normalises a message row. Rows without a sender or a parseable
    /// timestamp are rejected.
    pub fn from_row(row: &Row) -> Option<Self> {
        Some(Self {
            sender_id: row_string(row, SENDER_COLUMNS)?,
            recipient_id: row_string(row, RECIPIENT_COLUMNS),
            content: row_string(row, CONTENT_COLUMNS).unwrap_or_default(),
            timestamp: row_timestamp(row, TIMESTAMP_COLUMNS)?,
            sentiment: row_f64(row, SENTIMENT_COLUMNS),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn profile_from_row_reads_aliases() {
        let row = json!({
            "id": "u1",
            "name": "Aiko",
            "company_name": "Kumo",
            "industry": "IT",
            "skills": ["Rust", "Sales"],
            "bio": null
        });
        let profile = Profile::from_row(row.as_object().unwrap()).unwrap();
        assert_eq!(profile.display_name.as_deref(), Some("Aiko"));
        assert_eq!(profile.company.as_deref(), Some("Kumo"));
        assert_eq!(profile.skills, vec!["Rust", "Sales"]);
        assert!(profile.bio.is_none());
    }

    #[test]
    fn profile_without_id_is_rejected() {
        let row = json!({"industry": "IT"});
        assert!(Profile::from_row(row.as_object().unwrap()).is_none());
    }

    #[test]
    fn interaction_from_row_reads_alternate_columns() {
        let row = json!({
            "from_user_id": "a",
            "to_user_id": "b",
            "body": "hello",
            "sent_at": "2024-05-01T10:00:00Z",
            "sentiment": 0.4
        });
        let record = InteractionRecord::from_row(row.as_object().unwrap()).unwrap();
        assert_eq!(record.sender_id, "a");
        assert_eq!(record.recipient_id.as_deref(), Some("b"));
        assert_eq!(record.content, "hello");
        assert_eq!(record.sentiment, Some(0.4));
    }

    #[test]
    fn interaction_without_timestamp_is_skipped() {
        let row = json!({"sender_id": "a", "content": "hi"});
        assert!(InteractionRecord::from_row(row.as_object().unwrap()).is_none());
    }
}
