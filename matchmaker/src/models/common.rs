use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One record as returned by the remote structured-data service.
pub type Row = serde_json::Map<String, Value>;

/// How far a fallback chain was exhausted to produce a value.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    #[default]
    None,
    Low,
    High,
}

impl std::fmt::Display for Confidence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::None => write!(f, "none"),
            Self::Low => write!(f, "low"),
            Self::High => write!(f, "high"),
        }
    }
}

/// Returns the first of `columns` holding a non-null value.
pub fn first_present<'a>(row: &'a Row, columns: &[&str]) -> Option<&'a Value> {
    columns
        .iter()
        .filter_map(|column| row.get(*column))
        .find(|value| !value.is_null())
}

/// Reads a string column, accepting numbers as well (ids are often numeric).
pub fn row_string(row: &Row, columns: &[&str]) -> Option<String> {
    match first_present(row, columns)? {
        Value::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

pub fn row_f64(row: &Row, columns: &[&str]) -> Option<f64> {
    match first_present(row, columns)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

pub fn row_timestamp(row: &Row, columns: &[&str]) -> Option<DateTime<Utc>> {
    parse_timestamp(first_present(row, columns)?)
}

/// Accepts RFC 3339, Postgres-style `YYYY-MM-DD HH:MM:SS[.f]`, bare dates and
/// epoch milliseconds.
pub fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => {
            let s = s.trim();
            if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
                return Some(dt.with_timezone(&Utc));
            }
            if let Ok(dt) = DateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f%#z") {
                return Some(dt.with_timezone(&Utc));
            }
            if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f") {
                return Some(Utc.from_utc_datetime(&naive));
            }
            if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f") {
                return Some(Utc.from_utc_datetime(&naive));
            }
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
                .map(|naive| Utc.from_utc_datetime(&naive))
        }
        Value::Number(n) => n
            .as_i64()
            .and_then(|millis| Utc.timestamp_millis_opt(millis).single()),
        _ => None,
    }
}

/// Reads a tag list stored either as a JSON array or a comma-separated string.
pub fn row_tags(row: &Row, columns: &[&str]) -> Vec<String> {
    let mut tags: Vec<String> = match first_present(row, columns) {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| item.as_str())
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect(),
        Some(Value::String(s)) => s
            .split(',')
            .map(|part| part.trim().to_string())
            .filter(|part| !part.is_empty())
            .collect(),
        _ => Vec::new(),
    };
    tags.sort();
    tags.dedup();
    tags
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;
    use serde_json::json;

    fn row(value: Value) -> Row {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn first_present_skips_nulls() {
        let r = row(json!({"recipient_id": null, "to_user_id": "u2"}));
        let value = first_present(&r, &["recipient_id", "to_user_id"]);
        assert_eq!(value, Some(&json!("u2")));
    }

    #[test]
    fn row_string_accepts_numeric_ids() {
        let r = row(json!({"id": 42}));
        assert_eq!(row_string(&r, &["id"]), Some("42".to_string()));
    }

    #[test]
    fn row_string_treats_blank_as_missing() {
        let r = row(json!({"industry": "   "}));
        assert_eq!(row_string(&r, &["industry"]), None);
    }

    #[test]
    fn parses_common_timestamp_shapes() {
        let rfc = parse_timestamp(&json!("2024-03-01T09:30:00Z")).unwrap();
        assert_eq!(rfc.hour(), 9);

        let pg = parse_timestamp(&json!("2024-03-01 09:30:00.123+00")).unwrap();
        assert_eq!(pg.minute(), 30);

        let naive = parse_timestamp(&json!("2024-03-01 22:15:00")).unwrap();
        assert_eq!(naive.hour(), 22);

        let date = parse_timestamp(&json!("2024-03-01")).unwrap();
        assert_eq!(date.hour(), 0);

        let millis = parse_timestamp(&json!(1_709_285_400_000i64)).unwrap();
        assert_eq!(millis.to_rfc3339(), "2024-03-01T09:30:00+00:00");
    }

    #[test]
    fn rejects_garbage_timestamps() {
        assert!(parse_timestamp(&json!("yesterday")).is_none());
        assert!(parse_timestamp(&json!(true)).is_none());
    }

    #[test]
    fn tags_from_array_or_csv() {
        let arr = row(json!({"skills": ["Rust", "AI", "Rust", ""]}));
        assert_eq!(row_tags(&arr, &["skills"]), vec!["AI", "Rust"]);

        let csv = row(json!({"skills": "sales, design ,"}));
        assert_eq!(row_tags(&csv, &["skills"]), vec!["design", "sales"]);
    }
}
