use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum MatchError {
    /// The collection (table) does not exist on the backend.
    #[error("Collection unavailable: {0}")]
    DataUnavailable(String),

    /// A column the query relied on is absent from the collection.
    #[error("Field unavailable: {collection}.{field}")]
    FieldUnavailable { collection: String, field: String },

    #[error("Remote call timed out after {0:?}")]
    Timeout(Duration),

    #[error("Malformed data: {0}")]
    MalformedData(String),

    #[error("Backend error: {0}")]
    Backend(String),

    #[error("Database error: {0}")]
    Database(#[from] libsql::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Request superseded by a newer ranking for {0}")]
    Superseded(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl MatchError {
    /// Expected failures of the data layer. Scoring and metric code still
    /// falls back on every error, but anything else is logged as a fault.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            MatchError::DataUnavailable(_)
                | MatchError::FieldUnavailable { .. }
                | MatchError::Timeout(_)
                | MatchError::MalformedData(_)
                | MatchError::Backend(_)
                | MatchError::Http(_)
                | MatchError::Json(_)
        )
    }

    pub fn field_unavailable(collection: impl Into<String>, field: impl Into<String>) -> Self {
        MatchError::FieldUnavailable {
            collection: collection.into(),
            field: field.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, MatchError>;
