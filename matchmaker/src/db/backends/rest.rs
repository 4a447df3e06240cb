//! [`DataAccess`] over a PostgREST-style HTTP API.
//!
//! Collections live under `{base}/rest/v1/{collection}`; the signed-in member
//! is resolved through `{base}/auth/v1/user`.

use std::sync::OnceLock;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use reqwest::{header, Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use url::Url;

use crate::config::BackendConfig;
use crate::db::traits::{DataAccess, Filter, Identity, Query};
use crate::error::{MatchError, Result};
use crate::models::Row;

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    code: Option<String>,
    message: Option<String>,
}

pub struct RestDataAccess {
    client: Client,
    base_url: Url,
    api_key: Option<String>,
    access_token: Option<String>,
}

impl RestDataAccess {
    pub fn new(config: &BackendConfig) -> Result<Self> {
        let raw = config
            .url
            .as_deref()
            .ok_or_else(|| MatchError::Validation("BACKEND_URL is not set".to_string()))?;
        let mut base_url = Url::parse(raw)?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()?;

        Ok(Self {
            client,
            base_url,
            api_key: config.api_key.clone(),
            access_token: config.access_token.clone(),
        })
    }

    fn collection_url(&self, collection: &str) -> Result<Url> {
        Ok(self.base_url.join(&format!("rest/v1/{collection}"))?)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        let request = match &self.api_key {
            Some(key) => request.header("apikey", key),
            None => request,
        };
        match self.access_token.as_ref().or(self.api_key.as_ref()) {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

#[async_trait]
impl DataAccess for RestDataAccess {
    async fn read(&self, collection: &str, query: &Query) -> Result<Vec<Row>> {
        let mut params = vec![("select".to_string(), "*".to_string())];
        params.extend(encode_filters(&query.filters));
        if let Some(sort) = &query.sort {
            let direction = if sort.descending { "desc" } else { "asc" };
            params.push(("order".to_string(), format!("{}.{direction}", sort.column)));
        }
        if let Some(limit) = query.limit {
            params.push(("limit".to_string(), limit.to_string()));
        }

        let request = self
            .client
            .get(self.collection_url(collection)?)
            .query(&params);
        let response = check(self.authorize(request).send().await?, collection).await?;

        let body: Value = response.json().await?;
        match body {
            Value::Array(items) => Ok(items
                .into_iter()
                .filter_map(|item| match item {
                    Value::Object(map) => Some(map),
                    _ => None,
                })
                .collect()),
            other => Err(MatchError::MalformedData(format!(
                "Expected an array of rows from {collection}, got {}",
                type_name(&other)
            ))),
        }
    }

    async fn count(&self, collection: &str, filters: &[Filter]) -> Result<u64> {
        let mut params = vec![
            ("select".to_string(), "*".to_string()),
            ("limit".to_string(), "1".to_string()),
        ];
        params.extend(encode_filters(filters));

        let request = self
            .client
            .get(self.collection_url(collection)?)
            .header("Prefer", "count=exact")
            .query(&params);
        let response = check(self.authorize(request).send().await?, collection).await?;

        let range = response
            .headers()
            .get(header::CONTENT_RANGE)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| {
                MatchError::MalformedData(format!("No Content-Range on count of {collection}"))
            })?;
        parse_content_range_total(range).ok_or_else(|| {
            MatchError::MalformedData(format!("Unparseable Content-Range '{range}'"))
        })
    }

    async fn current_identity(&self) -> Result<Identity> {
        let token = self
            .access_token
            .as_ref()
            .ok_or_else(|| MatchError::Backend("No access token configured".to_string()))?;

        let mut request = self
            .client
            .get(self.base_url.join("auth/v1/user")?)
            .bearer_auth(token);
        if let Some(key) = &self.api_key {
            request = request.header("apikey", key);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(MatchError::Backend(format!(
                "Identity lookup failed with {}",
                response.status()
            )));
        }
        let body: Value = response.json().await?;
        body.get("id")
            .and_then(Value::as_str)
            .map(|id| Identity { id: id.to_string() })
            .ok_or_else(|| MatchError::MalformedData("Identity response has no id".to_string()))
    }
}

/// Maps non-success responses onto the error taxonomy.
async fn check(response: Response, collection: &str) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let text = response.text().await.unwrap_or_default();
    let body: ErrorBody = serde_json::from_str(&text).unwrap_or_default();
    let message = body.message.clone().unwrap_or_else(|| text.clone());

    match body.code.as_deref() {
        Some("42703") | Some("PGRST204") | Some("PGRST100") => {
            let field = missing_column(&message).unwrap_or_else(|| "unknown".to_string());
            Err(MatchError::field_unavailable(collection, field))
        }
        Some("42P01") | Some("PGRST205") => Err(MatchError::DataUnavailable(collection.to_string())),
        _ if status == StatusCode::NOT_FOUND => {
            Err(MatchError::DataUnavailable(collection.to_string()))
        }
        _ => Err(MatchError::Backend(format!("{status}: {message}"))),
    }
}

fn missing_column(message: &str) -> Option<String> {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    let pattern = PATTERN
        .get_or_init(|| Regex::new(r#"column "?(?:\w+\.)?"?(\w+)"? does not exist"#).unwrap());
    pattern
        .captures(message)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .or_else(|| {
            message
                .split('\'')
                .nth(1)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        })
}

fn parse_content_range_total(range: &str) -> Option<u64> {
    range.rsplit('/').next()?.trim().parse().ok()
}

fn encode_filters(filters: &[Filter]) -> Vec<(String, String)> {
    let mut params = Vec::new();
    for filter in filters {
        match filter {
            Filter::And(inner) => params.extend(encode_filters(inner)),
            Filter::Or(inner) => {
                let terms: Vec<String> = inner.iter().map(encode_term).collect();
                params.push(("or".to_string(), format!("({})", terms.join(","))));
            }
            Filter::Eq(column, Value::Null) | Filter::IsNull(column) => {
                params.push((column.clone(), "is.null".to_string()));
            }
            Filter::Eq(column, value) => params.push((column.clone(), format!("eq.{}", render(value)))),
            Filter::In(column, values) => {
                let list: Vec<String> = values.iter().map(|v| quote(&render(v))).collect();
                params.push((column.clone(), format!("in.({})", list.join(","))));
            }
            Filter::Gte(column, value) => {
                params.push((column.clone(), format!("gte.{}", render(value))))
            }
            Filter::Lte(column, value) => {
                params.push((column.clone(), format!("lte.{}", render(value))))
            }
        }
    }
    params
}

/// Encodes one predicate in the nested `column.op.value` form used inside
/// `or=(...)` and `and(...)` groups.
fn encode_term(filter: &Filter) -> String {
    match filter {
        Filter::Eq(column, Value::Null) | Filter::IsNull(column) => format!("{column}.is.null"),
        Filter::Eq(column, value) => format!("{column}.eq.{}", quote(&render(value))),
        Filter::In(column, values) => {
            let list: Vec<String> = values.iter().map(|v| quote(&render(v))).collect();
            format!("{column}.in.({})", list.join(","))
        }
        Filter::Gte(column, value) => format!("{column}.gte.{}", quote(&render(value))),
        Filter::Lte(column, value) => format!("{column}.lte.{}", quote(&render(value))),
        Filter::And(inner) => format!(
            "and({})",
            inner.iter().map(encode_term).collect::<Vec<_>>().join(",")
        ),
        Filter::Or(inner) => format!(
            "or({})",
            inner.iter().map(encode_term).collect::<Vec<_>>().join(",")
        ),
    }
}

fn render(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "null".to_string(),
        other => other.to_string(),
    }
}

fn quote(raw: &str) -> String {
    if raw.contains([',', '(', ')', '"', ':']) {
        format!("\"{}\"", raw.replace('"', "\\\""))
    } else {
        raw.to_string()
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
