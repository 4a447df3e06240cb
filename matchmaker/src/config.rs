use serde::Deserialize;
use std::env;

use crate::scoring::WeightPreset;

fn parse_env_or<T: std::str::FromStr>(var: &str, default: T) -> T
where
    T::Err: std::fmt::Display,
{
    match env::var(var) {
        Ok(val) => match val.parse() {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::warn!("Invalid value '{}' for {}: {}. Using default.", val, var, e);
                default
            }
        },
        Err(_) => default,
    }
}

fn env_opt(var: &str) -> Option<String> {
    env::var(var).ok().filter(|v| !v.trim().is_empty())
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub backend: BackendConfig,
    pub cache_database: DatabaseConfig,
    pub matching: MatchingConfig,
    pub metrics: MetricsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Where member data is read from. `url` selects the PostgREST backend,
/// otherwise `fixture` loads the in-memory one.
#[derive(Debug, Clone, Deserialize)]
pub struct BackendConfig {
    pub url: Option<String>,
    pub api_key: Option<String>,
    pub access_token: Option<String>,
    pub fixture: Option<String>,
    pub timeout_ms: u64,
    /// Drop every detected schema this often so drift is picked up. 0
    /// keeps detections until invalidated by hand.
    pub schema_refresh_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            url: None,
            api_key: None,
            access_token: None,
            fixture: None,
            timeout_ms: 5000,
            schema_refresh_secs: 600,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub auth_token: Option<String>,
    pub local_path: Option<String>,
    pub busy_timeout_ms: u64,
    pub journal_mode: String,
    pub synchronous: String,
}

impl DatabaseConfig {
    pub fn is_remote(&self) -> bool {
        self.url.starts_with("libsql://") || self.url.starts_with("https://")
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "file:matchmaker-cache.db".to_string(),
            auth_token: None,
            local_path: None,
            busy_timeout_ms: 5000,
            journal_mode: "WAL".to_string(),
            synchronous: "NORMAL".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MatchingConfig {
    pub weight_preset: WeightPreset,
    /// Candidates scored at once within one ranking.
    pub max_concurrency: usize,
    pub signal_timeout_ms: u64,
    pub score_ttl_secs: u64,
    /// Most recent messages per member read for topic extraction.
    pub topic_window: usize,
    /// Most recent messages per member read for the hourly histogram.
    pub activity_window: usize,
    /// Most recent messages exchanged between the two members.
    pub pair_window: usize,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            weight_preset: WeightPreset::Simple,
            max_concurrency: 8,
            signal_timeout_ms: 3000,
            score_ttl_secs: 7 * 24 * 60 * 60,
            topic_window: 50,
            activity_window: 100,
            pair_window: 100,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    pub cache_ttl_secs: u64,
    pub cache_capacity: usize,
    pub strategy_timeout_ms: u64,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            cache_ttl_secs: 30,
            cache_capacity: 256,
            strategy_timeout_ms: 3000,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        let backend_defaults = BackendConfig::default();
        let db_defaults = DatabaseConfig::default();
        let matching_defaults = MatchingConfig::default();
        let metric_defaults = MetricsConfig::default();

        Self {
            server: ServerConfig {
                host: env::var("MATCHMAKER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: parse_env_or("MATCHMAKER_PORT", 3000),
            },
            backend: BackendConfig {
                url: env_opt("BACKEND_URL"),
                api_key: env_opt("BACKEND_API_KEY"),
                access_token: env_opt("BACKEND_ACCESS_TOKEN"),
                fixture: env_opt("BACKEND_FIXTURE"),
                timeout_ms: parse_env_or("BACKEND_TIMEOUT_MS", backend_defaults.timeout_ms),
                schema_refresh_secs: parse_env_or(
                    "BACKEND_SCHEMA_REFRESH_SECS",
                    backend_defaults.schema_refresh_secs,
                ),
            },
            cache_database: DatabaseConfig {
                url: env::var("CACHE_DATABASE_URL").unwrap_or(db_defaults.url),
                auth_token: env_opt("CACHE_DATABASE_AUTH_TOKEN"),
                local_path: env_opt("CACHE_DATABASE_LOCAL_PATH"),
                busy_timeout_ms: parse_env_or(
                    "CACHE_DATABASE_BUSY_TIMEOUT_MS",
                    db_defaults.busy_timeout_ms,
                ),
                journal_mode: env::var("CACHE_DATABASE_JOURNAL_MODE")
                    .unwrap_or(db_defaults.journal_mode),
                synchronous: env::var("CACHE_DATABASE_SYNCHRONOUS")
                    .unwrap_or(db_defaults.synchronous),
            },
            matching: MatchingConfig {
                weight_preset: parse_env_or(
                    "MATCH_WEIGHT_PRESET",
                    matching_defaults.weight_preset,
                ),
                max_concurrency: parse_env_or(
                    "MATCH_MAX_CONCURRENCY",
                    matching_defaults.max_concurrency,
                )
                .max(1),
                signal_timeout_ms: parse_env_or(
                    "MATCH_SIGNAL_TIMEOUT_MS",
                    matching_defaults.signal_timeout_ms,
                ),
                score_ttl_secs: parse_env_or("MATCH_SCORE_TTL_SECS", matching_defaults.score_ttl_secs),
                topic_window: parse_env_or("MATCH_TOPIC_WINDOW", matching_defaults.topic_window),
                activity_window: parse_env_or(
                    "MATCH_ACTIVITY_WINDOW",
                    matching_defaults.activity_window,
                ),
                pair_window: parse_env_or("MATCH_PAIR_WINDOW", matching_defaults.pair_window),
            },
            metrics: MetricsConfig {
                cache_ttl_secs: parse_env_or("METRIC_CACHE_TTL_SECS", metric_defaults.cache_ttl_secs),
                cache_capacity: parse_env_or(
                    "METRIC_CACHE_CAPACITY",
                    metric_defaults.cache_capacity,
                )
                .max(1),
                strategy_timeout_ms: parse_env_or(
                    "METRIC_STRATEGY_TIMEOUT_MS",
                    metric_defaults.strategy_timeout_ms,
                ),
            },
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::default()
    }
}
