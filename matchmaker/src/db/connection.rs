use libsql::{Builder, Connection};
use std::sync::Arc;

use crate::config::DatabaseConfig;
use crate::error::Result;

use super::schema;

/// Handle on the libSQL database that backs the durable score cache.
#[derive(Clone)]
pub struct Database {
    pub(crate) db: Arc<libsql::Database>,
}

impl Database {
    pub async fn new(config: &DatabaseConfig) -> Result<Self> {
        let db = if config.url.starts_with("libsql://") || config.url.starts_with("https://") {
            let token = config.auth_token.clone().unwrap_or_default();
            match config.local_path {
                Some(ref local_path) => {
                    Builder::new_remote_replica(local_path, config.url.clone(), token)
                        .build()
                        .await?
                }
                None => Builder::new_remote(config.url.clone(), token).build().await?,
            }
        } else if config.url == ":memory:" {
            Builder::new_local(":memory:").build().await?
        } else {
            let path = config.url.strip_prefix("file:").unwrap_or(&config.url);
            Builder::new_local(path).build().await?
        };

        let database = Self { db: Arc::new(db) };
        if !config.is_remote() {
            database.configure_pragmas(config).await;
        }
        schema::init_schema(&database.connect()?).await?;

        tracing::debug!(url = %config.url, "Score cache database ready");
        Ok(database)
    }

    pub fn connect(&self) -> Result<Connection> {
        Ok(self.db.connect()?)
    }

    async fn configure_pragmas(&self, config: &DatabaseConfig) {
        let conn = match self.connect() {
            Ok(conn) => conn,
            Err(error) => {
                tracing::warn!(error = %error, "Skipping SQLite pragmas");
                return;
            }
        };

        let pragmas = [
            format!("PRAGMA busy_timeout = {}", config.busy_timeout_ms),
            format!(
                "PRAGMA journal_mode = {}",
                normalize_journal_mode(&config.journal_mode)
            ),
            format!(
                "PRAGMA synchronous = {}",
                normalize_synchronous(&config.synchronous)
            ),
        ];
        for sql in pragmas {
            if let Err(error) = conn.execute_batch(&sql).await {
                tracing::warn!(pragma = %sql, error = %error, "Failed to apply SQLite pragma");
            }
        }
    }
}

fn normalize_journal_mode(value: &str) -> &'static str {
    match value.trim().to_uppercase().as_str() {
        "DELETE" => "DELETE",
        "TRUNCATE" => "TRUNCATE",
        "MEMORY" => "MEMORY",
        "OFF" => "OFF",
        _ => "WAL",
    }
}

fn normalize_synchronous(value: &str) -> &'static str {
    match value.trim().to_uppercase().as_str() {
        "OFF" => "OFF",
        "FULL" => "FULL",
        _ => "NORMAL",
    }
}
