use chrono::Utc;
use libsql::{params, Connection};

use crate::error::Result;

pub struct ScoreEntryRepository;

impl ScoreEntryRepository {
    pub async fn get(conn: &Connection, key: &str) -> Result<Option<String>> {
        let mut rows = conn
            .query("SELECT value FROM score_cache WHERE key = ?", [key])
            .await?;

        if let Some(row) = rows.next().await? {
            Ok(Some(row.get::<String>(0)?))
        } else {
            Ok(None)
        }
    }

    pub async fn set(conn: &Connection, key: &str, value: &str) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        conn.execute(
            "INSERT INTO score_cache (key, value, updated_at) VALUES (?, ?, ?)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            [key, value, &now],
        )
        .await?;
        Ok(())
    }

    pub async fn delete(conn: &Connection, key: &str) -> Result<bool> {
        let affected = conn
            .execute("DELETE FROM score_cache WHERE key = ?", [key])
            .await?;
        Ok(affected > 0)
    }

    pub async fn delete_prefix(conn: &Connection, prefix: &str) -> Result<u64> {
        let affected = conn
            .execute(
                "DELETE FROM score_cache WHERE substr(key, 1, ?2) = ?1",
                params![prefix, prefix.chars().count() as i64],
            )
            .await?;
        Ok(affected)
    }

    pub async fn count(conn: &Connection) -> Result<u64> {
        let mut rows = conn.query("SELECT COUNT(*) FROM score_cache", ()).await?;
        match rows.next().await? {
            Some(row) => Ok(row.get::<i64>(0)?.max(0) as u64),
            None => Ok(0),
        }
    }
}
