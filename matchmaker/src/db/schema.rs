use libsql::Connection;

use crate::error::Result;

pub async fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        -- Durable pairwise score entries, keyed match_score:{subject}:{target}
        CREATE TABLE IF NOT EXISTS score_cache (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_score_cache_updated_at ON score_cache(updated_at);
        "#,
    )
    .await?;

    Ok(())
}
