use async_trait::async_trait;

use crate::db::connection::Database;
use crate::db::repository::ScoreEntryRepository;
use crate::db::traits::ScoreStore;
use crate::error::Result;

/// [`ScoreStore`] persisted in a local or remote libSQL database.
pub struct LibSqlScoreStore {
    db: Database,
}

impl LibSqlScoreStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub async fn len(&self) -> Result<u64> {
        let conn = self.db.connect()?;
        ScoreEntryRepository::count(&conn).await
    }
}

#[async_trait]
impl ScoreStore for LibSqlScoreStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let conn = self.db.connect()?;
        ScoreEntryRepository::get(&conn, key).await
    }
    async fn put(&self, key: &str, value: &str) -> Result<()> {
        let conn = self.db.connect()?;
        ScoreEntryRepository::set(&conn, key, value).await
    }
    async fn remove(&self, key: &str) -> Result<bool> {
        let conn = self.db.connect()?;
        ScoreEntryRepository::delete(&conn, key).await
    }
    async fn remove_prefix(&self, prefix: &str) -> Result<u64> {
        let conn = self.db.connect()?;
        ScoreEntryRepository::delete_prefix(&conn, prefix).await
    }
}
