use rusqlite::params;

use super::DbPool;
use crate::backend::PropertyStore;
use crate::types::error::{FilterError, Result};

pub struct SqlitePropertyStore {
    pool: DbPool,
}

impl SqlitePropertyStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl PropertyStore for SqlitePropertyStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let conn = self.pool.get()?;
        let result = conn.query_row(
            "SELECT value FROM properties WHERE key = ?1",
            params![key],
            |row| row.get(0),
        );

        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(FilterError::Database(e.to_string())),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let conn = self.pool.get()?;
        let now = chrono::Utc::now().timestamp_millis();

        conn.execute(
            "INSERT OR REPLACE INTO properties (key, value, updated_at) VALUES (?1, ?2, ?3)",
            params![key, value, now],
        )?;

        Ok(())
    }

    fn delete_all(&self) -> Result<()> {
        let conn = self.pool.get()?;
        conn.execute("DELETE FROM properties", [])?;
        Ok(())
    }
}
