use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

use crate::types::error::{FilterError, Result};

pub type DbPool = Pool<SqliteConnectionManager>;
pub type DbConnection = PooledConnection<SqliteConnectionManager>;

/// Writers from overlapping invocations wait this long on a busy database
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Single-file database holding properties, triggers and the lock row
#[derive(Clone)]
pub struct StateDatabase {
    pool: DbPool,
}

impl StateDatabase {
    /// Open (creating if needed) the database at `path`
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir).map_err(|e| {
                FilterError::Database(format!("Failed to create state db dir: {e}"))
            })?;
        }
        info!("Opening state database at {:?}", path);

        let manager = SqliteConnectionManager::file(path)
            .with_init(|conn| conn.busy_timeout(BUSY_TIMEOUT));
        let pool = Pool::builder().max_size(4).build(manager)?;

        let db = Self { pool };
        db.initialize_schema()?;
        Ok(db)
    }

    /// Create an in-memory database (for testing)
    pub fn in_memory() -> Result<Self> {
        let manager = SqliteConnectionManager::memory();
        let pool = Pool::builder().max_size(1).build(manager)?;

        let db = Self { pool };
        db.initialize_schema()?;
        Ok(db)
    }

    pub fn pool(&self) -> DbPool {
        self.pool.clone()
    }

    pub fn connection(&self) -> Result<DbConnection> {
        Ok(self.pool.get()?)
    }

    fn initialize_schema(&self) -> Result<()> {
        let conn = self.connection()?;

        conn.execute_batch(
            r#"
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;

            -- Flat key-value job state (version, total)
            CREATE TABLE IF NOT EXISTS properties (
                key         TEXT PRIMARY KEY,
                value       TEXT NOT NULL,
                updated_at  INTEGER NOT NULL    -- unix epoch ms
            );

            -- Recurring trigger registrations
            CREATE TABLE IF NOT EXISTS triggers (
                id          TEXT PRIMARY KEY,   -- UUID
                handler     TEXT NOT NULL,      -- 'run-queries' | 'email-results'
                schedule    TEXT NOT NULL,      -- JSON serialized Schedule
                created_at  TEXT NOT NULL       -- RFC 3339
            );

            -- Advisory lock rows, one per held lock name
            CREATE TABLE IF NOT EXISTS locks (
                name        TEXT PRIMARY KEY,
                owner       TEXT NOT NULL,      -- UUID of the holding handle
                acquired_at INTEGER NOT NULL    -- unix epoch ms
            );
            "#,
        )?;

        Ok(())
    }
}

/// Default database location under the platform data directory
pub fn default_db_path() -> Result<PathBuf> {
    dirs::data_local_dir()
        .map(|dir| dir.join("timed-filters").join("state.db"))
        .ok_or_else(|| {
            FilterError::Config("Failed to determine data directory; set storage.path".into())
        })
}
