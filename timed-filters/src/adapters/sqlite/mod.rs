//! SQLite-backed state: properties, trigger registrations and the job lock

mod db;
mod lock;
mod properties;
mod triggers;

pub use db::{default_db_path, DbConnection, DbPool, StateDatabase};
pub use lock::{SqliteLock, JOB_LOCK};
pub use properties::SqlitePropertyStore;
pub use triggers::SqliteTriggers;
