use std::time::{Duration, Instant};

use rusqlite::{params, OptionalExtension};
use tracing::{debug, warn};
use uuid::Uuid;

use super::DbPool;
use crate::backend::AdvisoryLock;
use crate::types::error::{FilterError, Result};

/// Name of the single lock row every entry point competes for
pub const JOB_LOCK: &str = "timed-filters";

/// Advisory lock backed by a row in the `locks` table
///
/// Each handle gets its own owner token, so a handle can only release a row
/// it inserted. A holder pushes `acquired_at` forward with `renew`; a row
/// not renewed within the lease is treated as left behind by a crashed
/// process and is taken over.
pub struct SqliteLock {
    pool: DbPool,
    name: String,
    owner: String,
    lease: Duration,
    poll_interval: Duration,
}

impl SqliteLock {
    pub fn new(pool: DbPool, lease: Duration, poll_interval: Duration) -> Self {
        Self {
            pool,
            name: JOB_LOCK.to_string(),
            owner: Uuid::new_v4().to_string(),
            lease,
            poll_interval,
        }
    }

    fn attempt(&self) -> Result<bool> {
        let conn = self.pool.get()?;
        let now = chrono::Utc::now().timestamp_millis();
        let stale_before = now - self.lease.as_millis() as i64;

        let stale: Option<(String, i64)> = conn
            .query_row(
                "SELECT owner, acquired_at FROM locks WHERE name = ?1 AND acquired_at < ?2",
                params![self.name, stale_before],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;
        if let Some((holder, acquired_at)) = stale {
            let deleted = conn.execute(
                "DELETE FROM locks WHERE name = ?1 AND owner = ?2 AND acquired_at = ?3",
                params![self.name, holder, acquired_at],
            )?;
            if deleted > 0 {
                warn!(
                    "Breaking lock '{}': holder {} has not renewed it for {} minutes. \
                     If it is still running, runs may now overlap.",
                    self.name,
                    holder,
                    (now - acquired_at) / 60_000
                );
            }
        }

        let inserted = conn.execute(
            "INSERT OR IGNORE INTO locks (name, owner, acquired_at) VALUES (?1, ?2, ?3)",
            params![self.name, self.owner, now],
        )?;
        Ok(inserted == 1)
    }
}

impl AdvisoryLock for SqliteLock {
    fn try_acquire(&self, timeout: Duration) -> Result<bool> {
        let deadline = Instant::now() + timeout;
        loop {
            if self.attempt()? {
                debug!("Acquired lock '{}' as {}", self.name, self.owner);
                return Ok(true);
            }

            let now = Instant::now();
            if now >= deadline {
                return Ok(false);
            }
            std::thread::sleep(self.poll_interval.min(deadline - now));
        }
    }

    fn renew(&self) -> Result<()> {
        let conn = self.pool.get()?;
        let renewed = conn.execute(
            "UPDATE locks SET acquired_at = ?3 WHERE name = ?1 AND owner = ?2",
            params![self.name, self.owner, chrono::Utc::now().timestamp_millis()],
        )?;
        if renewed == 0 {
            return Err(FilterError::Database(format!(
                "lock '{}' was taken over from {} after its lease expired",
                self.name, self.owner
            )));
        }
        Ok(())
    }

    fn release(&self) -> Result<()> {
        let conn = self.pool.get()?;
        let removed = conn.execute(
            "DELETE FROM locks WHERE name = ?1 AND owner = ?2",
            params![self.name, self.owner],
        )?;
        if removed == 0 {
            warn!("Lock '{}' was no longer held by {}", self.name, self.owner);
        }
        Ok(())
    }
}
