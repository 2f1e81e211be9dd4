use chrono::{DateTime, Utc};
use rusqlite::params;
use uuid::Uuid;

use super::DbPool;
use crate::backend::TriggerAdmin;
use crate::types::error::{FilterError, Result};
use crate::types::{HandlerId, Schedule, Trigger};

/// Trigger registrations kept in the `triggers` table
///
/// The rows are the source of truth for `timed-filters crontab`, which
/// renders them for the system scheduler.
pub struct SqliteTriggers {
    pool: DbPool,
}

impl SqliteTriggers {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

struct TriggerRow {
    id: String,
    handler: String,
    schedule: String,
    created_at: String,
}

impl TryFrom<TriggerRow> for Trigger {
    type Error = FilterError;

    fn try_from(row: TriggerRow) -> Result<Self> {
        let created_at = DateTime::parse_from_rfc3339(&row.created_at)
            .map_err(|e| FilterError::Parse(format!("trigger {} created_at: {}", row.id, e)))?
            .with_timezone(&Utc);

        Ok(Trigger {
            handler: row.handler.parse()?,
            schedule: serde_json::from_str(&row.schedule)?,
            id: row.id,
            created_at,
        })
    }
}

impl TriggerAdmin for SqliteTriggers {
    fn list(&self) -> Result<Vec<Trigger>> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(
            "SELECT id, handler, schedule, created_at FROM triggers ORDER BY rowid",
        )?;

        let rows = stmt
            .query_map([], |row| {
                Ok(TriggerRow {
                    id: row.get(0)?,
                    handler: row.get(1)?,
                    schedule: row.get(2)?,
                    created_at: row.get(3)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        rows.into_iter().map(Trigger::try_from).collect()
    }

    fn create(&self, handler: HandlerId, schedule: Schedule) -> Result<Trigger> {
        let trigger = Trigger {
            id: Uuid::new_v4().to_string(),
            handler,
            schedule,
            created_at: Utc::now(),
        };

        let conn = self.pool.get()?;
        conn.execute(
            "INSERT INTO triggers (id, handler, schedule, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![
                trigger.id,
                trigger.handler.as_str(),
                serde_json::to_string(&trigger.schedule)?,
                trigger.created_at.to_rfc3339(),
            ],
        )?;

        Ok(trigger)
    }

    fn delete(&self, trigger: &Trigger) -> Result<()> {
        let conn = self.pool.get()?;
        conn.execute("DELETE FROM triggers WHERE id = ?1", params![trigger.id])?;
        Ok(())
    }

    fn delete_all(&self) -> Result<usize> {
        let conn = self.pool.get()?;
        Ok(conn.execute("DELETE FROM triggers", [])?)
    }
}
