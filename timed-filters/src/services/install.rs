//! Install and uninstall
//!
//! Install is forward-only: a store written by a newer version must be
//! uninstalled before an older build can take it over.

use crate::state::{Job, Session};
use crate::types::error::{FilterError, Result};
use crate::types::{HandlerId, Schedule};

/// Increment on any breaking change to the persisted layout
pub const CURRENT_VERSION: u32 = 1;

/// Hour of the daily digest trigger
pub const DIGEST_HOUR: u32 = 0;
pub const DIGEST_TIMEZONE: &str = "Europe/London";

/// Triggers registered by a fresh install
pub fn default_triggers() -> [(HandlerId, Schedule); 2] {
    [
        (HandlerId::RunQueries, Schedule::Hourly { every_hours: 1 }),
        (
            HandlerId::EmailResults,
            Schedule::Daily {
                at_hour: DIGEST_HOUR,
                timezone: DIGEST_TIMEZONE.to_string(),
            },
        ),
    ]
}

fn check_upgrade(stored: Option<u32>) -> Result<()> {
    match stored {
        Some(stored) if stored > CURRENT_VERSION => Err(FilterError::DowngradeNotSupported {
            stored,
            current: CURRENT_VERSION,
        }),
        _ => Ok(()),
    }
}

impl Job {
    pub fn install(&self) -> Result<()> {
        self.entry_point("Installing job.", |session| {
            check_upgrade(session.version)?;

            let guard = session.acquire_priority()?;
            // Another install or uninstall may have run while we waited.
            let version = session.locked_version(&guard)?;
            check_upgrade(version)?;
            match version {
                Some(from) => self.migrate(session, from)?,
                None => self.install_fresh(session)?,
            }
            guard.release();

            session.finish();
            Ok(())
        })
    }

    /// Remove all state and every trigger registration, readable or not.
    pub fn uninstall(&self) -> Result<()> {
        self.entry_point("Uninstalling job.", |session| {
            let guard = session.acquire_priority()?;

            session.log("Deleting properties...");
            session.state.clear()?;

            session.log("Removing old triggers...");
            match self.triggers.list() {
                Ok(triggers) => {
                    for trigger in triggers {
                        session.log(&format!("Removing trigger for handler: {}", trigger.handler));
                    }
                }
                Err(e) => session.error(&format!("Could not read triggers, removing all: {}", e)),
            }
            let removed = self.triggers.delete_all()?;
            session.log(&format!("Removed {} trigger(s)", removed));
            guard.release();

            session.finish();
            Ok(())
        })
    }

    fn install_fresh(&self, session: &Session<'_>) -> Result<()> {
        session.log("Installing properties...");
        session.state.set_version(CURRENT_VERSION)?;
        session.state.set_total(0)?;

        session.log("Installing triggers...");
        for (handler, schedule) in default_triggers() {
            session.log(&format!("Registering {} ({})", handler, schedule));
            self.triggers.create(handler, schedule)?;
        }
        Ok(())
    }

    fn migrate(&self, session: &Session<'_>, from: u32) -> Result<()> {
        session.log(&format!(
            "Updating properties from version {} to {}...",
            from, CURRENT_VERSION
        ));
        session.state.set_version(CURRENT_VERSION)?;

        // Version 0 stored only `total`; its layout is otherwise current.
        for version in from..CURRENT_VERSION {
            session.log(&format!("Applying migration from version {}", version));
        }

        session.log("Updating triggers...");
        // No triggers to migrate currently.
        Ok(())
    }
}
