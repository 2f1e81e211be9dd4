//! Per-invocation lifecycle session
//!
//! A session is created at the start of every entry point. It carries the
//! validated options, the persisted version read at start, and the advisory
//! lock. The lock is taken explicitly and handed back as a [`LockGuard`] so
//! release happens exactly once, on every exit path.

use std::time::{Duration, Instant};

use crate::backend::AdvisoryLock;
use crate::config::options::JobConfig;
use crate::services::logger;
use crate::state::persisted::PersistedState;
use crate::types::error::{FilterError, Result};

/// Wait bound for install, uninstall and the digest
pub const PRIORITY_LOCK_TIMEOUT: Duration = Duration::from_secs(10 * 60);

/// Wait bound for a query batch
pub const BACKGROUND_LOCK_TIMEOUT: Duration = Duration::from_secs(60 * 60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Priority {
    /// Short wait; a timeout is fatal
    High,
    /// Long wait; a timeout skips this run
    Background,
}

impl Priority {
    pub fn timeout(&self) -> Duration {
        match self {
            Self::High => PRIORITY_LOCK_TIMEOUT,
            Self::Background => BACKGROUND_LOCK_TIMEOUT,
        }
    }
}

pub struct Session<'a> {
    pub options: &'a JobConfig,
    pub state: PersistedState<'a>,
    /// Version found when the session began
    pub version: Option<u32>,
    lock: &'a dyn AdvisoryLock,
    started: Instant,
}

impl<'a> Session<'a> {
    pub(crate) fn new(
        label: &str,
        options: &'a JobConfig,
        state: PersistedState<'a>,
        lock: &'a dyn AdvisoryLock,
    ) -> Result<Self> {
        let version = state.version()?;
        logger::write_line(label);

        Ok(Self {
            options,
            state,
            version,
            lock,
            started: Instant::now(),
        })
    }

    pub fn log(&self, message: &str) {
        logger::log(message);
    }

    pub fn error(&self, message: &str) {
        logger::error(message);
    }

    /// Wait for the job lock.
    ///
    /// High priority timeouts are returned as [`FilterError::LockTimeout`].
    /// Background timeouts are logged and yield `Ok(None)`; the next
    /// scheduled run catches up.
    pub fn acquire(&self, priority: Priority) -> Result<Option<LockGuard<'a>>> {
        self.log("Waiting for lock...");

        if self.lock.try_acquire(priority.timeout())? {
            return Ok(Some(LockGuard { lock: self.lock }));
        }

        match priority {
            Priority::High => Err(FilterError::LockTimeout {
                waited_minutes: priority.timeout().as_secs() / 60,
            }),
            Priority::Background => {
                self.error("Lock unable to be acquired. Skipping this run.");
                logger::write_line("");
                Ok(None)
            }
        }
    }

    /// [`Session::acquire`] at high priority, which never yields `None`.
    pub fn acquire_priority(&self) -> Result<LockGuard<'a>> {
        self.acquire(Priority::High)?.ok_or(FilterError::LockTimeout {
            waited_minutes: PRIORITY_LOCK_TIMEOUT.as_secs() / 60,
        })
    }

    /// Version as stored now, read while `_guard` holds the lock.
    ///
    /// `self.version` was read before waiting; an install or uninstall that
    /// held the lock in between may have changed it.
    pub fn locked_version(&self, _guard: &LockGuard<'_>) -> Result<Option<u32>> {
        self.state.version()
    }

    /// [`Session::locked_version`], failing with
    /// [`FilterError::NotInstalled`] when the store is empty.
    pub fn require_installed(&self, guard: &LockGuard<'_>) -> Result<u32> {
        self.locked_version(guard)?.ok_or(FilterError::NotInstalled)
    }

    pub fn finish(&self) {
        self.log(&format!(
            "Script executed successfully in {}.",
            logger::fmt_ms(self.started.elapsed())
        ));
        logger::write_line("");
    }
}

/// Held job lock; released when dropped.
#[must_use = "the lock is released as soon as the guard is dropped"]
pub struct LockGuard<'a> {
    lock: &'a dyn AdvisoryLock,
}

impl LockGuard<'_> {
    /// Push back the lock's lease while a long batch is still working.
    pub fn renew(&self) -> Result<()> {
        self.lock.renew()
    }

    /// Release now instead of at end of scope.
    pub fn release(self) {}
}

impl Drop for LockGuard<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.lock.release() {
            logger::error(&format!("Failed to release lock: {}", e));
        }
    }
}
