//! Query batches
//!
//! Each configured query runs under its own lock acquisition. The running
//! total is written back before the lock is released on every path, so
//! threads handled before a failure are still counted.

use crate::config::options::QueryRule;
use crate::state::{Job, LockGuard, Priority, Session};
use crate::types::error::{FilterError, Result};

impl Job {
    pub fn run_queries(&self) -> Result<()> {
        self.entry_point("Running queries.", |session| {
            if session.version.is_none() {
                return Err(FilterError::NotInstalled);
            }

            for rule in &session.options.queries {
                // A busy lock means another run is active; yield to it.
                let Some(guard) = session.acquire(Priority::Background)? else {
                    return Ok(());
                };

                // An uninstall may have run while we waited.
                session.require_installed(&guard)?;

                session.log(&format!("Executing query: {}", rule.search));
                let mut total = session.state.total()?;

                let outcome = self.apply_rule(session, &guard, rule, &mut total);
                let persisted = session.state.set_total(total);
                guard.release();

                match (outcome, persisted) {
                    (Ok(()), persisted) => persisted?,
                    (Err(e), Ok(())) => return Err(e),
                    (Err(e), Err(write_err)) => {
                        session.error(&format!(
                            "Failed to persist total {} after a failed query: {}",
                            total, write_err
                        ));
                        return Err(e);
                    }
                }
            }

            session.finish();
            Ok(())
        })
    }

    /// Count and act on every match. The count is bumped before the action
    /// runs, so a thread whose action fails is still counted. The lock is
    /// renewed per thread so a long batch keeps its lease.
    fn apply_rule(
        &self,
        session: &Session<'_>,
        guard: &LockGuard<'_>,
        rule: &QueryRule,
        total: &mut u64,
    ) -> Result<()> {
        for thread in self.mailbox.search(&rule.search)? {
            let thread = thread?;
            session.log(&format!("Processing thread: {}", thread.subject));
            *total += 1;
            rule.action.apply(self.mailbox.as_ref(), &thread)?;
            guard.renew()?;
        }
        Ok(())
    }
}
