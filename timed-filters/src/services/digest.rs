//! Digest email
//!
//! The total is read and reset under the lock, and the lock is released
//! before the message is handed to the transport, so a slow send never holds
//! up a query batch.

use crate::config::options::COUNT_TOKEN;
use crate::state::Job;
use crate::types::error::{FilterError, Result};

/// Substitute every count token in `template`.
pub fn format_body(template: &str, total: u64) -> String {
    template.replace(COUNT_TOKEN, &total.to_string())
}

impl Job {
    pub fn email_results(&self) -> Result<()> {
        self.entry_point("Emailing results.", |session| {
            if session.version.is_none() {
                return Err(FilterError::NotInstalled);
            }

            let Some(notify) = &session.options.notify else {
                // Diagnostic only: read without the lock, never written back.
                let total = session.state.total()?;
                session.log(&format!("Previous total: {}", total));
                session.log("Not sending email because notify is disabled");
                return Ok(());
            };

            let guard = session.acquire_priority()?;
            // An uninstall may have run while we waited.
            session.require_installed(&guard)?;
            session.log("Generating email...");
            let total = session.state.total()?;
            session.log(&format!("Previous total: {}", total));
            session.log("Resetting total...");
            session.state.set_total(0)?;
            guard.release();

            session.log("Sending email...");
            let body = format_body(&notify.body, total);
            session.log(&format!("Email: {}", notify.email));
            session.log(&format!("Subject: {}", notify.subject));
            session.log(&format!("Body: {}", body));
            self.mailer.send(&notify.email, &notify.subject, &body)?;

            session.log("Email sent successfully");
            session.finish();
            Ok(())
        })
    }
}
