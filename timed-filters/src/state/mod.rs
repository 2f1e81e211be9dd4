//! Job state
//!
//! [`Job`] owns the validated options and every collaborator. Entry points
//! open a fresh [`Session`] from persisted storage on each call; nothing is
//! carried between invocations except what the property store holds.

pub mod persisted;
pub mod session;

use std::sync::Arc;

use crate::backend::{AdvisoryLock, MailSender, Mailbox, PropertyStore, TriggerAdmin};
use crate::config::options::OptionValidator;
use crate::services::logger;
use crate::types::error::Result;
use crate::types::HandlerId;

pub use persisted::PersistedState;
pub use session::{LockGuard, Priority, Session};

/// External services the job depends on
#[derive(Clone)]
pub struct Collaborators {
    pub store: Arc<dyn PropertyStore>,
    pub lock: Arc<dyn AdvisoryLock>,
    pub triggers: Arc<dyn TriggerAdmin>,
    pub mailbox: Arc<dyn Mailbox>,
    pub mailer: Arc<dyn MailSender>,
}

pub struct Job {
    options: OptionValidator,
    pub(crate) store: Arc<dyn PropertyStore>,
    pub(crate) lock: Arc<dyn AdvisoryLock>,
    pub(crate) triggers: Arc<dyn TriggerAdmin>,
    pub(crate) mailbox: Arc<dyn Mailbox>,
    pub(crate) mailer: Arc<dyn MailSender>,
}

impl Job {
    pub fn new(options: OptionValidator, collaborators: Collaborators) -> Self {
        let Collaborators {
            store,
            lock,
            triggers,
            mailbox,
            mailer,
        } = collaborators;

        Self {
            options,
            store,
            lock,
            triggers,
            mailbox,
            mailer,
        }
    }

    /// Start a session: validate options (once per job) and read the
    /// persisted version.
    pub fn begin(&self, label: &str) -> Result<Session<'_>> {
        let options = self.options.get()?;
        Session::new(
            label,
            options,
            PersistedState::new(self.store.as_ref()),
            self.lock.as_ref(),
        )
    }

    /// Run `body` inside a fresh session, logging a fatal error before
    /// returning it.
    pub(crate) fn entry_point<F>(&self, label: &str, body: F) -> Result<()>
    where
        F: FnOnce(&Session<'_>) -> Result<()>,
    {
        let result = self.begin(label).and_then(|session| body(&session));
        if let Err(e) = &result {
            logger::error(&e.to_string());
        }
        result
    }

    /// Run the entry point a trigger handler maps to.
    pub fn dispatch(&self, handler: HandlerId) -> Result<()> {
        match handler {
            HandlerId::RunQueries => self.run_queries(),
            HandlerId::EmailResults => self.email_results(),
        }
    }
}
