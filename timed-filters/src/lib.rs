//! Timed Filters - scheduled mailbox filters with a digest email
//!
//! An external scheduler (cron, systemd timers) invokes the entry points:
//! `install` once, `run-queries` on a short cycle, `email-results` daily.
//! Every invocation rebuilds its state from the SQLite state database and
//! serialises against the others through one advisory lock.
//!
//! ## Module Organization
//!
//! - `services/`: Entry points and the action registry
//! - `state/`: Job, sessions, the lock guard and persisted counters
//! - `config/`: Config file loading and option validation
//! - `backend/`: Collaborator traits
//! - `adapters/`: SQLite, shell-command and environment implementations
//! - `types/`: Data structures and errors

pub mod adapters;
pub mod backend;
pub mod config;
pub mod services;
pub mod state;
pub mod types;

#[cfg(test)]
mod test_utils;

use std::sync::Arc;

use adapters::command::{CommandMailbox, SendmailSender};
use adapters::identity::EnvIdentity;
use adapters::sqlite::{SqliteLock, SqlitePropertyStore, SqliteTriggers, StateDatabase};
use config::options::OptionValidator;
use config::AppConfig;
use state::{Collaborators, Job};
use types::error::Result;

pub use types::error::FilterError;

/// Wire a job to the collaborators described by `config`.
pub fn open_job(config: &AppConfig) -> Result<Job> {
    let db = StateDatabase::open(&config.storage.db_path()?)?;

    let options = OptionValidator::new(
        config.raw_options(),
        config.action_registry(),
        Box::new(EnvIdentity),
    );

    Ok(Job::new(
        options,
        Collaborators {
            store: Arc::new(SqlitePropertyStore::new(db.pool())),
            lock: Arc::new(SqliteLock::new(
                db.pool(),
                config.lock.lease(),
                config.lock.poll_interval(),
            )),
            triggers: Arc::new(SqliteTriggers::new(db.pool())),
            mailbox: Arc::new(CommandMailbox::new(config.mailbox.clone())),
            mailer: Arc::new(SendmailSender::new(config.mail.clone())),
        },
    ))
}
