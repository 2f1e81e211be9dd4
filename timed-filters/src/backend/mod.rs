//! Collaborator seams used by the job
//!
//! The job core only talks to these traits. SQLite and shell-command
//! implementations live in `adapters/`; tests use the in-memory fakes from
//! `test_utils`.

use std::time::Duration;

use crate::types::error::Result;
use crate::types::{HandlerId, Schedule, Thread, Trigger};

/// Flat string key-value storage that survives across invocations
pub trait PropertyStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    fn delete_all(&self) -> Result<()>;
}

/// Named cooperative lock shared by every entry point
pub trait AdvisoryLock: Send + Sync {
    /// Wait up to `timeout` for the lock. `Ok(false)` means the wait timed out.
    fn try_acquire(&self, timeout: Duration) -> Result<bool>;

    /// Release a lock previously acquired by this handle.
    fn release(&self) -> Result<()>;

    /// Extend the hold on a lock this handle owns. Locks without a lease
    /// have nothing to do.
    fn renew(&self) -> Result<()> {
        Ok(())
    }
}

/// Registration of recurring triggers with the external scheduler
pub trait TriggerAdmin: Send + Sync {
    fn list(&self) -> Result<Vec<Trigger>>;
    fn create(&self, handler: HandlerId, schedule: Schedule) -> Result<Trigger>;
    fn delete(&self, trigger: &Trigger) -> Result<()>;

    /// Remove every registration, including ones `list` cannot decode.
    /// Returns how many were removed.
    fn delete_all(&self) -> Result<usize>;
}

/// Lazy, one-shot sequence of search results
pub type ThreadIter<'a> = Box<dyn Iterator<Item = Result<Thread>> + 'a>;

/// Mailbox search plus the thread operations the built-in actions need
pub trait Mailbox: Send + Sync {
    fn search(&self, query: &str) -> Result<ThreadIter<'_>>;
    fn trash(&self, thread: &Thread) -> Result<()>;
    fn archive(&self, thread: &Thread) -> Result<()>;
    fn mark_read(&self, thread: &Thread) -> Result<()>;
}

/// Outgoing mail transport
pub trait MailSender: Send + Sync {
    fn send(&self, to: &str, subject: &str, body: &str) -> Result<()>;
}

/// Resolves the address of the user the job runs as
pub trait IdentityResolver {
    fn current_user_email(&self) -> Result<Option<String>>;
}
