use tracing::debug;

use super::{run, shell};
use crate::backend::{Mailbox, ThreadIter};
use crate::config::MailboxConfig;
use crate::types::error::{FilterError, Result};
use crate::types::Thread;

/// Mailbox driven by shell commands, notmuch by default
///
/// `search` gets the query as `$1` and must print a JSON array of objects
/// with an `id` (or `thread`) field. The thread commands get the thread id
/// as `$1`.
pub struct CommandMailbox {
    config: MailboxConfig,
}

impl CommandMailbox {
    pub fn new(config: MailboxConfig) -> Self {
        Self { config }
    }

    fn thread_command(&self, label: &str, command: &str, thread: &Thread) -> Result<()> {
        debug!("{} thread {}", label, thread.id);
        run(shell(command, &[&thread.id]), None)
            .map(|_| ())
            .map_err(|e| FilterError::Mailbox(format!("{} {}: {}", label, thread.id, e)))
    }
}

impl Mailbox for CommandMailbox {
    fn search(&self, query: &str) -> Result<ThreadIter<'_>> {
        let stdout = run(shell(&self.config.search, &[query]), None)
            .map_err(|e| FilterError::Mailbox(format!("search {:?}: {}", query, e)))?;

        let threads: Vec<Thread> = if stdout.iter().all(u8::is_ascii_whitespace) {
            Vec::new()
        } else {
            serde_json::from_slice(&stdout).map_err(|e| {
                FilterError::Mailbox(format!("search {:?} printed invalid JSON: {}", query, e))
            })?
        };
        debug!("Search {:?} matched {} thread(s)", query, threads.len());

        Ok(Box::new(threads.into_iter().map(Ok)))
    }

    fn trash(&self, thread: &Thread) -> Result<()> {
        self.thread_command("trash", &self.config.trash, thread)
    }

    fn archive(&self, thread: &Thread) -> Result<()> {
        self.thread_command("archive", &self.config.archive, thread)
    }

    fn mark_read(&self, thread: &Thread) -> Result<()> {
        self.thread_command("mark-read", &self.config.mark_read, thread)
    }
}
