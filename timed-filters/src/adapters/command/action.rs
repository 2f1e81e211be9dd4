use super::{run, shell};
use crate::backend::Mailbox;
use crate::services::actions::ThreadAction;
use crate::types::error::{FilterError, Result};
use crate::types::Thread;

/// Environment variable carrying the thread subject to user actions
pub const SUBJECT_ENV: &str = "TIMED_FILTERS_SUBJECT";

/// User-defined action from the `[actions]` table
///
/// Runs the configured command with the thread id as `$1`. The mailbox is
/// not involved.
#[derive(Debug, Clone)]
pub struct CommandAction {
    name: String,
    command: String,
}

impl CommandAction {
    pub fn new(name: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            command: command.into(),
        }
    }
}

impl ThreadAction for CommandAction {
    fn apply(&self, _mailbox: &dyn Mailbox, thread: &Thread) -> Result<()> {
        let mut cmd = shell(&self.command, &[&thread.id]);
        cmd.env(SUBJECT_ENV, &thread.subject);

        run(cmd, None).map(|_| ()).map_err(|e| {
            FilterError::Action(format!("{} failed for thread {}: {}", self.name, thread.id, e))
        })
    }
}
