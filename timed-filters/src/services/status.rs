//! Read-only inspection of the installed job
//!
//! None of this takes the lock or validates options: it only reports what
//! the store and the trigger registry hold right now.

use crate::state::{Job, PersistedState};
use crate::types::error::Result;
use crate::types::Trigger;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobStatus {
    pub version: Option<u32>,
    pub total: u64,
    pub triggers: Vec<Trigger>,
}

impl Job {
    pub fn status(&self) -> Result<JobStatus> {
        let state = PersistedState::new(self.store.as_ref());
        Ok(JobStatus {
            version: state.version()?,
            total: state.total()?,
            triggers: self.triggers.list()?,
        })
    }
}

/// One crontab entry per trigger, each running `program dispatch <handler>`.
pub fn render_crontab(triggers: &[Trigger], program: &str) -> String {
    triggers
        .iter()
        .map(|trigger| {
            let command = format!("{} dispatch {}", program, trigger.handler);
            trigger.schedule.crontab(&command)
        })
        .collect::<Vec<_>>()
        .join("\n")
}
