//! Named per-thread actions
//!
//! Queries in the config file refer to actions by name. The registry maps
//! those names to implementations: the mailbox built-ins plus any shell
//! command actions declared under `[actions]`.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::backend::Mailbox;
use crate::types::error::Result;
use crate::types::Thread;

/// Side effect applied to every thread a query matches
pub trait ThreadAction: Send + Sync {
    fn apply(&self, mailbox: &dyn Mailbox, thread: &Thread) -> Result<()>;
}

/// Actions implemented directly by the mailbox
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuiltinAction {
    Trash,
    Archive,
    MarkRead,
}

impl BuiltinAction {
    pub const ALL: [BuiltinAction; 3] = [Self::Trash, Self::Archive, Self::MarkRead];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Trash => "trash",
            Self::Archive => "archive",
            Self::MarkRead => "mark-read",
        }
    }
}

impl ThreadAction for BuiltinAction {
    fn apply(&self, mailbox: &dyn Mailbox, thread: &Thread) -> Result<()> {
        match self {
            Self::Trash => mailbox.trash(thread),
            Self::Archive => mailbox.archive(thread),
            Self::MarkRead => mailbox.mark_read(thread),
        }
    }
}

/// Name to action lookup
#[derive(Clone, Default)]
pub struct ActionRegistry {
    actions: BTreeMap<String, Arc<dyn ThreadAction>>,
}

impl ActionRegistry {
    /// Registry holding only the mailbox built-ins
    pub fn with_builtins() -> Self {
        let mut registry = Self::default();
        for action in BuiltinAction::ALL {
            registry.register(action.name(), Arc::new(action));
        }
        registry
    }

    /// Register `action` under `name`, replacing any previous entry.
    pub fn register(&mut self, name: &str, action: Arc<dyn ThreadAction>) {
        self.actions.insert(name.to_string(), action);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn ThreadAction>> {
        self.actions.get(name).cloned()
    }

    /// Registered names in sorted order
    pub fn names(&self) -> Vec<&str> {
        self.actions.keys().map(String::as_str).collect()
    }
}
