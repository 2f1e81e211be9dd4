//! Concrete collaborators: SQLite state, shell-command mailbox and mail
//! transport, environment identity.

pub mod command;
pub mod identity;
pub mod sqlite;
