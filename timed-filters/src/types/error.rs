//! Unified error types for the job
//!
//! Fatal conditions (validation, preconditions, priority lock timeouts) and
//! collaborator failures share one enum so every entry point can log the
//! failure once before handing it back to the scheduler.

use thiserror::Error;

/// Hint appended to every validation failure
pub const INVALID_CONFIG_HINT: &str = "Please fix this as soon as possible. Documentation for the \
     configuration format can be found in the timed-filters README.";

/// Every defect found while validating the job options
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}\n\n{}", .errors.join("\n"), INVALID_CONFIG_HINT)]
pub struct ValidationError {
    pub errors: Vec<String>,
}

/// Application error type for entry points and collaborators
#[derive(Debug, Clone, Error)]
pub enum FilterError {
    #[error("Invalid options: {0}")]
    Validation(#[from] ValidationError),

    #[error("Failed to acquire lock after waiting {waited_minutes} minutes.")]
    LockTimeout { waited_minutes: u64 },

    #[error(
        "Stored version {stored} is newer than {current}. To downgrade, fully uninstall and then \
         reinstall. Downgrading while retaining old data is not supported."
    )]
    DowngradeNotSupported { stored: u32, current: u32 },

    #[error("Please install (or reinstall) this job so this task can run.")]
    NotInstalled,

    #[error("Corrupt persisted value for '{key}': {value:?}")]
    CorruptState { key: String, value: String },

    #[error("Unknown trigger handler: {0}")]
    UnknownHandler(String),

    #[error("Action error: {0}")]
    Action(String),

    #[error("Mailbox error: {0}")]
    Mailbox(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("IO error: {0}")]
    Io(String),
}

impl From<std::io::Error> for FilterError {
    fn from(err: std::io::Error) -> Self {
        FilterError::Io(err.to_string())
    }
}

impl From<toml::de::Error> for FilterError {
    fn from(err: toml::de::Error) -> Self {
        FilterError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for FilterError {
    fn from(err: serde_json::Error) -> Self {
        FilterError::Parse(err.to_string())
    }
}

impl From<r2d2::Error> for FilterError {
    fn from(err: r2d2::Error) -> Self {
        FilterError::Database(err.to_string())
    }
}

impl From<rusqlite::Error> for FilterError {
    fn from(err: rusqlite::Error) -> Self {
        FilterError::Database(err.to_string())
    }
}

/// Result type alias using FilterError
pub type Result<T> = std::result::Result<T, FilterError>;
