pub mod options;

use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use toml::Value;
use tracing::info;

use crate::adapters::command::CommandAction;
use crate::adapters::sqlite::default_db_path;
use crate::services::actions::ActionRegistry;
use crate::types::error::{FilterError, Result};
use options::RawOptions;

/// Contents of `config.toml`
///
/// `queries` and `notify` are kept as raw TOML values and only checked by
/// the option validator, so that every defect is reported at once.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// Ordered `[search, action]` pairs
    pub queries: Option<Value>,

    /// `false` to disable the digest, or a table with `email`, `subject`
    /// and `body`
    pub notify: Option<Value>,

    /// User-defined actions: name to shell command
    #[serde(default)]
    pub actions: BTreeMap<String, String>,

    #[serde(default)]
    pub mailbox: MailboxConfig,

    #[serde(default)]
    pub mail: MailConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub lock: LockConfig,
}

/// Commands backing the mailbox; `$1` is the query or the thread id
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct MailboxConfig {
    pub search: String,
    pub trash: String,
    pub archive: String,
    pub mark_read: String,
}

impl Default for MailboxConfig {
    fn default() -> Self {
        Self {
            search: r#"notmuch search --format=json --output=summary -- "$1""#.into(),
            trash: r#"notmuch tag +deleted -inbox -- "thread:$1""#.into(),
            archive: r#"notmuch tag -inbox -- "thread:$1""#.into(),
            mark_read: r#"notmuch tag -unread -- "thread:$1""#.into(),
        }
    }
}

/// Outgoing mail
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct MailConfig {
    /// Command reading a full message on stdin
    pub sendmail: String,

    /// `From` header; left to the transport when unset
    pub from: Option<String>,
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            sendmail: "sendmail -t".into(),
            from: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// State database file (default: `<data dir>/timed-filters/state.db`)
    pub path: Option<PathBuf>,
}

impl StorageConfig {
    pub fn db_path(&self) -> Result<PathBuf> {
        match &self.path {
            Some(path) => Ok(path.clone()),
            None => default_db_path(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LockConfig {
    /// Age after which a held lock is considered abandoned
    pub lease_minutes: u64,

    /// Delay between attempts while waiting for the lock
    pub poll_interval_ms: u64,
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            lease_minutes: 360,
            poll_interval_ms: 500,
        }
    }
}

impl LockConfig {
    pub fn lease(&self) -> Duration {
        Duration::from_secs(self.lease_minutes * 60)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl AppConfig {
    /// Parse a config file body
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| FilterError::Config(format!("Failed to parse config: {}", e)))
    }

    /// The job options, still unvalidated
    pub fn raw_options(&self) -> RawOptions {
        RawOptions {
            queries: self.queries.clone(),
            notify: self.notify.clone(),
        }
    }

    /// Built-in actions plus the `[actions]` table, which may shadow them
    pub fn action_registry(&self) -> ActionRegistry {
        let mut registry = ActionRegistry::with_builtins();
        for (name, command) in &self.actions {
            registry.register(name, Arc::new(CommandAction::new(name, command)));
        }
        registry
    }
}

/// Get default config paths
pub fn default_config_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();

    // XDG config path
    if let Some(config_dir) = dirs::config_dir() {
        paths.push(config_dir.join("timed-filters").join("config.toml"));
    }

    // Home directory fallback
    if let Some(home_dir) = dirs::home_dir() {
        paths.push(
            home_dir
                .join(".config")
                .join("timed-filters")
                .join("config.toml"),
        );
    }

    paths
}

/// Load the config from `path`, or from the first default path that exists
///
/// With no explicit path and no file found, an empty config is returned;
/// entry points will then fail validation with a pointer to the docs.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig> {
    if let Some(path) = path {
        return load_config_from_path(path);
    }

    for path in default_config_paths() {
        if path.exists() {
            info!("Found config at: {:?}", path);
            return load_config_from_path(&path);
        }
    }

    info!("No config file found, using empty config");
    Ok(AppConfig::default())
}

/// Load configuration from a specific path
pub fn load_config_from_path(path: &Path) -> Result<AppConfig> {
    info!("Loading configuration from: {:?}", path);

    let content = fs::read_to_string(path)
        .map_err(|e| FilterError::Config(format!("Failed to read config {:?}: {}", path, e)))?;

    AppConfig::parse(&content)
}
