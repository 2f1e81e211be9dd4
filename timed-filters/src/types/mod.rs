pub mod error;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use self::error::FilterError;

/// A mailbox thread matched by a search
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Thread {
    #[serde(alias = "thread")]
    pub id: String,
    #[serde(default)]
    pub subject: String,
}

/// Logical identifier of an entry point a trigger can fire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HandlerId {
    RunQueries,
    EmailResults,
}

impl HandlerId {
    pub const ALL: [HandlerId; 2] = [HandlerId::RunQueries, HandlerId::EmailResults];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RunQueries => "run-queries",
            Self::EmailResults => "email-results",
        }
    }
}

impl std::fmt::Display for HandlerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for HandlerId {
    type Err = FilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|handler| handler.as_str() == s)
            .ok_or_else(|| FilterError::UnknownHandler(s.to_string()))
    }
}

/// Recurrence of a registered trigger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Schedule {
    /// Fires every `every_hours` hours
    Hourly { every_hours: u32 },
    /// Fires once a day at `at_hour` in `timezone`
    Daily { at_hour: u32, timezone: String },
}

impl Schedule {
    /// Render as crontab line(s) invoking `command`
    pub fn crontab(&self, command: &str) -> String {
        match self {
            Self::Hourly { every_hours } if *every_hours <= 1 => {
                format!("0 * * * * {}", command)
            }
            Self::Hourly { every_hours } => format!("0 */{} * * * {}", every_hours, command),
            Self::Daily { at_hour, timezone } => {
                format!("CRON_TZ={}\n0 {} * * * {}", timezone, at_hour, command)
            }
        }
    }
}

impl std::fmt::Display for Schedule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Hourly { every_hours } => write!(f, "every {} hour(s)", every_hours),
            Self::Daily { at_hour, timezone } => {
                write!(f, "daily at {:02}:00 {}", at_hour, timezone)
            }
        }
    }
}

/// A recurring trigger registration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trigger {
    pub id: String,
    pub handler: HandlerId,
    pub schedule: Schedule,
    pub created_at: DateTime<Utc>,
}
