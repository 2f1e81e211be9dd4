//! Job option validation
//!
//! The `queries` and `notify` sections are kept as loose TOML values so that
//! every defect can be reported in one go instead of stopping at the first
//! type mismatch serde would hit.

use std::sync::Arc;

use once_cell::unsync::OnceCell;
use serde::Deserialize;
use toml::Value;
use tracing::debug;

use crate::backend::IdentityResolver;
use crate::services::actions::{ActionRegistry, ThreadAction};
use crate::types::error::{FilterError, Result, ValidationError};

pub const DEFAULT_SUBJECT: &str = "Weekly Filter Totals";
pub const DEFAULT_BODY: &str = "Number of threads successfully processed this past week: %c";

/// Substitution token for the running count in the body template
pub const COUNT_TOKEN: &str = "%c";

/// Job options as written in the config file
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawOptions {
    pub queries: Option<Value>,
    pub notify: Option<Value>,
}

/// A search expression and the action applied to each matching thread
#[derive(Clone)]
pub struct QueryRule {
    pub search: String,
    pub action_name: String,
    pub action: Arc<dyn ThreadAction>,
}

impl std::fmt::Debug for QueryRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryRule")
            .field("search", &self.search)
            .field("action", &self.action_name)
            .finish()
    }
}

/// Resolved digest settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotifyConfig {
    pub email: String,
    pub subject: String,
    pub body: String,
}

/// Validated job options
#[derive(Debug, Clone)]
pub struct JobConfig {
    pub queries: Vec<QueryRule>,
    pub notify: Option<NotifyConfig>,
}

/// Validates the raw options at most once and hands out the cached result
pub struct OptionValidator {
    raw: RawOptions,
    actions: ActionRegistry,
    identity: Box<dyn IdentityResolver>,
    memo: OnceCell<std::result::Result<JobConfig, ValidationError>>,
}

impl OptionValidator {
    pub fn new(
        raw: RawOptions,
        actions: ActionRegistry,
        identity: Box<dyn IdentityResolver>,
    ) -> Self {
        Self {
            raw,
            actions,
            identity,
            memo: OnceCell::new(),
        }
    }

    /// Validated options; a failure is cached just like a success.
    pub fn get(&self) -> Result<&JobConfig> {
        self.memo
            .get_or_init(|| validate(&self.raw, &self.actions, self.identity.as_ref()))
            .as_ref()
            .map_err(|e| FilterError::Validation(e.clone()))
    }
}

/// Validate `raw` into a `JobConfig`, collecting every defect.
pub fn validate(
    raw: &RawOptions,
    actions: &ActionRegistry,
    identity: &dyn IdentityResolver,
) -> std::result::Result<JobConfig, ValidationError> {
    let mut errs = Vec::new();

    let queries = validate_queries(&mut errs, raw.queries.as_ref(), actions);
    let notify = validate_notify(&mut errs, raw.notify.as_ref(), identity);

    if !errs.is_empty() {
        return Err(ValidationError { errors: errs });
    }

    debug!("Validated {} queries", queries.len());
    Ok(JobConfig { queries, notify })
}

fn validate_queries(
    errs: &mut Vec<String>,
    value: Option<&Value>,
    actions: &ActionRegistry,
) -> Vec<QueryRule> {
    let items = match value {
        Some(Value::Array(items)) => items,
        other => {
            require(errs, "queries", other, &["array"], false);
            return Vec::new();
        }
    };

    if items.is_empty() {
        errs.push("queries must contain at least one query.".to_string());
    }

    let mut rules = Vec::with_capacity(items.len());
    for (i, item) in items.iter().enumerate() {
        let (search, action) = match item {
            Value::Array(pair) => {
                if pair.len() != 2 {
                    errs.push(format!(
                        "queries[{}] must have exactly two elements: a search and an action.",
                        i
                    ));
                }
                (pair.first(), pair.get(1))
            }
            Value::Table(table) => (table.get("search"), table.get("action")),
            other => {
                require(errs, &format!("queries[{}]", i), Some(other), &["array", "table"], false);
                continue;
            }
        };

        let search = match search {
            Some(Value::String(s)) if s.trim().is_empty() => {
                errs.push(format!("queries[{}].search must not be empty.", i));
                None
            }
            Some(Value::String(s)) => Some(s.trim().to_string()),
            other => {
                require(errs, &format!("queries[{}].search", i), other, &["string"], false);
                None
            }
        };

        let action = match action {
            Some(Value::String(name)) => match actions.get(name) {
                Some(action) => Some((name.clone(), action)),
                None => {
                    errs.push(format!(
                        "queries[{}].action names an unknown action: {} (known: {}).",
                        i,
                        name,
                        actions.names().join(", ")
                    ));
                    None
                }
            },
            other => {
                require(errs, &format!("queries[{}].action", i), other, &["string"], false);
                None
            }
        };

        if let (Some(search), Some((action_name, action))) = (search, action) {
            rules.push(QueryRule {
                search,
                action_name,
                action,
            });
        }
    }

    rules
}

fn validate_notify(
    errs: &mut Vec<String>,
    value: Option<&Value>,
    identity: &dyn IdentityResolver,
) -> Option<NotifyConfig> {
    let (email, subject, body) = match value {
        None | Some(Value::Boolean(false)) => return None,
        Some(Value::Boolean(true)) => (None, None, None),
        Some(Value::Table(table)) => {
            let mut field = |key: &str| -> std::result::Result<Option<String>, ()> {
                match table.get(key) {
                    None => Ok(None),
                    Some(Value::String(s)) => Ok(Some(s.clone())),
                    other => {
                        require(errs, &format!("notify.{}", key), other, &["string"], true);
                        Err(())
                    }
                }
            };
            let email = field("email");
            let subject = field("subject").ok().flatten();
            let body = field("body").ok().flatten();
            match email {
                Ok(email) => (email, subject, body),
                // Already reported; resolving a default would only add noise
                Err(()) => return None,
            }
        }
        other => {
            require(errs, "notify", other, &["boolean", "table"], true);
            return None;
        }
    };

    let email = match email {
        Some(email) if email.trim().is_empty() => {
            errs.push("notify.email must not be empty when given.".to_string());
            return None;
        }
        Some(email) => email,
        None => match identity.current_user_email() {
            Ok(Some(email)) if !email.trim().is_empty() => email,
            Ok(_) => {
                errs.push("Could not detect email - an explicit email is required.".to_string());
                return None;
            }
            Err(e) => {
                errs.push(format!(
                    "Could not detect email ({}) - an explicit email is required.",
                    e
                ));
                return None;
            }
        },
    };

    Some(NotifyConfig {
        email,
        subject: subject.unwrap_or_else(|| DEFAULT_SUBJECT.to_string()),
        body: body.unwrap_or_else(|| DEFAULT_BODY.to_string()),
    })
}

/// Push a type error for `name` unless `value` has one of `types`.
fn require(
    errs: &mut Vec<String>,
    name: &str,
    value: Option<&Value>,
    types: &[&str],
    optional: bool,
) {
    match value {
        None if optional => return,
        Some(v) if types.iter().any(|t| *t == v.type_str()) => return,
        _ => {}
    }

    let article = match types.first() {
        Some(t) if t.starts_with(|c: char| "aeiou".contains(c)) => "an",
        _ => "a",
    };
    let kinds = match types {
        [] => String::new(),
        [one] => one.to_string(),
        [first, second] => format!("{} or {}", first, second),
        [rest @ .., last] => format!("{}, or {}", rest.join(", "), last),
    };

    let mut message = format!("{} must be {} {}", name, article, kinds);
    message.push_str(if optional { " when given." } else { "." });
    errs.push(message);
}
