use crate::backend::IdentityResolver;
use crate::types::error::Result;

/// Variables consulted, in order, for the current user's address
pub const EMAIL_VARS: [&str; 2] = ["TIMED_FILTERS_EMAIL", "EMAIL"];

/// Resolves the user's address from the environment
#[derive(Debug, Default, Clone, Copy)]
pub struct EnvIdentity;

impl IdentityResolver for EnvIdentity {
    fn current_user_email(&self) -> Result<Option<String>> {
        Ok(first_address(|name| std::env::var(name).ok()))
    }
}

fn first_address(lookup: impl Fn(&str) -> Option<String>) -> Option<String> {
    EMAIL_VARS
        .iter()
        .filter_map(|name| lookup(name))
        .map(|value| value.trim().to_string())
        .find(|value| !value.is_empty())
}
