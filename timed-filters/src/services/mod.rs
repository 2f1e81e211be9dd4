//! Entry points and the helpers they share
//!
//! Each entry point is an `impl Job` block in its own module:
//! `install`/`uninstall`, `run_queries`, `email_results`, and the read-only
//! `status`.

pub mod actions;
pub mod digest;
pub mod install;
pub mod logger;
pub mod queries;
pub mod status;
