//! Foundation utilities shared by every clausewatch crate.
//!
//! - [`error`]: error taxonomy and the [`error::UserFriendlyError`] reporting trait
//! - [`exit_codes`]: process exit codes for the terminal front end
//! - [`logging`]: tracing subscriber setup and pipeline spans
//! - [`redaction`]: scrubbing of credentials from upstream error text

pub mod error;
pub mod exit_codes;
pub mod logging;
pub mod redaction;
