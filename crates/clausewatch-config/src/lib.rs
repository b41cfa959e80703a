//! Configuration for clausewatch
//!
//! Hierarchical configuration with discovery and precedence:
//! CLI > environment > `.clausewatch/config.toml` > built-in defaults.
//! The file carries `[defaults]`, `[llm]` and `[retry]` sections.

mod config;
pub mod secret;

pub use config::*;
pub use secret::ApiKey;
