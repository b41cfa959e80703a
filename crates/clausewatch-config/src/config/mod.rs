//! Configuration management for clausewatch
//!
//! Hierarchical configuration with discovery and precedence:
//! CLI > environment > file > defaults.

mod builder;
mod cli_args;
mod discovery;
mod model;
mod sources;
mod validation;

pub use builder::ConfigBuilder;
pub use cli_args::CliArgs;
pub use model::*;

use std::time::Duration;

use clausewatch_prompt_template::PromptTemplate;

impl Config {
    /// Stream the model's answer fragment by fragment. Defaults to `true`.
    #[must_use]
    pub fn stream(&self) -> bool {
        self.defaults.stream.unwrap_or(true)
    }

    #[must_use]
    pub fn verbose(&self) -> bool {
        self.defaults.verbose.unwrap_or(false)
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        self.llm
            .base_url
            .as_deref()
            .unwrap_or(DEFAULT_BASE_URL)
            .trim_end_matches('/')
    }

    /// The pinned model, if one was configured.
    #[must_use]
    pub fn pinned_model(&self) -> Option<&str> {
        self.llm.model.as_deref().filter(|m| !m.trim().is_empty())
    }

    /// Ordered model preferences for automatic selection.
    #[must_use]
    pub fn model_preferences(&self) -> Vec<String> {
        match &self.llm.model_preferences {
            Some(prefs) => prefs.clone(),
            None => DEFAULT_MODEL_PREFERENCES
                .iter()
                .map(|s| (*s).to_string())
                .collect(),
        }
    }

    #[must_use]
    pub fn fallback_model(&self) -> &str {
        self.llm
            .fallback_model
            .as_deref()
            .unwrap_or(DEFAULT_FALLBACK_MODEL)
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.llm.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS))
    }

    #[must_use]
    pub fn relax_safety(&self) -> bool {
        self.llm.relax_safety.unwrap_or(true)
    }

    /// The prompt template. Unknown names are rejected by validation, so the
    /// default only applies when nothing was configured.
    #[must_use]
    pub fn prompt_template(&self) -> PromptTemplate {
        self.llm
            .prompt_template
            .as_deref()
            .and_then(|name| PromptTemplate::parse(name).ok())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.retry.max_attempts.unwrap_or(DEFAULT_MAX_ATTEMPTS)
    }

    #[must_use]
    pub fn cooldown(&self) -> Duration {
        Duration::from_secs(self.retry.cooldown_secs.unwrap_or(DEFAULT_COOLDOWN_SECS))
    }
}
