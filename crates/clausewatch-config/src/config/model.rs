use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

use crate::secret::ApiKey;

/// Base URL of the Generative Language REST API.
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Primary environment variable holding the API key.
pub const DEFAULT_API_KEY_ENV: &str = "GEMINI_API_KEY";

/// Secondary environment variable consulted when the primary one is unset.
pub const SECONDARY_API_KEY_ENV: &str = "GOOGLE_API_KEY";

/// Model used when the listing call fails or yields nothing usable.
pub const DEFAULT_FALLBACK_MODEL: &str = "gemini-1.5-flash";

/// Preference order for automatic model selection: fast/latest first, then pro.
pub const DEFAULT_MODEL_PREFERENCES: &[&str] = &[
    "gemini-1.5-flash-latest",
    "gemini-1.5-flash",
    "gemini-1.5-pro-latest",
    "gemini-1.5-pro",
    "gemini-pro",
];

pub const DEFAULT_TIMEOUT_SECS: u64 = 120;
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_COOLDOWN_SECS: u64 = 60;

/// Where an effective configuration value came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// Value provided via CLI argument (highest precedence).
    Cli,
    /// Value read from the named environment variable.
    Env(String),
    /// Value loaded from a configuration file.
    ConfigFile(PathBuf),
    /// Value provided programmatically through [`Config::builder()`].
    Programmatic,
    /// Built-in default value (lowest precedence).
    Default,
}

/// `[defaults]` section
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct Defaults {
    pub verbose: Option<bool>,
    /// Request incremental delivery of the model's answer
    pub stream: Option<bool>,
}

/// `[llm]` section
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct LlmConfig {
    /// Only "gemini" is supported
    pub provider: Option<String>,
    pub base_url: Option<String>,
    /// Name of the environment variable holding the key
    pub api_key_env: Option<String>,
    /// Pre-provisioned key. Prefer the environment for anything shared.
    pub api_key: Option<String>,
    /// Pinned model id; skips automatic selection
    pub model: Option<String>,
    pub model_preferences: Option<Vec<String>>,
    pub fallback_model: Option<String>,
    pub timeout_secs: Option<u64>,
    pub temperature: Option<f32>,
    pub max_output_tokens: Option<u32>,
    /// Set every harm category threshold to BLOCK_NONE
    pub relax_safety: Option<bool>,
    /// "zh-TW" or "en"
    pub prompt_template: Option<String>,
}

/// `[retry]` section
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct RetryConfig {
    pub max_attempts: Option<u32>,
    pub cooldown_secs: Option<u64>,
}

/// Effective configuration for a clausewatch run.
///
/// `Config` provides hierarchical configuration with discovery and precedence:
/// CLI arguments > environment > config file > built-in defaults.
///
/// # Discovery
///
/// Use [`Config::discover()`] for CLI behavior that searches for
/// `.clausewatch/config.toml` upward from the current directory. Use
/// [`Config::builder()`] for deterministic configuration independent of the
/// user's environment.
///
/// # Source Attribution
///
/// `source_attribution` maps each key to the [`ConfigSource`] that supplied it;
/// `clausewatch config` prints it.
#[derive(Debug, Clone)]
pub struct Config {
    pub defaults: Defaults,
    pub llm: LlmConfig,
    pub retry: RetryConfig,
    /// Resolved credential, if any source supplied one
    pub api_key: Option<ApiKey>,
    pub source_attribution: HashMap<String, ConfigSource>,
}
