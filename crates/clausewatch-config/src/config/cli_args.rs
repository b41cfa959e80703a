use std::path::PathBuf;

/// Configuration overrides taken from the command line.
///
/// Every field is optional; `None` means "not given on the command line".
#[derive(Debug, Clone, Default)]
pub struct CliArgs {
    pub config_path: Option<PathBuf>,
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub base_url: Option<String>,
    pub verbose: Option<bool>,
    pub stream: Option<bool>,
    pub max_attempts: Option<u32>,
    pub cooldown_secs: Option<u64>,
    pub timeout_secs: Option<u64>,
    pub prompt_template: Option<String>,
}
