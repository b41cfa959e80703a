use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::secret::ApiKey;

use super::{
    CliArgs, Config, ConfigSource, DEFAULT_API_KEY_ENV, Defaults, LlmConfig, RetryConfig,
    SECONDARY_API_KEY_ENV,
};

/// TOML configuration file structure
#[derive(Debug, Default, Deserialize, Serialize)]
struct TomlConfig {
    defaults: Option<Defaults>,
    llm: Option<LlmConfig>,
    retry: Option<RetryConfig>,
}

/// Move `value` into `slot` when present, recording where it came from.
pub(super) fn apply<T>(
    slot: &mut Option<T>,
    value: Option<T>,
    key: &str,
    source: &ConfigSource,
    attribution: &mut HashMap<String, ConfigSource>,
) {
    if let Some(v) = value {
        *slot = Some(v);
        attribution.insert(key.to_string(), source.clone());
    }
}

impl Config {
    /// Discover and load configuration with precedence: CLI > env > file > defaults
    ///
    /// Uses the current working directory for config file discovery when no
    /// explicit path is provided in `cli_args`.
    pub fn discover(cli_args: &CliArgs) -> Result<Self> {
        let start_dir = std::env::current_dir().context("Failed to get current directory")?;
        Self::discover_from(&start_dir, cli_args)
    }

    /// Discover and load configuration starting from a specific directory.
    pub fn discover_from(start_dir: &Path, cli_args: &CliArgs) -> Result<Self> {
        Self::discover_from_with_env(start_dir, cli_args, |name| std::env::var(name).ok())
    }

    /// Discover configuration with an injected environment lookup.
    ///
    /// This is the path-driven variant used by tests to avoid process-global state.
    pub fn discover_from_with_env<F>(start_dir: &Path, cli_args: &CliArgs, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut source_attribution = HashMap::new();

        let mut defaults = Defaults::default();
        let mut llm = LlmConfig::default();
        let mut retry = RetryConfig::default();

        // Discover and load config file (if not explicitly provided)
        let config_path = if let Some(explicit_path) = &cli_args.config_path {
            if !explicit_path.exists() {
                anyhow::bail!("Config file not found: {}", explicit_path.display());
            }
            Some(explicit_path.clone())
        } else {
            Self::discover_config_file_from(start_dir)?
        };

        if let Some(path) = &config_path {
            let file_config = Self::load_config_file(path)
                .with_context(|| format!("Failed to load config file: {}", path.display()))?;
            tracing::debug!(path = %path.display(), "loaded config file");

            let src = ConfigSource::ConfigFile(path.clone());
            let attr = &mut source_attribution;

            if let Some(file) = file_config.defaults {
                apply(&mut defaults.verbose, file.verbose, "verbose", &src, attr);
                apply(&mut defaults.stream, file.stream, "stream", &src, attr);
            }

            if let Some(file) = file_config.llm {
                apply(&mut llm.provider, file.provider, "llm_provider", &src, attr);
                apply(&mut llm.base_url, file.base_url, "base_url", &src, attr);
                apply(&mut llm.api_key_env, file.api_key_env, "api_key_env", &src, attr);
                apply(&mut llm.api_key, file.api_key, "api_key", &src, attr);
                apply(&mut llm.model, file.model, "model", &src, attr);
                apply(
                    &mut llm.model_preferences,
                    file.model_preferences,
                    "model_preferences",
                    &src,
                    attr,
                );
                apply(&mut llm.fallback_model, file.fallback_model, "fallback_model", &src, attr);
                apply(&mut llm.timeout_secs, file.timeout_secs, "timeout_secs", &src, attr);
                apply(&mut llm.temperature, file.temperature, "temperature", &src, attr);
                apply(
                    &mut llm.max_output_tokens,
                    file.max_output_tokens,
                    "max_output_tokens",
                    &src,
                    attr,
                );
                apply(&mut llm.relax_safety, file.relax_safety, "relax_safety", &src, attr);
                apply(
                    &mut llm.prompt_template,
                    file.prompt_template,
                    "prompt_template",
                    &src,
                    attr,
                );
            }

            if let Some(file) = file_config.retry {
                apply(&mut retry.max_attempts, file.max_attempts, "max_attempts", &src, attr);
                apply(&mut retry.cooldown_secs, file.cooldown_secs, "cooldown_secs", &src, attr);
            }
        }

        // Environment overrides the config file
        for (var, key) in [("CLAUSEWATCH_MODEL", "model"), ("CLAUSEWATCH_BASE_URL", "base_url")] {
            if let Some(value) = env(var).filter(|v| !v.trim().is_empty()) {
                let slot = match key {
                    "model" => &mut llm.model,
                    _ => &mut llm.base_url,
                };
                apply(
                    slot,
                    Some(value),
                    key,
                    &ConfigSource::Env(var.to_string()),
                    &mut source_attribution,
                );
            }
        }

        // CLI flags override everything
        let cli = ConfigSource::Cli;
        let attr = &mut source_attribution;
        apply(&mut defaults.verbose, cli_args.verbose, "verbose", &cli, attr);
        apply(&mut defaults.stream, cli_args.stream, "stream", &cli, attr);
        apply(&mut llm.model, cli_args.model.clone(), "model", &cli, attr);
        apply(&mut llm.base_url, cli_args.base_url.clone(), "base_url", &cli, attr);
        apply(&mut llm.timeout_secs, cli_args.timeout_secs, "timeout_secs", &cli, attr);
        apply(
            &mut llm.prompt_template,
            cli_args.prompt_template.clone(),
            "prompt_template",
            &cli,
            attr,
        );
        apply(&mut retry.max_attempts, cli_args.max_attempts, "max_attempts", &cli, attr);
        apply(&mut retry.cooldown_secs, cli_args.cooldown_secs, "cooldown_secs", &cli, attr);

        let api_key = Self::resolve_api_key(cli_args, &llm, &env, &config_path, attr);

        let config = Self {
            defaults,
            llm,
            retry,
            api_key,
            source_attribution,
        };

        // Validate the final configuration
        config.validate()?;

        Ok(config)
    }

    /// Resolve the credential: `--api-key` > key environment variable > file value.
    fn resolve_api_key<F>(
        cli_args: &CliArgs,
        llm: &LlmConfig,
        env: &F,
        config_path: &Option<PathBuf>,
        attribution: &mut HashMap<String, ConfigSource>,
    ) -> Option<ApiKey>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = cli_args.api_key.as_deref().and_then(ApiKey::parse) {
            attribution.insert("api_key".to_string(), ConfigSource::Cli);
            return Some(key);
        }

        let primary = llm.api_key_env.as_deref().unwrap_or(DEFAULT_API_KEY_ENV);
        let mut candidates = vec![primary];
        if llm.api_key_env.is_none() {
            candidates.push(SECONDARY_API_KEY_ENV);
        }
        for var in candidates {
            if let Some(key) = env(var).as_deref().and_then(ApiKey::parse) {
                attribution.insert("api_key".to_string(), ConfigSource::Env(var.to_string()));
                return Some(key);
            }
        }

        let from_file = llm.api_key.as_deref().and_then(ApiKey::parse);
        if from_file.is_none() {
            attribution.remove("api_key");
        } else if let Some(path) = config_path {
            attribution.insert("api_key".to_string(), ConfigSource::ConfigFile(path.clone()));
        }
        from_file
    }

    /// Discover config file by searching upward from a given directory
    ///
    /// Walks up the directory tree looking for `.clausewatch/config.toml`,
    /// stopping at repository root markers (.git, .hg, .svn) or filesystem root.
    pub fn discover_config_file_from(start_dir: &Path) -> Result<Option<PathBuf>> {
        let mut current_dir = start_dir.to_path_buf();

        loop {
            let config_path = current_dir.join(".clausewatch").join("config.toml");
            if config_path.exists() {
                return Ok(Some(config_path));
            }

            // Stop at repository root if no config found
            if current_dir.join(".git").exists()
                || current_dir.join(".hg").exists()
                || current_dir.join(".svn").exists()
            {
                break;
            }

            match current_dir.parent() {
                Some(parent) => current_dir = parent.to_path_buf(),
                None => break,
            }
        }

        Ok(None)
    }

    /// Load configuration from TOML file
    fn load_config_file(path: &Path) -> Result<TomlConfig> {
        match std::fs::read_to_string(path) {
            Ok(content) => {
                let config: TomlConfig = toml::from_str(&content).with_context(|| {
                    format!("Failed to parse TOML config file: {}", path.display())
                })?;
                Ok(config)
            }
            // Missing config file is OK - defaults apply
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(TomlConfig::default()),
            Err(e) => Err(anyhow::anyhow!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            )),
        }
    }
}
