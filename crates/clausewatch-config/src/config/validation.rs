use clausewatch_prompt_template::PromptTemplate;
use clausewatch_utils::error::ConfigError;

use super::Config;

fn invalid(key: &str, value: impl Into<String>) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.into(),
    }
}

impl Config {
    /// Validate configuration values
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if let Some(provider) = self.llm.provider.as_deref()
            && provider != "gemini"
        {
            return Err(invalid(
                "llm_provider",
                format!("unknown provider '{provider}' (supported: gemini)"),
            ));
        }

        if let Some(url) = self.llm.base_url.as_deref()
            && !(url.starts_with("http://") || url.starts_with("https://"))
        {
            return Err(invalid("base_url", format!("'{url}' is not an http(s) URL")));
        }

        if let Some(var) = self.llm.api_key_env.as_deref()
            && var.trim().is_empty()
        {
            return Err(invalid("api_key_env", "must not be empty"));
        }

        if let Some(prefs) = &self.llm.model_preferences
            && prefs.iter().any(|p| p.trim().is_empty())
        {
            return Err(invalid("model_preferences", "entries must not be empty"));
        }

        if let Some(fallback) = self.llm.fallback_model.as_deref()
            && fallback.trim().is_empty()
        {
            return Err(invalid("fallback_model", "must not be empty"));
        }

        if let Some(timeout) = self.llm.timeout_secs {
            if timeout < 5 {
                return Err(invalid("timeout_secs", "must be at least 5 seconds"));
            }
            if timeout > 1800 {
                return Err(invalid(
                    "timeout_secs",
                    "exceeds maximum limit of 1800 seconds (30 minutes)",
                ));
            }
        }

        if let Some(temperature) = self.llm.temperature
            && !(0.0..=2.0).contains(&temperature)
        {
            return Err(invalid("temperature", "must be between 0.0 and 2.0"));
        }

        if let Some(0) = self.llm.max_output_tokens {
            return Err(invalid("max_output_tokens", "must be greater than 0"));
        }

        if let Some(name) = self.llm.prompt_template.as_deref() {
            PromptTemplate::parse(name).map_err(|e| invalid("prompt_template", e))?;
        }

        if let Some(attempts) = self.retry.max_attempts {
            if attempts == 0 {
                return Err(invalid("max_attempts", "must be at least 1"));
            }
            if attempts > 10 {
                return Err(invalid("max_attempts", "exceeds maximum limit of 10"));
            }
        }

        if let Some(cooldown) = self.retry.cooldown_secs
            && cooldown > 3600
        {
            return Err(invalid(
                "cooldown_secs",
                "exceeds maximum limit of 3600 seconds (1 hour)",
            ));
        }

        Ok(())
    }
}
