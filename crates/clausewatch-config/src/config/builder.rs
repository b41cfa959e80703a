use std::collections::HashMap;

use clausewatch_utils::error::ConfigError;

use crate::secret::ApiKey;

use super::{Config, ConfigSource, Defaults, LlmConfig, RetryConfig};

impl Config {
    /// Create a builder for programmatic configuration.
    ///
    /// Use this when you need to configure clausewatch without relying on
    /// environment variables or config files.
    ///
    /// ```rust
    /// use clausewatch_config::{ApiKey, Config};
    ///
    /// let config = Config::builder()
    ///     .api_key(ApiKey::parse("test-key").unwrap())
    ///     .base_url("http://127.0.0.1:8080/v1beta")
    ///     .cooldown_secs(0)
    ///     .build()
    ///     .expect("valid config");
    /// assert_eq!(config.max_attempts(), 3);
    /// ```
    #[must_use]
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }
}

/// Builder for programmatic configuration.
///
/// All values set via the builder are attributed to
/// [`ConfigSource::Programmatic`].
#[derive(Debug, Clone, Default)]
pub struct ConfigBuilder {
    defaults: Defaults,
    llm: LlmConfig,
    retry: RetryConfig,
    api_key: Option<ApiKey>,
    source_attribution: HashMap<String, ConfigSource>,
}

macro_rules! setter {
    ($(#[$meta:meta])* $name:ident: into $ty:ty => $section:ident . $field:ident) => {
        $(#[$meta])*
        #[must_use]
        pub fn $name(mut self, value: impl Into<$ty>) -> Self {
            self.$section.$field = Some(value.into());
            self.source_attribution
                .insert(stringify!($name).to_string(), ConfigSource::Programmatic);
            self
        }
    };
    ($(#[$meta:meta])* $name:ident: $ty:ty => $section:ident . $field:ident) => {
        $(#[$meta])*
        #[must_use]
        pub fn $name(mut self, value: $ty) -> Self {
            self.$section.$field = Some(value);
            self.source_attribution
                .insert(stringify!($name).to_string(), ConfigSource::Programmatic);
            self
        }
    };
}

impl ConfigBuilder {
    setter!(verbose: bool => defaults.verbose);
    setter!(stream: bool => defaults.stream);
    setter!(base_url: into String => llm.base_url);
    setter!(
        /// Pin a model, skipping automatic selection.
        model: into String => llm.model
    );
    setter!(model_preferences: Vec<String> => llm.model_preferences);
    setter!(fallback_model: into String => llm.fallback_model);
    setter!(timeout_secs: u64 => llm.timeout_secs);
    setter!(temperature: f32 => llm.temperature);
    setter!(max_output_tokens: u32 => llm.max_output_tokens);
    setter!(relax_safety: bool => llm.relax_safety);
    setter!(prompt_template: into String => llm.prompt_template);
    setter!(max_attempts: u32 => retry.max_attempts);
    setter!(
        /// Cooldown between rate-limited attempts. Zero disables the wait.
        cooldown_secs: u64 => retry.cooldown_secs
    );

    #[must_use]
    pub fn api_key(mut self, key: ApiKey) -> Self {
        self.api_key = Some(key);
        self.source_attribution
            .insert("api_key".to_string(), ConfigSource::Programmatic);
        self
    }

    /// Build and validate the configuration.
    pub fn build(self) -> Result<Config, ConfigError> {
        let config = self.build_unchecked();
        config.validate()?;
        Ok(config)
    }

    pub(crate) fn build_unchecked(self) -> Config {
        Config {
            defaults: self.defaults,
            llm: self.llm,
            retry: self.retry,
            api_key: self.api_key,
            source_attribution: self.source_attribution,
        }
    }
}
