use std::collections::BTreeMap;

use super::{Config, ConfigSource};

fn source_label(source: Option<&ConfigSource>) -> String {
    match source {
        Some(ConfigSource::Cli) => "cli".to_string(),
        Some(ConfigSource::Env(var)) => format!("env:{var}"),
        Some(ConfigSource::ConfigFile(_)) => "config".to_string(),
        Some(ConfigSource::Programmatic) => "programmatic".to_string(),
        Some(ConfigSource::Default) | None => "default".to_string(),
    }
}

impl Config {
    /// Effective configuration as `key -> (value, source)`, sorted by key.
    ///
    /// The API key is reported as set or unset, never by value.
    #[must_use]
    pub fn effective_config(&self) -> BTreeMap<String, (String, String)> {
        let mut config = BTreeMap::new();

        let mut add = |key: &str, value: String| {
            let source = source_label(self.source_attribution.get(key));
            config.insert(key.to_string(), (value, source));
        };

        add("verbose", self.verbose().to_string());
        add("stream", self.stream().to_string());
        add("base_url", self.base_url().to_string());
        add(
            "api_key",
            if self.api_key.is_some() { "set" } else { "unset" }.to_string(),
        );
        add(
            "model",
            self.pinned_model().unwrap_or("(auto)").to_string(),
        );
        add("model_preferences", self.model_preferences().join(", "));
        add("fallback_model", self.fallback_model().to_string());
        add("timeout_secs", self.timeout().as_secs().to_string());
        if let Some(temperature) = self.llm.temperature {
            add("temperature", temperature.to_string());
        }
        if let Some(tokens) = self.llm.max_output_tokens {
            add("max_output_tokens", tokens.to_string());
        }
        add("relax_safety", self.relax_safety().to_string());
        add("prompt_template", self.prompt_template().as_str().to_string());
        add("max_attempts", self.max_attempts().to_string());
        add("cooldown_secs", self.cooldown().as_secs().to_string());

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ApiKey;

    #[test]
    fn test_effective_config_hides_key() {
        let config = Config::builder()
            .api_key(ApiKey::parse("very-secret").unwrap())
            .build()
            .unwrap();
        let effective = config.effective_config();

        assert_eq!(
            effective.get("api_key"),
            Some(&("set".to_string(), "programmatic".to_string()))
        );
        assert!(
            effective
                .values()
                .all(|(value, _)| !value.contains("very-secret"))
        );
        assert_eq!(
            effective.get("max_attempts"),
            Some(&("3".to_string(), "default".to_string()))
        );
    }
}
