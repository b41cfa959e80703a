//! Core types for LLM backend abstraction

use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

use clausewatch_utils::error::LlmError;

/// Generation method a model must declare to be usable for analysis.
pub const GENERATE_CONTENT: &str = "generateContent";

/// Role of a message in a conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System-level instructions
    System,
    /// User input
    User,
    /// Model response
    Model,
}

/// A single message in a conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    #[must_use]
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }
}

/// Input to an LLM backend invocation
#[derive(Debug, Clone)]
pub struct LlmInvocation {
    /// Model id, with or without the `models/` prefix
    pub model: String,
    pub timeout: Duration,
    /// Ordered list of messages in the conversation
    pub messages: Vec<Message>,
    /// Provider-specific overrides (`temperature`, `max_output_tokens`)
    pub metadata: HashMap<String, serde_json::Value>,
}

impl LlmInvocation {
    #[must_use]
    pub fn new(model: impl Into<String>, timeout: Duration, messages: Vec<Message>) -> Self {
        Self {
            model: model.into(),
            timeout,
            messages,
            metadata: HashMap::new(),
        }
    }

    /// Add metadata to the invocation
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }
}

/// Result from an LLM backend invocation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmResult {
    /// Raw response text from the model
    pub raw_response: String,
    pub provider: String,
    /// Model that was actually used
    pub model_used: String,
    pub tokens_input: Option<u64>,
    pub tokens_output: Option<u64>,
    pub finish_reason: Option<String>,
}

impl LlmResult {
    #[must_use]
    pub fn new(
        raw_response: impl Into<String>,
        provider: impl Into<String>,
        model_used: impl Into<String>,
    ) -> Self {
        Self {
            raw_response: raw_response.into(),
            provider: provider.into(),
            model_used: model_used.into(),
            tokens_input: None,
            tokens_output: None,
            finish_reason: None,
        }
    }

    /// Set token counts
    #[must_use]
    pub fn with_tokens(mut self, input: u64, output: u64) -> Self {
        self.tokens_input = Some(input);
        self.tokens_output = Some(output);
        self
    }

    #[must_use]
    pub fn with_finish_reason(mut self, reason: impl Into<String>) -> Self {
        self.finish_reason = Some(reason.into());
        self
    }
}

/// A model entry from the listing call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelInfo {
    /// Identifier without the `models/` prefix
    pub id: String,
    pub display_name: Option<String>,
    pub supported_generation_methods: Vec<String>,
}

impl ModelInfo {
    /// Build from a listing name, stripping the `models/` prefix.
    #[must_use]
    pub fn new(name: &str, supported_generation_methods: Vec<String>) -> Self {
        Self {
            id: strip_model_prefix(name).to_string(),
            display_name: None,
            supported_generation_methods,
        }
    }

    #[must_use]
    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    /// Whether the model declares the `generateContent` capability.
    #[must_use]
    pub fn supports_generation(&self) -> bool {
        self.supported_generation_methods
            .iter()
            .any(|m| m == GENERATE_CONTENT)
    }
}

/// `models/gemini-1.5-flash` -> `gemini-1.5-flash`
#[must_use]
pub fn strip_model_prefix(name: &str) -> &str {
    name.strip_prefix("models/").unwrap_or(name)
}

/// Text fragments of a streamed answer, in arrival order.
pub type FragmentStream = BoxStream<'static, Result<String, LlmError>>;

/// Trait for LLM backend implementations
///
/// The HTTP backend and test doubles implement this trait, so the completion
/// client and model selector never see transport details.
#[async_trait]
pub trait LlmBackend: Send + Sync {
    /// Short provider name for logs and results
    fn provider_name(&self) -> &'static str;

    /// List every model visible to the credential, in listing order.
    async fn list_models(&self) -> Result<Vec<ModelInfo>, LlmError>;

    /// Invoke the model and wait for the full answer.
    ///
    /// # Errors
    ///
    /// Returns `LlmError` for any failure during invocation, including
    /// transport failures, provider errors (auth, quota, outages) and timeouts.
    async fn invoke(&self, inv: LlmInvocation) -> Result<LlmResult, LlmError>;

    /// Invoke the model with incremental delivery.
    ///
    /// Errors that happen before the stream opens are returned directly; later
    /// ones arrive as stream items. The default delivers the whole answer as a
    /// single fragment.
    async fn invoke_stream(&self, inv: LlmInvocation) -> Result<FragmentStream, LlmError> {
        let result = self.invoke(inv).await?;
        Ok(Box::pin(futures::stream::once(async move {
            Ok(result.raw_response)
        })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_info_strips_prefix() {
        let info = ModelInfo::new("models/gemini-1.5-flash", vec![GENERATE_CONTENT.into()]);
        assert_eq!(info.id, "gemini-1.5-flash");
        assert!(info.supports_generation());
    }

    #[test]
    fn test_embedding_model_not_capable() {
        let info = ModelInfo::new("models/text-embedding-004", vec!["embedContent".into()]);
        assert!(!info.supports_generation());
    }

    #[test]
    fn test_invocation_metadata() {
        let inv = LlmInvocation::new("m", Duration::from_secs(5), vec![Message::user("hi")])
            .with_metadata("temperature", serde_json::json!(0.3));
        assert_eq!(inv.metadata["temperature"], serde_json::json!(0.3));
        assert_eq!(inv.messages[0].role, Role::User);
    }
}
