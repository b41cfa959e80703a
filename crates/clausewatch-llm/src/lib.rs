//! Generative-language backends for clausewatch
//!
//! All providers implement the `LlmBackend` trait, so model selection and the
//! completion client work against any backend without knowing transport
//! details. The only HTTP provider is Gemini; [`RetryingBackend`] layers the
//! rate-limit policy over it.

mod completion;
mod gemini_backend;
pub(crate) mod http_client;
mod model_selector;
mod retry;
pub(crate) mod sse;
mod types;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_support;

use std::sync::Arc;

pub use clausewatch_config as config;
pub use clausewatch_utils::error::LlmError;

pub use completion::{CompletionClient, CompletionOptions, CompletionResult};
pub use gemini_backend::{GeminiBackend, GenerationParams};
pub use model_selector::{ModelSelection, ModelSelector, choose_model};
pub use retry::{RetryObserver, RetryPolicy, RetryingBackend, SilentObserver};
pub use types::{
    FragmentStream, GENERATE_CONTENT, LlmBackend, LlmInvocation, LlmResult, Message, ModelInfo,
    Role, strip_model_prefix,
};

use crate::config::{ApiKey, Config};

const SUPPORTED_PROVIDERS: &[&str] = &["gemini"];

/// Construct the backend named by `llm.provider` using `api_key`.
///
/// # Errors
///
/// Returns `LlmError::Unsupported` if the provider is unknown.
/// Returns `LlmError::Misconfiguration` if the HTTP client cannot be built.
pub fn from_config(config: &Config, api_key: ApiKey) -> Result<Arc<dyn LlmBackend>, LlmError> {
    let provider = config.llm.provider.as_deref().unwrap_or("gemini");
    match provider {
        "gemini" => Ok(Arc::new(GeminiBackend::new_from_config(config, api_key)?)),
        other => Err(LlmError::Unsupported(format!(
            "Unknown provider '{other}'. Supported providers: {}",
            SUPPORTED_PROVIDERS.join(", ")
        ))),
    }
}

/// Builds a backend once the credential is known.
///
/// The credential may be entered after the session starts, so callers hold a
/// connector rather than a ready backend.
pub trait BackendConnector: Send + Sync {
    /// # Errors
    ///
    /// Returns the construction error of the underlying backend.
    fn connect(&self, api_key: &ApiKey) -> Result<Arc<dyn LlmBackend>, LlmError>;
}

/// Connector for the configured provider.
#[derive(Debug, Clone)]
pub struct ConfiguredConnector {
    config: Config,
}

impl ConfiguredConnector {
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self { config }
    }
}

impl BackendConnector for ConfiguredConnector {
    fn connect(&self, api_key: &ApiKey) -> Result<Arc<dyn LlmBackend>, LlmError> {
        from_config(&self.config, api_key.clone())
    }
}

/// Connector that hands out the same backend for every credential.
pub struct FixedConnector(pub Arc<dyn LlmBackend>);

impl BackendConnector for FixedConnector {
    fn connect(&self, _api_key: &ApiKey) -> Result<Arc<dyn LlmBackend>, LlmError> {
        Ok(Arc::clone(&self.0))
    }
}
