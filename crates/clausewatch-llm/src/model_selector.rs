//! Deterministic model selection from the provider listing

use clausewatch_config::Config;
use clausewatch_utils::error::LlmError;
use clausewatch_utils::redaction::redact_error_message;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::types::{LlmBackend, ModelInfo, strip_model_prefix};

/// Pick a model id from `available` (listing order) using `preferences`.
///
/// Preferences are tried in order; the first one present wins. When none is
/// present the first available id is returned. Ids are compared without the
/// `models/` prefix.
///
/// # Errors
///
/// Returns `LlmError::NoCapableModel` when `available` is empty.
pub fn choose_model(available: &[String], preferences: &[String]) -> Result<String, LlmError> {
    let first = available.first().ok_or(LlmError::NoCapableModel)?;

    for wanted in preferences {
        let wanted = strip_model_prefix(wanted);
        if let Some(hit) = available
            .iter()
            .find(|id| strip_model_prefix(id) == wanted)
        {
            return Ok(strip_model_prefix(hit).to_string());
        }
    }

    Ok(strip_model_prefix(first).to_string())
}

/// Outcome of [`ModelSelector::select`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModelSelection {
    pub model_id: String,
    /// Set when the hardcoded fallback was used instead of the listing.
    pub fallback_reason: Option<String>,
}

impl ModelSelection {
    #[must_use]
    pub fn is_fallback(&self) -> bool {
        self.fallback_reason.is_some()
    }
}

#[derive(Debug, Clone)]
pub struct ModelSelector {
    preferences: Vec<String>,
    fallback: String,
}

impl ModelSelector {
    #[must_use]
    pub fn new(preferences: Vec<String>, fallback: impl Into<String>) -> Self {
        Self {
            preferences,
            fallback: fallback.into(),
        }
    }

    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.model_preferences(), config.fallback_model())
    }

    #[must_use]
    pub fn preferences(&self) -> &[String] {
        &self.preferences
    }

    #[must_use]
    pub fn fallback(&self) -> &str {
        &self.fallback
    }

    /// Generation-capable models in listing order, first appearance kept.
    ///
    /// # Errors
    ///
    /// Propagates listing failures from the backend.
    pub async fn capable_models(&self, backend: &dyn LlmBackend) -> Result<Vec<ModelInfo>, LlmError> {
        let listed = backend.list_models().await?;
        let total = listed.len();

        let mut seen = std::collections::HashSet::new();
        let capable: Vec<ModelInfo> = listed
            .into_iter()
            .filter(ModelInfo::supports_generation)
            .filter(|m| seen.insert(m.id.clone()))
            .collect();

        debug!(total, capable = capable.len(), "filtered model listing");
        Ok(capable)
    }

    /// Choose a model. Never fails: listing errors and an empty capable list
    /// both fall back to the configured default id.
    pub async fn select(&self, backend: &dyn LlmBackend) -> ModelSelection {
        let outcome = match self.capable_models(backend).await {
            Ok(models) => {
                let ids: Vec<String> = models.into_iter().map(|m| m.id).collect();
                choose_model(&ids, &self.preferences)
            }
            Err(e) => Err(e),
        };

        match outcome {
            Ok(model_id) => {
                info!(model = %model_id, "selected model");
                ModelSelection {
                    model_id,
                    fallback_reason: None,
                }
            }
            Err(e) => {
                let reason = redact_error_message(&e.to_string());
                warn!(
                    fallback = %self.fallback,
                    reason = %reason,
                    "model selection failed; using fallback model"
                );
                ModelSelection {
                    model_id: strip_model_prefix(&self.fallback).to_string(),
                    fallback_reason: Some(reason),
                }
            }
        }
    }
}
