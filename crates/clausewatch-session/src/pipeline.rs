use std::sync::Arc;
use std::time::Duration;

use clausewatch_config::Config;
use clausewatch_llm::{
    CompletionClient, CompletionOptions, LlmBackend, LlmError, ModelSelection, ModelSelector,
    RetryObserver, RetryPolicy, SilentObserver, strip_model_prefix,
};
use clausewatch_prompt_template::{PromptTemplate, build_prompt};
use clausewatch_report::{ParsedResponse, parse_with_placeholder};
use clausewatch_utils::logging::{Stage, stage_span};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, info};

/// Result of one pipeline run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Analysis {
    pub model: ModelSelection,
    pub parsed: ParsedResponse,
    pub streamed: bool,
    pub response_chars: usize,
}

/// Select a model, build the prompt, run the completion and parse the answer.
pub struct AnalysisPipeline {
    selector: ModelSelector,
    pinned_model: Option<String>,
    template: PromptTemplate,
    options: CompletionOptions,
    timeout: Duration,
    policy: RetryPolicy,
    cancel: CancellationToken,
    observer: Arc<dyn RetryObserver>,
}

impl AnalysisPipeline {
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            selector: ModelSelector::from_config(config),
            pinned_model: config.pinned_model().map(str::to_string),
            template: config.prompt_template(),
            options: CompletionOptions {
                stream: config.stream(),
            },
            timeout: config.timeout(),
            policy: RetryPolicy::from_config(config),
            cancel: CancellationToken::new(),
            observer: Arc::new(SilentObserver),
        }
    }

    #[must_use]
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn RetryObserver>) -> Self {
        self.observer = observer;
        self
    }

    #[must_use]
    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    #[must_use]
    pub fn with_stream(mut self, stream: bool) -> Self {
        self.options.stream = stream;
        self
    }

    #[must_use]
    pub fn template(&self) -> PromptTemplate {
        self.template
    }

    /// Pinned model if configured, otherwise the selector's choice.
    pub async fn select_model(&self, backend: &dyn LlmBackend) -> ModelSelection {
        if let Some(model) = &self.pinned_model {
            info!(model = %model, "using pinned model");
            return ModelSelection {
                model_id: strip_model_prefix(model).to_string(),
                fallback_reason: None,
            };
        }
        self.selector
            .select(backend)
            .instrument(stage_span(Stage::SelectModel, "-"))
            .await
    }

    /// Run the full pipeline for `contract_text`.
    ///
    /// # Errors
    ///
    /// Completion failures only; selection falls back and parsing is total.
    pub async fn run(
        &self,
        backend: Arc<dyn LlmBackend>,
        contract_text: &str,
        on_fragment: &mut (dyn FnMut(&str) + Send),
    ) -> Result<Analysis, LlmError> {
        let model = self.select_model(backend.as_ref()).await;

        let prompt = build_prompt(self.template, contract_text);

        let client = CompletionClient::with_retry(
            backend,
            self.timeout,
            self.policy.clone(),
            self.cancel.clone(),
            Arc::clone(&self.observer),
        );
        let completion = client
            .complete(&model.model_id, &prompt, self.options, on_fragment)
            .instrument(stage_span(Stage::Complete, &model.model_id))
            .await?;

        let parsed = {
            let _span = stage_span(Stage::Parse, &completion.model_used).entered();
            parse_with_placeholder(&completion.text, self.template.missing_tips_placeholder())
        };
        info!(
            model = %completion.model_used,
            has_data = parsed.data.is_some(),
            "parsed model answer"
        );

        Ok(Analysis {
            model,
            parsed,
            streamed: completion.streamed,
            response_chars: completion.text.chars().count(),
        })
    }
}
