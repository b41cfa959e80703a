//! Completion client: one prompt in, the model's full text out

use std::sync::Arc;
use std::time::{Duration, Instant};

use clausewatch_utils::error::LlmError;
use futures::StreamExt;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::retry::{RetryObserver, RetryPolicy, RetryingBackend};
use crate::types::{LlmBackend, LlmInvocation, Message, strip_model_prefix};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompletionOptions {
    /// Request incremental delivery
    pub stream: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompletionResult {
    pub text: String,
    pub model_used: String,
    pub streamed: bool,
    /// Fragments received; 1 for a non-streamed answer
    pub fragments: usize,
}

pub struct CompletionClient {
    backend: Arc<dyn LlmBackend>,
    timeout: Duration,
}

impl CompletionClient {
    /// Client calling `backend` directly, without retry.
    pub fn new(backend: Arc<dyn LlmBackend>, timeout: Duration) -> Self {
        Self { backend, timeout }
    }

    /// Client whose calls go through a [`RetryingBackend`] built from `policy`.
    pub fn with_retry(
        backend: Arc<dyn LlmBackend>,
        timeout: Duration,
        policy: RetryPolicy,
        cancel: CancellationToken,
        observer: Arc<dyn RetryObserver>,
    ) -> Self {
        let retrying = RetryingBackend::new(backend, policy, cancel, observer);
        Self::new(Arc::new(retrying), timeout)
    }

    pub fn backend(&self) -> &Arc<dyn LlmBackend> {
        &self.backend
    }

    /// Send `prompt` to `model` and return the complete answer.
    ///
    /// When streaming, `on_fragment` is called with each fragment in arrival
    /// order; the returned text is their concatenation. Without streaming it
    /// is called once with the whole answer.
    ///
    /// # Errors
    ///
    /// Any `LlmError` from the backend, including a failure after some
    /// fragments were already delivered.
    pub async fn complete(
        &self,
        model: &str,
        prompt: &str,
        options: CompletionOptions,
        on_fragment: &mut (dyn FnMut(&str) + Send),
    ) -> Result<CompletionResult, LlmError> {
        let inv = LlmInvocation::new(model, self.timeout, vec![Message::user(prompt)]);
        let started = Instant::now();

        debug!(
            model,
            stream = options.stream,
            prompt_chars = prompt.chars().count(),
            "starting completion"
        );

        let result = if options.stream {
            let mut fragments = self.backend.invoke_stream(inv).await?;
            let mut text = String::new();
            let mut count = 0;
            while let Some(fragment) = fragments.next().await {
                let fragment = fragment?;
                on_fragment(&fragment);
                text.push_str(&fragment);
                count += 1;
            }
            CompletionResult {
                text,
                model_used: strip_model_prefix(model).to_string(),
                streamed: true,
                fragments: count,
            }
        } else {
            let answer = self.backend.invoke(inv).await?;
            on_fragment(&answer.raw_response);
            CompletionResult {
                text: answer.raw_response,
                model_used: answer.model_used,
                streamed: false,
                fragments: 1,
            }
        };

        info!(
            model = %result.model_used,
            chars = result.text.chars().count(),
            fragments = result.fragments,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "completion finished"
        );
        Ok(result)
    }
}
