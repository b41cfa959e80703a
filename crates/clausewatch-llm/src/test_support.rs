//! Scripted backend for tests in this crate and its dependents.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use clausewatch_utils::error::LlmError;
use futures::StreamExt;

use crate::types::{
    FragmentStream, GENERATE_CONTENT, LlmBackend, LlmInvocation, LlmResult, ModelInfo,
    strip_model_prefix,
};

/// One scripted reply to `invoke` / `invoke_stream`.
#[derive(Debug, Clone)]
pub enum ScriptedReply {
    Text(String),
    /// Delivered as separate fragments when streaming, joined otherwise.
    Fragments(Vec<String>),
    Error(LlmError),
}

/// Backend that replays a fixed listing and a queue of replies.
#[derive(Debug, Default)]
pub struct ScriptedBackend {
    listing: Mutex<Option<Result<Vec<ModelInfo>, LlmError>>>,
    replies: Mutex<VecDeque<ScriptedReply>>,
    invocations: Mutex<Vec<LlmInvocation>>,
    list_calls: AtomicU32,
    invoke_calls: AtomicU32,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

impl ScriptedBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_models(self, models: Vec<ModelInfo>) -> Self {
        *lock(&self.listing) = Some(Ok(models));
        self
    }

    /// Listing with every id declaring `generateContent`.
    #[must_use]
    pub fn with_capable_models(self, ids: &[&str]) -> Self {
        let models = ids
            .iter()
            .map(|id| ModelInfo::new(id, vec![GENERATE_CONTENT.to_string()]))
            .collect();
        self.with_models(models)
    }

    #[must_use]
    pub fn with_listing_error(self, err: LlmError) -> Self {
        *lock(&self.listing) = Some(Err(err));
        self
    }

    #[must_use]
    pub fn with_reply(self, reply: ScriptedReply) -> Self {
        lock(&self.replies).push_back(reply);
        self
    }

    #[must_use]
    pub fn with_text(self, text: impl Into<String>) -> Self {
        self.with_reply(ScriptedReply::Text(text.into()))
    }

    #[must_use]
    pub fn with_error(self, err: LlmError) -> Self {
        self.with_reply(ScriptedReply::Error(err))
    }

    pub fn list_calls(&self) -> u32 {
        self.list_calls.load(Ordering::SeqCst)
    }

    /// Number of `invoke` plus `invoke_stream` calls.
    pub fn invoke_calls(&self) -> u32 {
        self.invoke_calls.load(Ordering::SeqCst)
    }

    pub fn invocations(&self) -> Vec<LlmInvocation> {
        lock(&self.invocations).clone()
    }

    fn next_reply(&self, inv: LlmInvocation) -> ScriptedReply {
        self.invoke_calls.fetch_add(1, Ordering::SeqCst);
        lock(&self.invocations).push(inv);
        lock(&self.replies).pop_front().unwrap_or_else(|| {
            ScriptedReply::Error(LlmError::Completion("no scripted reply left".to_string()))
        })
    }
}

#[async_trait]
impl LlmBackend for ScriptedBackend {
    fn provider_name(&self) -> &'static str {
        "scripted"
    }

    async fn list_models(&self) -> Result<Vec<ModelInfo>, LlmError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        lock(&self.listing).clone().unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn invoke(&self, inv: LlmInvocation) -> Result<LlmResult, LlmError> {
        let model = strip_model_prefix(&inv.model).to_string();
        match self.next_reply(inv) {
            ScriptedReply::Text(text) => Ok(LlmResult::new(text, "scripted", model)),
            ScriptedReply::Fragments(parts) => Ok(LlmResult::new(parts.concat(), "scripted", model)),
            ScriptedReply::Error(err) => Err(err),
        }
    }

    async fn invoke_stream(&self, inv: LlmInvocation) -> Result<FragmentStream, LlmError> {
        let parts = match self.next_reply(inv) {
            ScriptedReply::Text(text) => vec![text],
            ScriptedReply::Fragments(parts) => parts,
            ScriptedReply::Error(err) => return Err(err),
        };
        Ok(futures::stream::iter(parts.into_iter().map(Ok)).boxed())
    }
}
