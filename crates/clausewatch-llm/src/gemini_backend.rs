//! Gemini HTTP backend implementation
//!
//! Talks to the Generative Language REST API: `GET models` for listing (with
//! pagination), `POST models/{id}:generateContent` for a full answer and
//! `POST models/{id}:streamGenerateContent?alt=sse` for incremental delivery.

use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use clausewatch_config::{ApiKey, Config};
use clausewatch_utils::error::LlmError;
use futures::StreamExt;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::http_client::{HttpClient, map_body_error};
use crate::sse::SseDecoder;
use crate::types::{
    FragmentStream, LlmBackend, LlmInvocation, LlmResult, Message, ModelInfo, Role,
    strip_model_prefix,
};

const PROVIDER: &str = "gemini";

/// Models requested per listing page.
const LIST_PAGE_SIZE: u32 = 1000;

/// Upper bound on listing pages, in case a server keeps handing out tokens.
const MAX_LIST_PAGES: usize = 50;

const LIST_TIMEOUT: Duration = Duration::from_secs(30);

/// Harm categories relaxed to `BLOCK_NONE` so contract language is not filtered.
const HARM_CATEGORIES: [&str; 4] = [
    "HARM_CATEGORY_HARASSMENT",
    "HARM_CATEGORY_HATE_SPEECH",
    "HARM_CATEGORY_SEXUALLY_EXPLICIT",
    "HARM_CATEGORY_DANGEROUS_CONTENT",
];

type BodyStream = BoxStream<'static, Result<Vec<u8>, reqwest::Error>>;

/// Generation parameters applied to every request unless overridden by
/// invocation metadata.
#[derive(Debug, Clone, Default)]
pub struct GenerationParams {
    pub temperature: Option<f32>,
    pub max_output_tokens: Option<u32>,
    pub relax_safety: bool,
}

/// Gemini backend configuration
#[derive(Clone)]
pub struct GeminiBackend {
    client: HttpClient,
    base_url: String,
    api_key: ApiKey,
    params: GenerationParams,
}

impl std::fmt::Debug for GeminiBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiBackend")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key)
            .field("params", &self.params)
            .finish()
    }
}

impl GeminiBackend {
    /// Create a new Gemini backend
    ///
    /// # Errors
    ///
    /// Returns `LlmError::Misconfiguration` if the HTTP client cannot be constructed
    pub fn new(
        api_key: ApiKey,
        base_url: impl Into<String>,
        params: GenerationParams,
    ) -> Result<Self, LlmError> {
        Ok(Self {
            client: HttpClient::new()?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            params,
        })
    }

    /// Create a new Gemini backend from configuration and a credential.
    pub fn new_from_config(config: &Config, api_key: ApiKey) -> Result<Self, LlmError> {
        let params = GenerationParams {
            temperature: config.llm.temperature,
            max_output_tokens: config.llm.max_output_tokens,
            relax_safety: config.relax_safety(),
        };
        Self::new(api_key, config.base_url(), params)
    }

    fn model_url(&self, model: &str, method: &str) -> String {
        format!(
            "{}/models/{}:{}",
            self.base_url,
            strip_model_prefix(model),
            method
        )
    }

    fn build_request(&self, inv: &LlmInvocation) -> GenerateContentRequest {
        let mut contents = Vec::new();
        let mut system_parts = Vec::new();
        for Message { role, content } in &inv.messages {
            let part = Part {
                text: content.clone(),
            };
            match role {
                Role::System => system_parts.push(part),
                Role::User => contents.push(Content {
                    role: "user",
                    parts: vec![part],
                }),
                Role::Model => contents.push(Content {
                    role: "model",
                    parts: vec![part],
                }),
            }
        }

        let temperature = inv
            .metadata
            .get("temperature")
            .and_then(|v| v.as_f64())
            .map(|v| v as f32)
            .or(self.params.temperature);
        let max_output_tokens = inv
            .metadata
            .get("max_output_tokens")
            .and_then(|v| v.as_u64())
            .map(|v| v.min(u64::from(u32::MAX)) as u32)
            .or(self.params.max_output_tokens);

        let generation_config = (temperature.is_some() || max_output_tokens.is_some()).then_some(
            GenerationConfig {
                temperature,
                max_output_tokens,
            },
        );

        let safety_settings = if self.params.relax_safety {
            HARM_CATEGORIES
                .iter()
                .map(|category| SafetySetting {
                    category,
                    threshold: "BLOCK_NONE",
                })
                .collect()
        } else {
            Vec::new()
        };

        GenerateContentRequest {
            contents,
            system_instruction: (!system_parts.is_empty()).then(|| Content {
                role: "system",
                parts: system_parts,
            }),
            safety_settings,
            generation_config,
        }
    }

    async fn list_page(&self, page_token: Option<&str>) -> Result<ListModelsResponse, LlmError> {
        let url = format!("{}/models", self.base_url);
        let mut query = vec![("pageSize", LIST_PAGE_SIZE.to_string())];
        if let Some(token) = page_token {
            query.push(("pageToken", token.to_string()));
        }

        let request = self
            .client
            .get(&url)
            .query(&query)
            .header("x-goog-api-key", self.api_key.expose());
        let response = self.client.execute(request, LIST_TIMEOUT, PROVIDER).await?;
        let body = response
            .text()
            .await
            .map_err(|e| map_body_error(&e, PROVIDER))?;
        serde_json::from_str(&body).map_err(|e| {
            LlmError::Transport(format!("Failed to parse {PROVIDER} model listing: {e}"))
        })
    }
}

#[async_trait]
impl LlmBackend for GeminiBackend {
    fn provider_name(&self) -> &'static str {
        PROVIDER
    }

    async fn list_models(&self) -> Result<Vec<ModelInfo>, LlmError> {
        let mut models = Vec::new();
        let mut token: Option<String> = None;

        for page in 0..MAX_LIST_PAGES {
            let response = self.list_page(token.as_deref()).await?;
            debug!(page, count = response.models.len(), "listed models page");

            models.extend(response.models.into_iter().map(|m| {
                let info = ModelInfo::new(&m.name, m.supported_generation_methods);
                match m.display_name {
                    Some(name) => info.with_display_name(name),
                    None => info,
                }
            }));

            match response.next_page_token.filter(|t| !t.is_empty()) {
                Some(next) if Some(&next) != token.as_ref() => token = Some(next),
                _ => return Ok(models),
            }
        }

        warn!(
            pages = MAX_LIST_PAGES,
            "model listing did not finish; using the pages fetched"
        );
        Ok(models)
    }

    async fn invoke(&self, inv: LlmInvocation) -> Result<LlmResult, LlmError> {
        let body = self.build_request(&inv);
        let url = self.model_url(&inv.model, "generateContent");

        debug!(
            model = %inv.model,
            relax_safety = self.params.relax_safety,
            "Sending generateContent request"
        );

        let request = self
            .client
            .post(&url)
            .header("x-goog-api-key", self.api_key.expose())
            .json(&body);
        let response = self.client.execute(request, inv.timeout, PROVIDER).await?;
        let text = response
            .text()
            .await
            .map_err(|e| map_body_error(&e, PROVIDER))?;
        let parsed: GenerateContentResponse = serde_json::from_str(&text).map_err(|e| {
            LlmError::Transport(format!("Failed to parse {PROVIDER} response: {e}"))
        })?;

        let extracted = parsed.extract();
        if extracted.text.is_empty() {
            return Err(extracted.empty_error());
        }

        let mut result = LlmResult::new(extracted.text, PROVIDER, strip_model_prefix(&inv.model));
        if let Some(usage) = parsed.usage_metadata {
            result = result.with_tokens(
                usage.prompt_token_count.unwrap_or(0),
                usage.candidates_token_count.unwrap_or(0),
            );
        }
        if let Some(reason) = extracted.finish_reason {
            result = result.with_finish_reason(reason);
        }
        Ok(result)
    }

    async fn invoke_stream(&self, inv: LlmInvocation) -> Result<FragmentStream, LlmError> {
        let body = self.build_request(&inv);
        let url = format!(
            "{}?alt=sse",
            self.model_url(&inv.model, "streamGenerateContent")
        );

        debug!(model = %inv.model, "Opening streamGenerateContent request");

        let request = self
            .client
            .post(&url)
            .header("x-goog-api-key", self.api_key.expose())
            .json(&body);
        let response = self.client.execute(request, inv.timeout, PROVIDER).await?;

        let body: BodyStream = response
            .bytes_stream()
            .map(|chunk| chunk.map(|b| b.to_vec()))
            .boxed();

        let state = StreamState {
            body,
            decoder: SseDecoder::default(),
            pending: VecDeque::new(),
            produced: false,
            done: false,
        };

        let stream = futures::stream::unfold(state, |mut st| async move {
            loop {
                if let Some(item) = st.pending.pop_front() {
                    return Some((item, st));
                }
                if st.done {
                    return None;
                }
                match st.body.next().await {
                    Some(Ok(chunk)) => {
                        for payload in st.decoder.push(&chunk) {
                            st.handle_payload(&payload);
                        }
                    }
                    Some(Err(e)) => st.fail(map_body_error(&e, PROVIDER)),
                    None => {
                        for payload in st.decoder.finish() {
                            st.handle_payload(&payload);
                        }
                        if !st.done && !st.produced {
                            st.fail(LlmError::Completion(format!(
                                "{PROVIDER} stream ended without any text"
                            )));
                        }
                        st.done = true;
                    }
                }
            }
        });

        Ok(stream.boxed())
    }
}

struct StreamState {
    body: BodyStream,
    decoder: SseDecoder,
    pending: VecDeque<Result<String, LlmError>>,
    produced: bool,
    done: bool,
}

impl StreamState {
    fn fail(&mut self, err: LlmError) {
        self.pending.push_back(Err(err));
        self.done = true;
    }

    fn handle_payload(&mut self, payload: &str) {
        if self.done {
            return;
        }
        let chunk: GenerateContentResponse = match serde_json::from_str(payload) {
            Ok(chunk) => chunk,
            Err(e) => {
                self.fail(LlmError::Transport(format!(
                    "Malformed {PROVIDER} stream chunk: {e}"
                )));
                return;
            }
        };

        let extracted = chunk.extract();
        if !extracted.text.is_empty() {
            self.produced = true;
            self.pending.push_back(Ok(extracted.text));
        } else if extracted.block_reason.is_some() {
            self.fail(extracted.empty_error());
        }
    }
}

// Wire types

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    safety_settings: Vec<SafetySetting>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Serialize)]
struct Content {
    role: &'static str,
    parts: Vec<Part>,
}

#[derive(Serialize)]
struct Part {
    text: String,
}

#[derive(Serialize)]
struct SafetySetting {
    category: &'static str,
    threshold: &'static str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListModelsResponse {
    #[serde(default)]
    models: Vec<ModelEntry>,
    next_page_token: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ModelEntry {
    name: String,
    display_name: Option<String>,
    #[serde(default)]
    supported_generation_methods: Vec<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<ContentResponse>,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct ContentResponse {
    #[serde(default)]
    parts: Vec<PartResponse>,
}

#[derive(Deserialize)]
struct PartResponse {
    text: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    prompt_token_count: Option<u64>,
    candidates_token_count: Option<u64>,
}

struct Extracted {
    text: String,
    finish_reason: Option<String>,
    block_reason: Option<String>,
}

impl Extracted {
    fn empty_error(&self) -> LlmError {
        match (&self.block_reason, &self.finish_reason) {
            (Some(block), _) => {
                LlmError::Completion(format!("{PROVIDER} blocked the prompt ({block})"))
            }
            (None, Some(finish)) if finish != "STOP" => LlmError::Completion(format!(
                "{PROVIDER} returned no text (finish reason: {finish})"
            )),
            _ => LlmError::Completion(format!("{PROVIDER} returned an empty response")),
        }
    }
}

impl GenerateContentResponse {
    /// Concatenate the text parts of the first candidate.
    fn extract(&self) -> Extracted {
        let candidate = self.candidates.first();
        let text = candidate
            .and_then(|c| c.content.as_ref())
            .map(|content| {
                content
                    .parts
                    .iter()
                    .filter_map(|p| p.text.as_deref())
                    .collect::<String>()
            })
            .unwrap_or_default();

        Extracted {
            text,
            finish_reason: candidate.and_then(|c| c.finish_reason.clone()),
            block_reason: self
                .prompt_feedback
                .as_ref()
                .and_then(|f| f.block_reason.clone()),
        }
    }
}
