//! Shared HTTP client infrastructure for the HTTP backend
//!
//! A single `reqwest::Client` is built once per backend and reused for the
//! listing and generation calls. Each call is one attempt: rate-limit retry is
//! the job of [`crate::RetryPolicy`], and other failures are surfaced as-is.

use clausewatch_utils::error::LlmError;
use clausewatch_utils::redaction::redact_error_message;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Default maximum HTTP timeout (30 minutes)
const DEFAULT_MAX_HTTP_TIMEOUT: Duration = Duration::from_secs(1800);

/// Default connect timeout (30 seconds)
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Upstream error bodies are cut to this many characters.
const MAX_ERROR_BODY_CHARS: usize = 500;

#[derive(Clone)]
pub(crate) struct HttpClient {
    client: Arc<Client>,
    max_timeout: Duration,
}

impl HttpClient {
    /// Create a new HTTP client with default configuration
    ///
    /// # Errors
    ///
    /// Returns `LlmError::Misconfiguration` if the client cannot be constructed
    pub fn new() -> Result<Self, LlmError> {
        let client = Client::builder()
            .connect_timeout(DEFAULT_CONNECT_TIMEOUT)
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(4)
            .build()
            .map_err(|e| {
                LlmError::Misconfiguration(format!("Failed to build HTTP client: {}", e))
            })?;

        Ok(Self {
            client: Arc::new(client),
            max_timeout: DEFAULT_MAX_HTTP_TIMEOUT,
        })
    }

    pub fn get(&self, url: &str) -> RequestBuilder {
        self.client.get(url)
    }

    pub fn post(&self, url: &str) -> RequestBuilder {
        self.client.post(url)
    }

    /// Execute a single HTTP request.
    ///
    /// The per-request timeout is `min(request_timeout, max_timeout)`.
    ///
    /// # Errors
    ///
    /// - `LlmError::ProviderAuth` for 401/403 or a rejected API key
    /// - `LlmError::ProviderQuota` for 429 / `RESOURCE_EXHAUSTED`
    /// - `LlmError::ProviderOutage` for 5xx errors
    /// - `LlmError::Completion` for any other non-success status
    /// - `LlmError::Timeout` for timeouts
    /// - `LlmError::Transport` for network errors
    pub async fn execute(
        &self,
        request_builder: RequestBuilder,
        request_timeout: Duration,
        provider_name: &str,
    ) -> Result<Response, LlmError> {
        let effective_timeout = request_timeout.min(self.max_timeout);

        let request = request_builder
            .timeout(effective_timeout)
            .build()
            .map_err(|e| LlmError::Transport(format!("Failed to build request: {}", e)))?;

        debug!(
            provider = provider_name,
            method = %request.method(),
            path = request.url().path(),
            timeout_secs = effective_timeout.as_secs(),
            "Executing HTTP request"
        );

        let response = match self.client.execute(request).await {
            Ok(response) => response,
            Err(e) if e.is_timeout() => {
                return Err(LlmError::Timeout {
                    duration: effective_timeout,
                });
            }
            Err(e) => {
                return Err(LlmError::Transport(format!(
                    "{} request failed: {}",
                    provider_name,
                    redact_error_message(&e.to_string())
                )));
            }
        };

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response
            .text()
            .await
            .unwrap_or_else(|_| String::from("<unreadable error body>"));
        Err(map_status_error(status, &body, provider_name))
    }
}

/// Map a transport error that happens while reading a response body.
pub(crate) fn map_body_error(e: &reqwest::Error, provider_name: &str) -> LlmError {
    if e.is_timeout() {
        LlmError::Transport(format!("{provider_name} response timed out mid-body"))
    } else {
        LlmError::Transport(format!(
            "{} response could not be read: {}",
            provider_name,
            redact_error_message(&e.to_string())
        ))
    }
}

#[derive(Deserialize)]
struct ErrorWrapper {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
    status: Option<String>,
}

/// Map a non-success status and its body to an `LlmError`.
///
/// The provider's `{"error": {"status", "message"}}` envelope is used for the
/// message when present.
pub(crate) fn map_status_error(status: StatusCode, body: &str, provider_name: &str) -> LlmError {
    let (status_text, detail) = match serde_json::from_str::<ErrorWrapper>(body) {
        Ok(wrapper) => (
            wrapper.error.status.unwrap_or_default(),
            wrapper
                .error
                .message
                .unwrap_or_else(|| truncate(body).to_string()),
        ),
        Err(_) => (String::new(), truncate(body).to_string()),
    };

    let message = if status_text.is_empty() {
        format!("{provider_name} returned {status}: {detail}")
    } else {
        format!("{provider_name} returned {status} {status_text}: {detail}")
    };
    let message = redact_error_message(&message);

    let rejected_key = status == StatusCode::BAD_REQUEST
        && (body.contains("API_KEY_INVALID") || detail.to_lowercase().contains("api key"));

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => LlmError::ProviderAuth(message),
        _ if rejected_key => LlmError::ProviderAuth(message),
        StatusCode::TOO_MANY_REQUESTS => LlmError::ProviderQuota(message),
        _ if status_text == "RESOURCE_EXHAUSTED" => LlmError::ProviderQuota(message),
        s if s.is_server_error() => LlmError::ProviderOutage(message),
        _ => LlmError::Completion(message),
    }
}

fn truncate(body: &str) -> &str {
    match body.char_indices().nth(MAX_ERROR_BODY_CHARS) {
        Some((idx, _)) => &body[..idx],
        None => body,
    }
}
