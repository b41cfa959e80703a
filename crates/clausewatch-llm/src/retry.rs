//! Bounded retry for rate-limited calls
//!
//! [`RetryPolicy`] owns the attempt limit, the fixed cooldown and the
//! predicate deciding which errors are worth another attempt. The cooldown is a
//! timer raced against a [`CancellationToken`], so an interrupted wait reports
//! [`LlmError::Cancelled`] instead of sleeping out the full interval.
//!
//! [`RetryingBackend`] applies a policy to any [`LlmBackend`] the same way the
//! budget wrapper does: it owns the inner backend and forwards the trait.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use clausewatch_config::Config;
use clausewatch_utils::error::LlmError;
use clausewatch_utils::redaction::redact_error_message;
use futures::StreamExt;
use futures::stream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::types::{FragmentStream, LlmBackend, LlmInvocation, LlmResult, ModelInfo};

/// Receives a callback before every cooldown wait.
pub trait RetryObserver: Send + Sync {
    /// `attempt` is the attempt that just failed (1-based).
    fn on_cooldown(&self, attempt: u32, max_attempts: u32, cooldown: Duration, error: &LlmError);
}

/// Observer that ignores every notification.
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentObserver;

impl RetryObserver for SilentObserver {
    fn on_cooldown(&self, _: u32, _: u32, _: Duration, _: &LlmError) {}
}

#[derive(Clone)]
pub struct RetryPolicy {
    max_attempts: u32,
    cooldown: Duration,
    retryable: fn(&LlmError) -> bool,
}

impl std::fmt::Debug for RetryPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("max_attempts", &self.max_attempts)
            .field("cooldown", &self.cooldown)
            .finish_non_exhaustive()
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(
            clausewatch_config::DEFAULT_MAX_ATTEMPTS,
            Duration::from_secs(clausewatch_config::DEFAULT_COOLDOWN_SECS),
        )
    }
}

impl RetryPolicy {
    /// Policy retrying rate-limit failures. `max_attempts` counts the first
    /// attempt and is raised to at least 1.
    #[must_use]
    pub fn new(max_attempts: u32, cooldown: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            cooldown,
            retryable: LlmError::is_rate_limited,
        }
    }

    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.max_attempts(), config.cooldown())
    }

    /// Replace the retryable-error predicate.
    #[must_use]
    pub fn with_predicate(mut self, retryable: fn(&LlmError) -> bool) -> Self {
        self.retryable = retryable;
        self
    }

    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    #[must_use]
    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }

    /// Run `op` until it succeeds, fails with a non-retryable error, or the
    /// attempt limit is reached. `op` receives the 1-based attempt number.
    ///
    /// # Errors
    ///
    /// - the first non-retryable error, unchanged
    /// - `LlmError::RetryExhausted` once every attempt was rate limited
    /// - `LlmError::Cancelled` if `cancel` fires during an attempt or a cooldown
    pub async fn run<T, F, Fut>(
        &self,
        cancel: &CancellationToken,
        observer: &dyn RetryObserver,
        mut op: F,
    ) -> Result<T, LlmError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, LlmError>>,
    {
        let mut attempt = 1;
        loop {
            if cancel.is_cancelled() {
                return Err(LlmError::Cancelled);
            }

            let outcome = tokio::select! {
                biased;
                () = cancel.cancelled() => return Err(LlmError::Cancelled),
                outcome = op(attempt) => outcome,
            };

            let err = match outcome {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };

            if !(self.retryable)(&err) {
                debug!(attempt, error = %err, "Not retrying non-retryable error");
                return Err(err);
            }

            if attempt >= self.max_attempts {
                return Err(LlmError::RetryExhausted {
                    attempts: attempt,
                    last_error: redact_error_message(&err.to_string()),
                });
            }

            warn!(
                attempt,
                max_attempts = self.max_attempts,
                cooldown_secs = self.cooldown.as_secs(),
                "Rate limited; cooling down before retry"
            );
            observer.on_cooldown(attempt, self.max_attempts, self.cooldown, &err);

            tokio::select! {
                biased;
                () = cancel.cancelled() => return Err(LlmError::Cancelled),
                () = tokio::time::sleep(self.cooldown) => {}
            }

            attempt += 1;
        }
    }
}

/// A wrapper around an `LlmBackend` that retries rate-limited invocations.
///
/// Model listing is forwarded without retry. Streaming invocations are retried
/// until the first fragment arrives; after that, errors are delivered in the
/// stream like any other.
pub struct RetryingBackend {
    inner: Arc<dyn LlmBackend>,
    policy: RetryPolicy,
    cancel: CancellationToken,
    observer: Arc<dyn RetryObserver>,
}

impl RetryingBackend {
    pub fn new(
        inner: Arc<dyn LlmBackend>,
        policy: RetryPolicy,
        cancel: CancellationToken,
        observer: Arc<dyn RetryObserver>,
    ) -> Self {
        debug!(
            max_attempts = policy.max_attempts(),
            cooldown_secs = policy.cooldown().as_secs(),
            "Creating RetryingBackend"
        );
        Self {
            inner,
            policy,
            cancel,
            observer,
        }
    }

    #[must_use]
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }
}

#[async_trait]
impl LlmBackend for RetryingBackend {
    fn provider_name(&self) -> &'static str {
        self.inner.provider_name()
    }

    async fn list_models(&self) -> Result<Vec<ModelInfo>, LlmError> {
        self.inner.list_models().await
    }

    async fn invoke(&self, inv: LlmInvocation) -> Result<LlmResult, LlmError> {
        let inner = &self.inner;
        self.policy
            .run(&self.cancel, self.observer.as_ref(), |attempt| {
                debug!(attempt, model = %inv.model, "invoke attempt");
                inner.invoke(inv.clone())
            })
            .await
    }

    async fn invoke_stream(&self, inv: LlmInvocation) -> Result<FragmentStream, LlmError> {
        let inner = &self.inner;
        self.policy
            .run(&self.cancel, self.observer.as_ref(), |attempt| {
                let inv = inv.clone();
                async move {
                    debug!(attempt, model = %inv.model, "stream attempt");
                    let mut fragments = inner.invoke_stream(inv).await?;
                    match fragments.next().await {
                        Some(Ok(first)) => Ok(stream::once(async move { Ok(first) })
                            .chain(fragments)
                            .boxed()),
                        Some(Err(err)) => Err(err),
                        None => Err(LlmError::Completion(
                            "stream ended without any text".to_string(),
                        )),
                    }
                }
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Message;
    use futures::TryStreamExt;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[derive(Default)]
    struct RecordingObserver {
        cooldowns: Mutex<Vec<(u32, u32)>>,
    }

    impl RetryObserver for RecordingObserver {
        fn on_cooldown(&self, attempt: u32, max: u32, _: Duration, _: &LlmError) {
            self.cooldowns.lock().unwrap().push((attempt, max));
        }
    }

    fn quota() -> LlmError {
        LlmError::ProviderQuota("429 Resource has been exhausted".to_string())
    }

    #[tokio::test(start_paused = true)]
    async fn test_two_rate_limits_then_success() {
        let policy = RetryPolicy::new(3, Duration::from_secs(60));
        let observer = RecordingObserver::default();
        let calls = AtomicU32::new(0);
        let started = tokio::time::Instant::now();

        let result = policy
            .run(&CancellationToken::new(), &observer, |_| {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move { if n < 2 { Err(quota()) } else { Ok("done") } }
            })
            .await;

        assert_eq!(result.unwrap(), "done");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(*observer.cooldowns.lock().unwrap(), vec![(1, 3), (2, 3)]);
        assert!(started.elapsed() >= Duration::from_secs(120));
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_after_max_attempts() {
        let policy = RetryPolicy::new(3, Duration::from_secs(60));
        let observer = RecordingObserver::default();
        let calls = AtomicU32::new(0);

        let err = policy
            .run(&CancellationToken::new(), &observer, |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err::<(), _>(quota()) }
            })
            .await
            .unwrap_err();

        assert!(matches!(err, LlmError::RetryExhausted { attempts: 3, .. }));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(observer.cooldowns.lock().unwrap().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_rate_limit_error_not_retried() {
        let policy = RetryPolicy::new(3, Duration::from_secs(60));
        let calls = AtomicU32::new(0);

        let err = policy
            .run(&CancellationToken::new(), &SilentObserver, |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err::<(), _>(LlmError::Completion("invalid argument".into())) }
            })
            .await
            .unwrap_err();

        assert_eq!(err, LlmError::Completion("invalid argument".into()));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limit_detected_in_message() {
        let policy = RetryPolicy::new(2, Duration::from_secs(1));
        let calls = AtomicU32::new(0);

        let result = policy
            .run(&CancellationToken::new(), &SilentObserver, |_| {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n == 0 {
                        Err(LlmError::Completion("429 Too Many Requests".into()))
                    } else {
                        Ok(7)
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), 7);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_during_cooldown() {
        let policy = RetryPolicy::new(3, Duration::from_secs(60));
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(5)).await;
            trigger.cancel();
        });

        let started = tokio::time::Instant::now();
        let err = policy
            .run(&cancel, &SilentObserver, |_| async { Err::<(), _>(quota()) })
            .await
            .unwrap_err();

        assert_eq!(err, LlmError::Cancelled);
        assert!(started.elapsed() < Duration::from_secs(60));
    }

    #[tokio::test]
    async fn test_custom_predicate() {
        let policy = RetryPolicy::new(2, Duration::ZERO)
            .with_predicate(|e| matches!(e, LlmError::ProviderOutage(_)));
        let calls = AtomicU32::new(0);

        let err = policy
            .run(&CancellationToken::new(), &SilentObserver, |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err::<(), _>(LlmError::ProviderOutage("503".into())) }
            })
            .await
            .unwrap_err();

        assert!(matches!(err, LlmError::RetryExhausted { attempts: 2, .. }));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_zero_attempts_raised_to_one() {
        assert_eq!(RetryPolicy::new(0, Duration::ZERO).max_attempts(), 1);
    }

    struct FlakyStream {
        failures: AtomicU32,
    }

    #[async_trait]
    impl LlmBackend for FlakyStream {
        fn provider_name(&self) -> &'static str {
            "flaky"
        }

        async fn list_models(&self) -> Result<Vec<ModelInfo>, LlmError> {
            Err(quota())
        }

        async fn invoke(&self, _inv: LlmInvocation) -> Result<LlmResult, LlmError> {
            Err(LlmError::Completion("unused".into()))
        }

        async fn invoke_stream(&self, _inv: LlmInvocation) -> Result<FragmentStream, LlmError> {
            if self.failures.load(Ordering::SeqCst) > 0 {
                self.failures.fetch_sub(1, Ordering::SeqCst);
                return Ok(stream::iter(vec![Err(quota())]).boxed());
            }
            Ok(stream::iter(vec![Ok("a".to_string()), Ok("b".to_string())]).boxed())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_stream_retried_before_first_fragment() {
        let backend = RetryingBackend::new(
            Arc::new(FlakyStream {
                failures: AtomicU32::new(1),
            }),
            RetryPolicy::new(3, Duration::from_secs(60)),
            CancellationToken::new(),
            Arc::new(SilentObserver),
        );
        let inv = LlmInvocation::new("m", Duration::from_secs(5), vec![Message::user("x")]);

        let fragments: Vec<String> = backend
            .invoke_stream(inv)
            .await
            .unwrap()
            .try_collect()
            .await
            .unwrap();
        assert_eq!(fragments, ["a", "b"]);

        // listing is not retried
        assert!(backend.list_models().await.unwrap_err().is_rate_limited());
    }
}
