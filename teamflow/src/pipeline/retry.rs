//! Bounded retry with configurable backoff and jitter.
//!
//! Only transient capability failures are retried. Backoff sleeps race the
//! run's cancellation token, so a reset never waits out a full delay.

use crate::cancellation::CancellationToken;
use crate::errors::CapabilityError;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;

/// Backoff strategy for retry delays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackoffStrategy {
    /// delay = base * 2^attempt
    #[default]
    Exponential,
    /// delay = base * (attempt + 1)
    Linear,
    /// delay = base
    Constant,
}

/// Jitter strategy applied on top of the backoff delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JitterStrategy {
    /// No jitter
    None,
    /// Random from 0 to delay
    #[default]
    Full,
    /// Half fixed, half random
    Equal,
    /// min(max, random(base, previous delay * 3)), tracked per stage
    Decorrelated,
}

/// Configuration for stage retry behavior.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Maximum attempts per stage, including the first.
    pub max_attempts: u32,
    /// Base delay between attempts in milliseconds.
    pub base_delay_ms: u64,
    /// Maximum delay cap in milliseconds.
    pub max_delay_ms: u64,
    /// Backoff strategy.
    pub backoff_strategy: BackoffStrategy,
    /// Jitter strategy.
    pub jitter_strategy: JitterStrategy,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 500,
            max_delay_ms: 10_000,
            backoff_strategy: BackoffStrategy::Exponential,
            jitter_strategy: JitterStrategy::Full,
        }
    }
}

impl RetryConfig {
    /// Creates a new retry config with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A config that never retries.
    #[must_use]
    pub fn no_retry() -> Self {
        Self::default().with_max_attempts(1)
    }

    /// Sets the maximum attempts (clamped to at least one).
    #[must_use]
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    /// Sets the base delay.
    #[must_use]
    pub fn with_base_delay_ms(mut self, delay: u64) -> Self {
        self.base_delay_ms = delay;
        self
    }

    /// Sets the maximum delay.
    #[must_use]
    pub fn with_max_delay_ms(mut self, delay: u64) -> Self {
        self.max_delay_ms = delay;
        self
    }

    /// Sets the backoff strategy.
    #[must_use]
    pub fn with_backoff(mut self, strategy: BackoffStrategy) -> Self {
        self.backoff_strategy = strategy;
        self
    }

    /// Sets the jitter strategy.
    #[must_use]
    pub fn with_jitter(mut self, strategy: JitterStrategy) -> Self {
        self.jitter_strategy = strategy;
        self
    }
}

/// State tracking for one retried operation.
#[derive(Debug, Default)]
pub struct RetryState {
    /// Retries performed so far (0 before the first retry).
    pub attempt: u32,
    previous_delay: Option<u64>,
}

impl RetryState {
    /// Creates a new retry state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Calculates the delay before the next attempt.
    #[must_use]
    pub fn calculate_delay(&mut self, config: &RetryConfig) -> Duration {
        let base = config.base_delay_ms;
        let max = config.max_delay_ms;
        let attempt = self.attempt;

        let delay = match config.backoff_strategy {
            BackoffStrategy::Exponential => base.saturating_mul(2u64.saturating_pow(attempt)).min(max),
            BackoffStrategy::Linear => base.saturating_mul(u64::from(attempt) + 1).min(max),
            BackoffStrategy::Constant => base.min(max),
        };

        let jittered = match config.jitter_strategy {
            JitterStrategy::None => delay,
            JitterStrategy::Full => {
                if delay == 0 {
                    0
                } else {
                    rand::thread_rng().gen_range(0..=delay)
                }
            }
            JitterStrategy::Equal => {
                let half = delay / 2;
                if half == 0 {
                    delay
                } else {
                    half + rand::thread_rng().gen_range(0..=half)
                }
            }
            JitterStrategy::Decorrelated => {
                let prev = self.previous_delay.unwrap_or(base);
                let upper = prev.saturating_mul(3).min(max);
                if upper <= base {
                    base.min(max)
                } else {
                    rand::thread_rng().gen_range(base..=upper)
                }
            }
        };

        self.previous_delay = Some(jittered);
        Duration::from_millis(jittered)
    }

    /// Returns true if no attempts remain.
    #[must_use]
    pub fn is_exhausted(&self, config: &RetryConfig) -> bool {
        self.attempt + 1 >= config.max_attempts
    }
}

/// Outcome of a retry decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryDecision {
    /// Retry after the specified delay.
    Retry(Duration),
    /// No more attempts remain.
    GiveUp,
    /// The error is not retryable.
    NotRetryable,
}

/// Decides whether a failed attempt should be retried.
#[must_use]
pub fn should_retry(
    state: &mut RetryState,
    config: &RetryConfig,
    error: &CapabilityError,
) -> RetryDecision {
    if !error.is_transient() {
        return RetryDecision::NotRetryable;
    }
    if state.is_exhausted(config) {
        return RetryDecision::GiveUp;
    }

    let delay = state.calculate_delay(config);
    state.attempt += 1;
    RetryDecision::Retry(delay)
}

/// Result of [`with_retry`] together with the attempts it took.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryOutcome<T> {
    /// Final result.
    pub result: Result<T, CapabilityError>,
    /// Attempts made (at least one unless cancelled before starting).
    pub attempts: u32,
}

/// Runs `operation` until it succeeds, fails non-transiently, exhausts
/// `config.max_attempts`, or `cancel` fires.
///
/// The operation receives the 1-based attempt number. Cancellation is
/// checked before each attempt and raced against each backoff sleep; a
/// cancelled run yields a `Cancelled` error.
pub async fn with_retry<T, F, Fut>(
    config: &RetryConfig,
    key: &str,
    cancel: &CancellationToken,
    mut operation: F,
) -> RetryOutcome<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, CapabilityError>>,
{
    let mut state = RetryState::new();
    let mut attempts = 0;

    loop {
        if cancel.is_cancelled() {
            return RetryOutcome {
                result: Err(cancelled_error(cancel)),
                attempts,
            };
        }

        attempts += 1;
        let error = match operation(attempts).await {
            Ok(value) => {
                return RetryOutcome {
                    result: Ok(value),
                    attempts,
                }
            }
            Err(e) => e,
        };

        match should_retry(&mut state, config, &error) {
            RetryDecision::Retry(delay) => {
                tracing::debug!(
                    key,
                    attempt = attempts,
                    delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    error = %error,
                    "Retrying after transient failure"
                );
                tokio::select! {
                    () = tokio::time::sleep(delay) => {}
                    () = cancel.cancelled() => {
                        return RetryOutcome {
                            result: Err(cancelled_error(cancel)),
                            attempts,
                        };
                    }
                }
            }
            RetryDecision::GiveUp | RetryDecision::NotRetryable => {
                return RetryOutcome {
                    result: Err(error),
                    attempts,
                };
            }
        }
    }
}

fn cancelled_error(cancel: &CancellationToken) -> CapabilityError {
    CapabilityError::cancelled(cancel.reason().unwrap_or_else(|| "run cancelled".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ErrorClass;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn fast() -> RetryConfig {
        RetryConfig::new()
            .with_base_delay_ms(1)
            .with_jitter(JitterStrategy::None)
    }

    #[test]
    fn test_retry_config_default() {
        let config = RetryConfig::default();
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.backoff_strategy, BackoffStrategy::Exponential);
    }

    #[test]
    fn test_retry_config_deserializes_partial() {
        let config: RetryConfig =
            serde_json::from_str(r#"{"max_attempts": 5, "jitter_strategy": "none"}"#).unwrap();
        assert_eq!(config.max_attempts, 5);
        assert_eq!(config.jitter_strategy, JitterStrategy::None);
        assert_eq!(config.base_delay_ms, 500);
    }

    #[test]
    fn test_max_attempts_clamped() {
        assert_eq!(RetryConfig::new().with_max_attempts(0).max_attempts, 1);
    }

    #[test]
    fn test_calculate_delay_exponential_no_jitter() {
        let config = RetryConfig::new()
            .with_base_delay_ms(100)
            .with_jitter(JitterStrategy::None);
        let mut state = RetryState::new();

        let delays: Vec<_> = (0..3)
            .map(|attempt| {
                state.attempt = attempt;
                state.calculate_delay(&config)
            })
            .collect();

        assert_eq!(
            delays,
            vec![
                Duration::from_millis(100),
                Duration::from_millis(200),
                Duration::from_millis(400)
            ]
        );
    }

    #[test]
    fn test_calculate_delay_linear_and_constant() {
        let mut state = RetryState::new();
        state.attempt = 2;

        let linear = RetryConfig::new()
            .with_base_delay_ms(100)
            .with_backoff(BackoffStrategy::Linear)
            .with_jitter(JitterStrategy::None);
        assert_eq!(state.calculate_delay(&linear), Duration::from_millis(300));

        let constant = linear.with_backoff(BackoffStrategy::Constant);
        assert_eq!(state.calculate_delay(&constant), Duration::from_millis(100));
    }

    #[test]
    fn test_calculate_delay_capped_at_max() {
        let config = RetryConfig::new()
            .with_base_delay_ms(1000)
            .with_max_delay_ms(5000)
            .with_jitter(JitterStrategy::None);
        let mut state = RetryState::new();
        state.attempt = 10;
        assert_eq!(state.calculate_delay(&config), Duration::from_millis(5000));
    }

    #[test]
    fn test_full_jitter_stays_below_delay() {
        let config = RetryConfig::new()
            .with_base_delay_ms(100)
            .with_backoff(BackoffStrategy::Constant);
        let mut state = RetryState::new();
        for _ in 0..20 {
            assert!(state.calculate_delay(&config) <= Duration::from_millis(100));
        }
    }

    #[test]
    fn test_decorrelated_jitter_grows_from_previous_delay() {
        let config = RetryConfig::new()
            .with_base_delay_ms(10)
            .with_max_delay_ms(1_000)
            .with_jitter(JitterStrategy::Decorrelated);
        let mut state = RetryState::new();

        let first = state.calculate_delay(&config);
        assert!(first >= Duration::from_millis(10) && first <= Duration::from_millis(30));

        for _ in 0..10 {
            let previous = state.previous_delay.unwrap_or_default();
            let next = state.calculate_delay(&config);
            let upper = (previous * 3).clamp(10, 1_000);
            assert!(next >= Duration::from_millis(10), "{next:?}");
            assert!(next <= Duration::from_millis(upper), "{next:?} > {upper}");
        }
    }

    #[test]
    fn test_decorrelated_jitter_starts_fresh_per_state() {
        let config = RetryConfig::new()
            .with_base_delay_ms(5)
            .with_max_delay_ms(5)
            .with_jitter(JitterStrategy::Decorrelated);
        let mut first = RetryState::new();
        for _ in 0..5 {
            assert_eq!(first.calculate_delay(&config), Duration::from_millis(5));
        }
        assert!(RetryState::new().previous_delay.is_none());
    }

    #[test]
    fn test_should_retry_classifies_errors() {
        let config = fast();
        let mut state = RetryState::new();

        assert_eq!(
            should_retry(&mut state, &config, &CapabilityError::permanent("bad")),
            RetryDecision::NotRetryable
        );
        assert!(matches!(
            should_retry(&mut state, &config, &CapabilityError::transient("503")),
            RetryDecision::Retry(_)
        ));
        assert!(matches!(
            should_retry(&mut state, &config, &CapabilityError::transient("503")),
            RetryDecision::Retry(_)
        ));
        assert_eq!(
            should_retry(&mut state, &config, &CapabilityError::transient("503")),
            RetryDecision::GiveUp
        );
    }

    #[tokio::test]
    async fn test_with_retry_success_first_try() {
        let token = CancellationToken::new();
        let outcome = with_retry(&fast(), "stage", &token, |_| async { Ok(42) }).await;
        assert_eq!(outcome.result, Ok(42));
        assert_eq!(outcome.attempts, 1);
    }

    #[tokio::test]
    async fn test_with_retry_recovers_from_transient_failures() {
        let token = CancellationToken::new();
        let outcome = with_retry(&fast().with_max_attempts(5), "stage", &token, |attempt| async move {
            if attempt < 3 {
                Err(CapabilityError::transient(format!("attempt {attempt}")))
            } else {
                Ok(attempt)
            }
        })
        .await;

        assert_eq!(outcome.result, Ok(3));
        assert_eq!(outcome.attempts, 3);
    }

    #[tokio::test]
    async fn test_with_retry_stops_at_max_attempts() {
        let token = CancellationToken::new();
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();

        let outcome: RetryOutcome<()> = with_retry(&fast(), "stage", &token, |_| {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(CapabilityError::transient("always"))
            }
        })
        .await;

        assert_eq!(outcome.attempts, 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(outcome.result.unwrap_err().class, ErrorClass::Transient);
    }

    #[tokio::test]
    async fn test_with_retry_does_not_retry_permanent() {
        let token = CancellationToken::new();
        let outcome: RetryOutcome<()> = with_retry(&fast(), "stage", &token, |_| async {
            Err(CapabilityError::permanent("invalid"))
        })
        .await;

        assert_eq!(outcome.attempts, 1);
        assert_eq!(outcome.result.unwrap_err().class, ErrorClass::Permanent);
    }

    #[tokio::test]
    async fn test_with_retry_cancelled_before_start() {
        let token = CancellationToken::new();
        token.cancel("project reset");
        let outcome: RetryOutcome<()> = with_retry(&fast(), "stage", &token, |_| async { Ok(()) }).await;

        assert_eq!(outcome.attempts, 0);
        let err = outcome.result.unwrap_err();
        assert_eq!(err.class, ErrorClass::Cancelled);
        assert_eq!(err.message, "project reset");
    }

    #[tokio::test]
    async fn test_with_retry_cancel_interrupts_backoff() {
        let token = Arc::new(CancellationToken::new());
        let config = RetryConfig::new()
            .with_base_delay_ms(60_000)
            .with_max_delay_ms(60_000)
            .with_jitter(JitterStrategy::None);

        let canceller = {
            let token = token.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(20)).await;
                token.cancel("reset");
            })
        };

        let outcome: RetryOutcome<()> = tokio::time::timeout(
            Duration::from_secs(5),
            with_retry(&config, "stage", &token, |_| async {
                Err(CapabilityError::transient("flaky"))
            }),
        )
        .await
        .unwrap();

        canceller.await.unwrap();
        assert_eq!(outcome.attempts, 1);
        assert_eq!(outcome.result.unwrap_err().class, ErrorClass::Cancelled);
    }
}
