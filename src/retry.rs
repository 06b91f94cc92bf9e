//! The retrying executor and the policies that drive it.
//!
//! [`execute_with_retry`] is a pure control-flow primitive: it runs a call,
//! and on failure asks a [`RetryPolicy`] whether to go again. The policy owns
//! every decision, including when to stop; the executor has no attempt limit
//! and no opinion about which errors are transient.
//!
//! [`Backoff`] combines the classic delay schedules in [`RetryStrategy`] with
//! a [`RetryPredicate`] into a policy for the client's own [`Error`] type.

use crate::Error;
use rand::Rng;
use std::future::Future;
use std::time::{Duration, Instant};

/// What to do after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Return the error to the caller unchanged.
    GiveUp,
    /// Run the call again immediately.
    Retry,
    /// Run the call again after the delay.
    RetryAfter(Duration),
}

impl From<bool> for RetryDecision {
    fn from(retry: bool) -> Self {
        if retry {
            RetryDecision::Retry
        } else {
            RetryDecision::GiveUp
        }
    }
}

/// What a policy knows about the call so far.
#[derive(Debug, Clone)]
pub struct AttemptState {
    /// The attempt that just failed, starting from 1.
    pub attempt: usize,
    /// Time since the first attempt started.
    pub elapsed: Duration,
    /// The label the call was started with.
    pub label: String,
}

/// Decides whether a failed call is retried.
///
/// Implemented for closures of the shape
/// `Fn(&E, &AttemptState) -> RetryDecision`.
///
/// # Examples
///
/// ```
/// use wirecall::retry::{AttemptState, RetryDecision, RetryPolicy};
/// use std::time::Duration;
///
/// let three_tries = |_: &std::io::Error, state: &AttemptState| {
///     if state.attempt < 3 {
///         RetryDecision::RetryAfter(Duration::from_millis(50))
///     } else {
///         RetryDecision::GiveUp
///     }
/// };
/// # fn takes<P: RetryPolicy<std::io::Error>>(_: P) {}
/// # takes(three_tries);
/// ```
pub trait RetryPolicy<E>: Send + Sync {
    fn decide(&self, error: &E, state: &AttemptState) -> RetryDecision;
}

impl<E, F> RetryPolicy<E> for F
where
    F: Fn(&E, &AttemptState) -> RetryDecision + Send + Sync,
{
    fn decide(&self, error: &E, state: &AttemptState) -> RetryDecision {
        self(error, state)
    }
}

/// A policy that never retries.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoRetry;

impl<E> RetryPolicy<E> for NoRetry {
    fn decide(&self, _error: &E, _state: &AttemptState) -> RetryDecision {
        RetryDecision::GiveUp
    }
}

/// A policy from a boolean closure: `true` retries immediately.
pub struct RetryIf<F>(F);

/// Wraps a boolean decision function as a [`RetryPolicy`].
///
/// # Examples
///
/// ```
/// use wirecall::retry::retry_if;
///
/// // Retry exactly once.
/// let policy = retry_if(|_: &wirecall::Error, state| state.attempt == 1);
/// ```
pub fn retry_if<E, F>(f: F) -> RetryIf<F>
where
    F: Fn(&E, &AttemptState) -> bool + Send + Sync,
{
    RetryIf(f)
}

impl<E, F> RetryPolicy<E> for RetryIf<F>
where
    F: Fn(&E, &AttemptState) -> bool + Send + Sync,
{
    fn decide(&self, error: &E, state: &AttemptState) -> RetryDecision {
        (self.0)(error, state).into()
    }
}

/// Knobs for [`execute_with_retry`] that are not part of the policy.
#[derive(Debug, Clone, Default)]
pub struct RetryOptions {
    /// Upper bound on any delay a policy asks for.
    pub max_delay: Option<Duration>,
}

/// Runs `call`, consulting `policy` after every failure.
///
/// Attempts are strictly sequential. When the policy gives up, the error of
/// the last attempt is returned exactly as the call produced it.
///
/// # Examples
///
/// ```
/// use wirecall::retry::{execute_with_retry, retry_if, RetryOptions};
/// use std::sync::atomic::{AtomicUsize, Ordering};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let calls = AtomicUsize::new(0);
/// let counter = &calls;
/// let result: Result<(), String> = execute_with_retry(
///     || async move {
///         let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
///         Err(format!("attempt {n} failed"))
///     },
///     "demo",
///     &RetryOptions::default(),
///     &retry_if(|_: &String, state| state.attempt < 3),
/// )
/// .await;
///
/// assert_eq!(result.unwrap_err(), "attempt 3 failed");
/// # }
/// ```
pub async fn execute_with_retry<T, E, F, Fut, P>(
    mut call: F,
    label: &str,
    options: &RetryOptions,
    policy: &P,
) -> std::result::Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::result::Result<T, E>>,
    E: std::fmt::Display,
    P: RetryPolicy<E> + ?Sized,
{
    let start_time = Instant::now();
    let mut attempt = 0;

    loop {
        attempt += 1;

        let error = match call().await {
            Ok(value) => return Ok(value),
            Err(e) => e,
        };

        tracing::warn!(
            error = %error,
            attempt = attempt,
            label = label,
            "Attempt failed"
        );

        let state = AttemptState {
            attempt,
            elapsed: start_time.elapsed(),
            label: label.to_string(),
        };

        match policy.decide(&error, &state) {
            RetryDecision::GiveUp => return Err(error),
            RetryDecision::Retry => {
                tracing::info!(attempt = attempt, label = label, "Retrying immediately");
            }
            RetryDecision::RetryAfter(delay) => {
                let delay = options.max_delay.map_or(delay, |max| delay.min(max));
                tracing::info!(
                    delay_ms = delay.as_millis(),
                    attempt = attempt,
                    label = label,
                    "Retrying after delay"
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}

/// Delay schedules for retried requests.
///
/// # Examples
///
/// ```
/// use wirecall::RetryStrategy;
/// use std::time::Duration;
///
/// // No retries
/// let no_retry = RetryStrategy::None;
///
/// // Exponential backoff: 100ms, 200ms, 400ms, 800ms...
/// let exponential = RetryStrategy::ExponentialBackoff {
///     initial_delay: Duration::from_millis(100),
///     max_delay: Duration::from_secs(30),
///     max_retries: 5,
///     jitter: true,
/// };
///
/// // Linear backoff: 1s, 1s, 1s...
/// let linear = RetryStrategy::Linear {
///     delay: Duration::from_secs(1),
///     max_retries: 3,
/// };
/// ```
#[derive(Debug, Clone, Default)]
pub enum RetryStrategy {
    /// Do not retry failed requests.
    #[default]
    None,

    /// Retry with exponentially increasing delays.
    ///
    /// Each retry waits for `initial_delay * 2^(attempt - 1)` (capped at `max_delay`).
    /// Optional jitter adds randomness to prevent thundering herd.
    ExponentialBackoff {
        /// The initial delay before the first retry.
        initial_delay: Duration,
        /// The maximum delay between retries.
        max_delay: Duration,
        /// The maximum number of retry attempts.
        max_retries: usize,
        /// Whether to add random jitter to delays.
        jitter: bool,
    },

    /// Retry with a fixed delay between attempts.
    Linear {
        /// The delay between retry attempts.
        delay: Duration,
        /// The maximum number of retry attempts.
        max_retries: usize,
    },

    /// Custom retry logic.
    ///
    /// Takes the attempt number (1-indexed) and returns `Some(delay)` to retry
    /// after the delay, or `None` to stop.
    Custom {
        delay_fn: fn(attempt: usize) -> Option<Duration>,
    },
}

impl RetryStrategy {
    /// Returns the delay before the given retry attempt, or `None` if retries are exhausted.
    ///
    /// # Arguments
    ///
    /// * `attempt` - The retry attempt number (1-indexed, so 1 = first retry)
    pub fn delay_for_attempt(&self, attempt: usize) -> Option<Duration> {
        match self {
            RetryStrategy::None => None,
            RetryStrategy::ExponentialBackoff {
                initial_delay,
                max_delay,
                max_retries,
                jitter,
            } => {
                if attempt > *max_retries {
                    return None;
                }

                let multiplier = 2u64.saturating_pow(attempt.saturating_sub(1) as u32);
                let base_delay =
                    initial_delay.saturating_mul(multiplier.try_into().unwrap_or(u32::MAX));
                let delay = base_delay.min(*max_delay);

                if *jitter {
                    // Between 50% and 100% of the computed delay
                    let jitter_factor = rand::thread_rng().gen_range(0.5..=1.0);
                    Some(delay.mul_f64(jitter_factor))
                } else {
                    Some(delay)
                }
            }
            RetryStrategy::Linear { delay, max_retries } => {
                if attempt > *max_retries {
                    None
                } else {
                    Some(*delay)
                }
            }
            RetryStrategy::Custom { delay_fn } => delay_fn(attempt),
        }
    }
}

/// Decides whether a failed request should be retried, based on the error.
///
/// # Examples
///
/// ```
/// use wirecall::{Error, RetryPredicate};
///
/// struct RetryOnTimeoutOnly;
///
/// impl RetryPredicate for RetryOnTimeoutOnly {
///     fn should_retry(&self, error: &Error, _attempt: usize) -> bool {
///         matches!(error, Error::Timeout)
///     }
/// }
/// ```
pub trait RetryPredicate: Send + Sync {
    /// Returns `true` if the request should be retried.
    ///
    /// `attempt` is the attempt that just failed, starting from 1.
    fn should_retry(&self, error: &Error, attempt: usize) -> bool;
}

/// Retry all errors that are marked as retryable.
///
/// This uses [`Error::is_retryable()`]: network errors and timeouts.
#[derive(Debug, Clone, Copy)]
pub struct RetryOnRetryable;

impl RetryPredicate for RetryOnRetryable {
    fn should_retry(&self, error: &Error, _attempt: usize) -> bool {
        error.is_retryable()
    }
}

/// Retry only on timeout errors.
#[derive(Debug, Clone, Copy)]
pub struct RetryOnTimeout;

impl RetryPredicate for RetryOnTimeout {
    fn should_retry(&self, error: &Error, _attempt: usize) -> bool {
        matches!(error, Error::Timeout)
    }
}

/// Retry only on network/connection errors.
#[derive(Debug, Clone, Copy)]
pub struct RetryOnConnectionError;

impl RetryPredicate for RetryOnConnectionError {
    fn should_retry(&self, error: &Error, _attempt: usize) -> bool {
        matches!(error, Error::Network(_))
    }
}

/// Combine multiple retry predicates with OR logic.
///
/// Retries if ANY of the predicates return `true`.
pub struct OrPredicate {
    predicates: Vec<Box<dyn RetryPredicate>>,
}

impl OrPredicate {
    pub fn new(predicates: Vec<Box<dyn RetryPredicate>>) -> Self {
        Self { predicates }
    }
}

impl RetryPredicate for OrPredicate {
    fn should_retry(&self, error: &Error, attempt: usize) -> bool {
        self.predicates
            .iter()
            .any(|p| p.should_retry(error, attempt))
    }
}

/// Combine multiple retry predicates with AND logic.
///
/// Retries only if ALL of the predicates return `true`.
pub struct AndPredicate {
    predicates: Vec<Box<dyn RetryPredicate>>,
}

impl AndPredicate {
    pub fn new(predicates: Vec<Box<dyn RetryPredicate>>) -> Self {
        Self { predicates }
    }
}

impl RetryPredicate for AndPredicate {
    fn should_retry(&self, error: &Error, attempt: usize) -> bool {
        self.predicates
            .iter()
            .all(|p| p.should_retry(error, attempt))
    }
}

/// A [`RetryPolicy`] built from a delay schedule and a predicate.
///
/// The predicate decides whether an error is worth retrying; the strategy
/// supplies the delay and the attempt limit.
///
/// # Examples
///
/// ```
/// use wirecall::retry::{Backoff, OrPredicate, RetryOnConnectionError, RetryOnTimeout};
/// use wirecall::RetryStrategy;
/// use std::time::Duration;
///
/// let policy = Backoff::new(RetryStrategy::ExponentialBackoff {
///     initial_delay: Duration::from_millis(100),
///     max_delay: Duration::from_secs(5),
///     max_retries: 4,
///     jitter: true,
/// })
/// .with_predicate(OrPredicate::new(vec![
///     Box::new(RetryOnTimeout),
///     Box::new(RetryOnConnectionError),
/// ]));
/// ```
pub struct Backoff {
    strategy: RetryStrategy,
    predicate: Box<dyn RetryPredicate>,
}

impl Backoff {
    /// Uses `strategy` and retries whatever [`Error::is_retryable()`] accepts.
    pub fn new(strategy: RetryStrategy) -> Self {
        Self {
            strategy,
            predicate: Box::new(RetryOnRetryable),
        }
    }

    pub fn with_predicate(self, predicate: impl RetryPredicate + 'static) -> Self {
        self.with_boxed_predicate(Box::new(predicate))
    }

    pub fn with_boxed_predicate(mut self, predicate: Box<dyn RetryPredicate>) -> Self {
        self.predicate = predicate;
        self
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new(RetryStrategy::None)
    }
}

impl RetryPolicy<Error> for Backoff {
    fn decide(&self, error: &Error, state: &AttemptState) -> RetryDecision {
        if !self.predicate.should_retry(error, state.attempt) {
            return RetryDecision::GiveUp;
        }
        match self.strategy.delay_for_attempt(state.attempt) {
            Some(delay) if delay.is_zero() => RetryDecision::Retry,
            Some(delay) => RetryDecision::RetryAfter(delay),
            None => RetryDecision::GiveUp,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn state(attempt: usize) -> AttemptState {
        AttemptState {
            attempt,
            elapsed: Duration::ZERO,
            label: "test".to_string(),
        }
    }

    #[test]
    fn test_exponential_backoff_delays() {
        let strategy = RetryStrategy::ExponentialBackoff {
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(10),
            max_retries: 5,
            jitter: false,
        };

        assert_eq!(strategy.delay_for_attempt(1), Some(Duration::from_millis(100)));
        assert_eq!(strategy.delay_for_attempt(2), Some(Duration::from_millis(200)));
        assert_eq!(strategy.delay_for_attempt(3), Some(Duration::from_millis(400)));
        assert_eq!(strategy.delay_for_attempt(4), Some(Duration::from_millis(800)));
        assert_eq!(strategy.delay_for_attempt(5), Some(Duration::from_millis(1600)));
        assert_eq!(strategy.delay_for_attempt(6), None);
    }

    #[test]
    fn test_linear_delays() {
        let strategy = RetryStrategy::Linear {
            delay: Duration::from_secs(1),
            max_retries: 3,
        };

        assert_eq!(strategy.delay_for_attempt(1), Some(Duration::from_secs(1)));
        assert_eq!(strategy.delay_for_attempt(3), Some(Duration::from_secs(1)));
        assert_eq!(strategy.delay_for_attempt(4), None);
    }

    #[test]
    fn test_no_retry() {
        assert_eq!(RetryStrategy::None.delay_for_attempt(1), None);
        assert_eq!(
            RetryPolicy::<Error>::decide(&NoRetry, &Error::Timeout, &state(1)),
            RetryDecision::GiveUp
        );
    }

    #[test]
    fn test_backoff_policy() {
        let policy = Backoff::new(RetryStrategy::Linear {
            delay: Duration::from_millis(10),
            max_retries: 2,
        });

        assert_eq!(
            policy.decide(&Error::Timeout, &state(1)),
            RetryDecision::RetryAfter(Duration::from_millis(10))
        );
        assert_eq!(policy.decide(&Error::Timeout, &state(3)), RetryDecision::GiveUp);
        assert_eq!(policy.decide(&Error::Aborted, &state(1)), RetryDecision::GiveUp);
    }

    #[test]
    fn test_predicate_combinators() {
        let either = OrPredicate::new(vec![Box::new(RetryOnTimeout), Box::new(RetryOnConnectionError)]);
        assert!(either.should_retry(&Error::Timeout, 1));
        assert!(!either.should_retry(&Error::Aborted, 1));

        let both = AndPredicate::new(vec![Box::new(RetryOnTimeout), Box::new(RetryOnRetryable)]);
        assert!(both.should_retry(&Error::Timeout, 1));
        assert!(!both.should_retry(&Error::ConfigurationError("x".into()), 1));
    }

    #[tokio::test]
    async fn test_retry_once_then_give_up() {
        let calls = AtomicUsize::new(0);
        let counter = &calls;

        let result: std::result::Result<(), String> = execute_with_retry(
            || async move {
                let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
                Err(format!("failure #{n}"))
            },
            "flaky",
            &RetryOptions::default(),
            &retry_if(|_: &String, state: &AttemptState| state.attempt == 1),
        )
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(result.unwrap_err(), "failure #2");
    }

    #[tokio::test]
    async fn test_success_after_failures() {
        let calls = AtomicUsize::new(0);
        let counter = &calls;

        let result = execute_with_retry(
            || async move {
                if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err("not yet")
                } else {
                    Ok(42)
                }
            },
            "eventually",
            &RetryOptions::default(),
            &|_: &&str, _: &AttemptState| RetryDecision::RetryAfter(Duration::from_millis(1)),
        )
        .await;

        assert_eq!(result, Ok(42));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_max_delay_caps_policy_delay() {
        let calls = AtomicUsize::new(0);
        let counter = &calls;
        let started = Instant::now();

        let _ = execute_with_retry(
            || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>("down")
            },
            "capped",
            &RetryOptions {
                max_delay: Some(Duration::from_millis(5)),
            },
            &|_: &&str, state: &AttemptState| {
                if state.attempt < 2 {
                    RetryDecision::RetryAfter(Duration::from_secs(3600))
                } else {
                    RetryDecision::GiveUp
                }
            },
        )
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(started.elapsed() < Duration::from_secs(1));
    }
}
