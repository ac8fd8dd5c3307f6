//! Deadline-bounded retry with exponential backoff

use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Backoff policy for repeated attempts
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Optional cap on the number of attempts; `None` means deadline-only
    #[serde(default)]
    pub max_attempts: Option<u32>,
    /// Pause after the first failed attempt (milliseconds)
    #[serde(default = "default_initial_delay_millis")]
    pub initial_delay_millis: u64,
    /// Maximum pause between attempts (milliseconds)
    #[serde(default = "default_max_delay_millis")]
    pub max_delay_millis: u64,
    /// Backoff multiplier
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,
}

fn default_initial_delay_millis() -> u64 {
    50
}

fn default_max_delay_millis() -> u64 {
    1000
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: None,
            initial_delay_millis: default_initial_delay_millis(),
            max_delay_millis: default_max_delay_millis(),
            backoff_multiplier: default_backoff_multiplier(),
        }
    }
}

impl RetryPolicy {
    /// Pause after the given failed attempt (1-indexed)
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::from_millis(0);
        }

        let delay = self.initial_delay_millis as f64
            * self.backoff_multiplier.powi(attempt.saturating_sub(1) as i32);
        let capped = delay.min(self.max_delay_millis as f64);
        Duration::from_millis(capped as u64)
    }
}

/// Why a retry loop gave up
#[derive(Debug, thiserror::Error)]
pub enum RetryError<E> {
    /// The deadline (or attempt cap) was reached with the last attempt failing
    #[error("retry exhausted after {attempts} attempts over {elapsed:?}: {last}")]
    Exhausted {
        /// Number of attempts made
        attempts: u32,
        /// Time since the loop started
        elapsed: Duration,
        /// Error from the final attempt
        last: E,
    },
    /// The deadline passed while an attempt was still running; that
    /// attempt was dropped
    #[error("deadline reached during attempt {attempts} after {elapsed:?}")]
    Interrupted {
        /// Number of attempts started, including the dropped one
        attempts: u32,
        /// Time since the loop started
        elapsed: Duration,
    },
    /// The cancellation token fired
    #[error("retry cancelled after {attempts} attempts")]
    Cancelled {
        /// Number of attempts started
        attempts: u32,
        /// Error from the last completed attempt, if any
        last: Option<E>,
    },
}

/// One unit of retryable work.
///
/// Unlike a plain closure, an attempt may hand out futures that borrow
/// its own state mutably, which is what driving an operation needs.
pub trait Attempt {
    /// Value produced on success
    type Output;
    /// Error produced by a failed attempt
    type Error: Display;

    /// Run the attempt once
    fn attempt(&mut self) -> impl Future<Output = Result<Self::Output, Self::Error>> + Send;
}

struct FnAttempt<F>(F);

impl<F, Fut, T, E> Attempt for FnAttempt<F>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>> + Send,
    E: Display,
{
    type Output = T;
    type Error = E;

    fn attempt(&mut self) -> impl Future<Output = Result<T, E>> + Send {
        (self.0)()
    }
}

/// Stand-in deadline when `start + deadline` overflows
const FAR_FUTURE: Duration = Duration::from_secs(86400 * 365 * 30);

/// Runs attempts until one succeeds or the deadline passes.
///
/// - Attempts are separated by `policy.delay_for_attempt(n)`, never before
///   the first one.
/// - At least one attempt is made, even with a zero deadline.
/// - A pause never runs past the deadline; the last attempt lands on it.
/// - An attempt still running at the deadline is dropped, so a hung call
///   cannot hold the caller past its deadline.
#[derive(Clone, Debug, Default)]
pub struct RetryExecutor {
    policy: RetryPolicy,
}

impl RetryExecutor {
    /// Create an executor for a policy
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    /// The policy in use
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Run until success or deadline
    pub async fn run<A: Attempt>(
        &self,
        deadline: Duration,
        attempt: &mut A,
    ) -> Result<A::Output, RetryError<A::Error>> {
        self.run_with_cancel(deadline, &CancellationToken::new(), attempt)
            .await
    }

    /// Run until success, deadline or cancellation
    pub async fn run_with_cancel<A: Attempt>(
        &self,
        deadline: Duration,
        cancel: &CancellationToken,
        attempt: &mut A,
    ) -> Result<A::Output, RetryError<A::Error>> {
        let start = Instant::now();
        let deadline_at = start
            .checked_add(deadline)
            .unwrap_or_else(|| start + FAR_FUTURE);
        let mut attempts: u32 = 0;

        loop {
            if cancel.is_cancelled() {
                return Err(RetryError::Cancelled { attempts, last: None });
            }
            attempts += 1;
            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    return Err(RetryError::Cancelled { attempts, last: None });
                }
                outcome = attempt.attempt() => outcome,
                _ = tokio::time::sleep_until(deadline_at) => {
                    return Err(RetryError::Interrupted {
                        attempts,
                        elapsed: start.elapsed(),
                    });
                }
            };

            let err = match outcome {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };
            tracing::debug!(attempt = attempts, error = %err, "Retry attempt failed");

            let now = Instant::now();
            let remaining = deadline_at.saturating_duration_since(now);
            let capped = self
                .policy
                .max_attempts
                .is_some_and(|max| attempts >= max);
            if remaining.is_zero() || capped {
                return Err(RetryError::Exhausted {
                    attempts,
                    elapsed: now - start,
                    last: err,
                });
            }

            let pause = self.policy.delay_for_attempt(attempts).min(remaining);
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    return Err(RetryError::Cancelled { attempts, last: Some(err) });
                }
                _ = tokio::time::sleep(pause) => {}
            }
        }
    }
}

/// Retry a closure under `policy` until it succeeds or `deadline` passes
pub async fn retry_until_deadline<F, Fut, T, E>(
    policy: &RetryPolicy,
    deadline: Duration,
    attempt: F,
) -> Result<T, RetryError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>> + Send,
    E: Display,
{
    RetryExecutor::new(policy.clone())
        .run(deadline, &mut FnAttempt(attempt))
        .await
}
