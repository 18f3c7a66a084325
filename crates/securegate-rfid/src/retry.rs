//! Bounded retry.
//!
//! [`retry`] runs an [`Attempt`] until its outcome is no longer retryable or
//! the attempt budget is spent. Outcomes are plain values: the caller decides
//! through the predicate what counts as "try again", so the same primitive
//! serves `Option`, `Result` and domain enums.

use std::time::Duration;

/// Attempt budget and spacing for [`retry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    delay: Duration,
}

impl RetryPolicy {
    /// Policy with `max_attempts` attempts (at least one) and no delay.
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay: Duration::ZERO,
        }
    }

    /// Wait `delay` between attempts.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }
}

/// An operation that can be run more than once.
#[allow(async_fn_in_trait)]
pub trait Attempt {
    type Output;

    /// Run attempt number `attempt` (1-based).
    async fn run(&mut self, attempt: u32) -> Self::Output;
}

/// Result of a [`retry`] run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryOutcome<T> {
    /// Outcome of the last attempt made.
    pub value: T,

    /// Number of attempts made (1-based).
    pub attempts: u32,

    /// The last outcome was still retryable when the budget ran out.
    pub exhausted: bool,
}

/// Run `op` until `is_retryable` rejects its outcome or the budget is spent.
///
/// # Examples
///
/// ```
/// use securegate_rfid::retry::{Attempt, RetryPolicy, retry};
///
/// struct Flaky;
///
/// impl Attempt for Flaky {
///     type Output = Option<u32>;
///
///     async fn run(&mut self, attempt: u32) -> Option<u32> {
///         (attempt == 2).then_some(attempt)
///     }
/// }
///
/// #[tokio::main]
/// async fn main() {
///     let outcome = retry(RetryPolicy::new(3), Option::is_none, &mut Flaky).await;
///
///     assert_eq!(outcome.value, Some(2));
///     assert_eq!(outcome.attempts, 2);
///     assert!(!outcome.exhausted);
/// }
/// ```
pub async fn retry<A, P>(
    policy: RetryPolicy,
    is_retryable: P,
    op: &mut A,
) -> RetryOutcome<A::Output>
where
    A: Attempt,
    P: Fn(&A::Output) -> bool,
{
    let mut attempt = 1;
    loop {
        let value = op.run(attempt).await;

        if !is_retryable(&value) {
            return RetryOutcome {
                value,
                attempts: attempt,
                exhausted: false,
            };
        }
        if attempt >= policy.max_attempts {
            return RetryOutcome {
                value,
                attempts: attempt,
                exhausted: true,
            };
        }

        if !policy.delay.is_zero() {
            tokio::time::sleep(policy.delay).await;
        }
        attempt += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    /// Plays back a fixed list of outcomes and records the attempt numbers.
    struct Scripted<T> {
        outcomes: VecDeque<T>,
        calls: Vec<u32>,
    }

    impl<T> Scripted<T> {
        fn new(outcomes: impl IntoIterator<Item = T>) -> Self {
            Self {
                outcomes: outcomes.into_iter().collect(),
                calls: Vec::new(),
            }
        }
    }

    impl<T: Clone> Attempt for Scripted<T> {
        type Output = T;

        async fn run(&mut self, attempt: u32) -> T {
            self.calls.push(attempt);
            if self.outcomes.len() > 1 {
                self.outcomes.pop_front().unwrap()
            } else {
                self.outcomes[0].clone()
            }
        }
    }

    #[test]
    fn test_policy_clamps_to_one_attempt() {
        assert_eq!(RetryPolicy::new(0).max_attempts(), 1);
        assert_eq!(RetryPolicy::new(5).max_attempts(), 5);
        assert_eq!(RetryPolicy::new(3).delay(), Duration::ZERO);
    }

    #[tokio::test]
    async fn test_retry_succeeds_on_third_attempt() {
        let mut op = Scripted::new([None, None, Some("BADGE"), Some("EXTRA")]);
        let outcome = retry(RetryPolicy::new(3), Option::is_none, &mut op).await;

        assert_eq!(outcome.value, Some("BADGE"));
        assert_eq!(outcome.attempts, 3);
        assert!(!outcome.exhausted);
        assert_eq!(op.calls, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_retry_exhausts_budget() {
        let mut op = Scripted::new([Err::<(), _>("auth failed")]);
        let outcome = retry(RetryPolicy::new(3), Result::is_err, &mut op).await;

        assert_eq!(op.calls.len(), 3);
        assert_eq!(outcome.attempts, 3);
        assert!(outcome.exhausted);
        assert_eq!(outcome.value, Err("auth failed"));
    }

    #[tokio::test]
    async fn test_retry_first_attempt_final() {
        let mut op = Scripted::new([7u8]);
        let outcome = retry(RetryPolicy::new(3), |_: &u8| false, &mut op).await;

        assert_eq!(outcome.value, 7);
        assert_eq!(outcome.attempts, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_waits_between_attempts() {
        let start = tokio::time::Instant::now();
        let mut op = Scripted::new([false]);
        let outcome = retry(
            RetryPolicy::new(3).with_delay(Duration::from_millis(50)),
            |value: &bool| !value,
            &mut op,
        )
        .await;

        assert!(outcome.exhausted);
        assert_eq!(start.elapsed(), Duration::from_millis(100));
    }
}
