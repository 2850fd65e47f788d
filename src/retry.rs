use async_trait::async_trait;
use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tracing::{error, warn};

use crate::error::{Result, SubfillError};

/// Upper bound of the random jitter added to every backoff delay.
const MAX_JITTER_SECS: u64 = 30;

/// Exponential backoff with jitter, as a pure function of the attempt
/// number: `initial * 2^attempt + uniform(0, max_jitter)`.
/// Example with 60s initial: 60s, 120s, 240s, 480s, 960s (+ jitter each).
#[derive(Debug, Clone)]
pub struct BackoffPolicy {
    pub initial: Duration,
    pub max_jitter: Duration,
}

impl BackoffPolicy {
    pub fn new(initial: Duration) -> Self {
        Self {
            initial,
            max_jitter: Duration::from_secs(MAX_JITTER_SECS),
        }
    }

    pub fn delay(&self, attempt: u32) -> Duration {
        let base = self.initial.as_secs_f64() * 2f64.powi(attempt as i32);
        let jitter = if self.max_jitter.is_zero() {
            0.0
        } else {
            rand::thread_rng().gen_range(0.0..self.max_jitter.as_secs_f64())
        };
        Duration::from_secs_f64(base + jitter)
    }
}

/// Abstraction over waiting, so retry and pacing behavior can be tested
/// without real delays.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Production sleeper backed by the tokio timer.
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Outcome of a single request attempt.
pub enum Attempt<T> {
    Success(T),
    /// Retryable: timeout, HTTP 429, HTTP 5xx
    Transient(SubfillError),
    /// Not retryable: other HTTP errors, network failures
    Fatal(SubfillError),
}

/// Drive `op` until it succeeds, fails fatally, or exhausts the retry
/// budget. Sleeps the backoff delay before every retry; a budget of zero
/// means a single attempt with no sleeping.
pub async fn run_with_retry<T, F, Fut>(
    policy: &BackoffPolicy,
    sleeper: &dyn Sleeper,
    retries: u32,
    mut op: F,
) -> Result<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Attempt<T>>,
{
    let mut attempt = 0;
    loop {
        match op(attempt).await {
            Attempt::Success(value) => return Ok(value),
            Attempt::Fatal(err) => {
                error!("API request failed: {}", err);
                return Err(err);
            }
            Attempt::Transient(err) => {
                if attempt >= retries {
                    error!("API request failed after {} attempts: {}", attempt + 1, err);
                    return Err(err);
                }
                let delay = policy.delay(attempt);
                warn!(
                    "{}. Retrying in {}s (attempt {}/{})...",
                    err,
                    delay.as_secs(),
                    attempt + 1,
                    retries
                );
                sleeper.sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

#[cfg(test)]
pub mod testing {
    use super::Sleeper;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Records requested sleep durations instead of waiting.
    #[derive(Default)]
    pub struct RecordingSleeper {
        pub slept: Mutex<Vec<Duration>>,
    }

    impl RecordingSleeper {
        pub fn sleep_count(&self) -> usize {
            self.slept.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl Sleeper for RecordingSleeper {
        async fn sleep(&self, duration: Duration) {
            self.slept.lock().unwrap().push(duration);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::RecordingSleeper;
    use super::*;
    use crate::error::SubfillError;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_backoff_delay_within_bounds() {
        let policy = BackoffPolicy::new(Duration::from_secs(60));
        for attempt in 0..5 {
            let base = 60u64 * 2u64.pow(attempt);
            let delay = policy.delay(attempt);
            assert!(
                delay >= Duration::from_secs(base),
                "attempt {}: {:?} below base {}s",
                attempt,
                delay,
                base
            );
            assert!(
                delay < Duration::from_secs(base + 30),
                "attempt {}: {:?} exceeds jitter window above {}s",
                attempt,
                delay,
                base
            );
        }
    }

    #[test]
    fn test_backoff_without_jitter_is_exact() {
        let policy = BackoffPolicy {
            initial: Duration::from_secs(10),
            max_jitter: Duration::ZERO,
        };
        assert_eq!(policy.delay(0), Duration::from_secs(10));
        assert_eq!(policy.delay(1), Duration::from_secs(20));
        assert_eq!(policy.delay(2), Duration::from_secs(40));
    }

    fn no_jitter_policy() -> BackoffPolicy {
        BackoffPolicy {
            initial: Duration::from_secs(1),
            max_jitter: Duration::ZERO,
        }
    }

    #[tokio::test]
    async fn test_zero_budget_fails_without_sleeping() {
        let sleeper = RecordingSleeper::default();
        let result: Result<()> = run_with_retry(&no_jitter_policy(), &sleeper, 0, |_| async {
            Attempt::Transient(SubfillError::Timeout("request timed out".to_string()))
        })
        .await;

        assert!(result.is_err());
        assert_eq!(sleeper.sleep_count(), 0);
    }

    #[tokio::test]
    async fn test_fatal_never_retries() {
        let sleeper = RecordingSleeper::default();
        let attempts = AtomicU32::new(0);
        let result: Result<()> = run_with_retry(&no_jitter_policy(), &sleeper, 5, |_| {
            attempts.fetch_add(1, Ordering::SeqCst);
            async { Attempt::Fatal(SubfillError::Api("HTTP 404 from wanted".to_string())) }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
        assert_eq!(sleeper.sleep_count(), 0);
    }

    #[tokio::test]
    async fn test_transient_exhausts_budget() {
        let sleeper = RecordingSleeper::default();
        let attempts = AtomicU32::new(0);
        let result: Result<()> = run_with_retry(&no_jitter_policy(), &sleeper, 3, |_| {
            attempts.fetch_add(1, Ordering::SeqCst);
            async { Attempt::Transient(SubfillError::Api("HTTP 503 from wanted".to_string())) }
        })
        .await;

        assert!(result.is_err());
        // Initial attempt plus three retries, each preceded by a sleep
        assert_eq!(attempts.load(Ordering::SeqCst), 4);
        assert_eq!(sleeper.sleep_count(), 3);
        assert_eq!(
            *sleeper.slept.lock().unwrap(),
            vec![
                Duration::from_secs(1),
                Duration::from_secs(2),
                Duration::from_secs(4)
            ]
        );
    }

    #[tokio::test]
    async fn test_succeeds_after_transient_failure() {
        let sleeper = RecordingSleeper::default();
        let result = run_with_retry(&no_jitter_policy(), &sleeper, 5, |attempt| async move {
            if attempt == 0 {
                Attempt::Transient(SubfillError::Timeout("request timed out".to_string()))
            } else {
                Attempt::Success(attempt)
            }
        })
        .await;

        assert_eq!(result.unwrap(), 1);
        assert_eq!(sleeper.sleep_count(), 1);
    }
}
