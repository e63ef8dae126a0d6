use std::future::Future;
use std::time::Duration;

use crate::ports::destination::ServiceError;

/// How many timed out attempts a single call tolerates before giving up.
pub const MAX_REQUEST_RETRIES: u32 = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_timeout_retries: u32,
    /// Added on top of the server supplied `Retry-After`.
    pub rate_limit_margin: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_timeout_retries: MAX_REQUEST_RETRIES,
            rate_limit_margin: Duration::from_secs(1),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CallError {
    #[error("Request timed out {attempts} times in a row")]
    TimedOut { attempts: u32 },
    #[error(transparent)]
    Service(#[from] ServiceError),
}

/// Runs destination calls under a [`RetryPolicy`].
///
/// Rate limiting is retried for as long as the service keeps asking us to wait. Timeouts are
/// retried without delay up to `max_timeout_retries` times. Everything else is returned as is.
#[derive(Debug, Clone, Default)]
pub struct RetryingCaller {
    policy: RetryPolicy,
}

impl RetryingCaller {
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    pub async fn call<T, F, Fut>(&self, what: &str, mut operation: F) -> Result<T, CallError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ServiceError>>,
    {
        let mut timeouts = 0;

        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(ServiceError::RateLimited { retry_after_secs }) => {
                    let delay =
                        Duration::from_secs(retry_after_secs) + self.policy.rate_limit_margin;
                    log::warn!(
                        "{}: rate limited, waiting {}s before retrying",
                        what,
                        delay.as_secs()
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(ServiceError::Timeout) => {
                    timeouts += 1;
                    if timeouts > self.policy.max_timeout_retries {
                        log::error!("{}: max retries reached", what);
                        return Err(CallError::TimedOut { attempts: timeouts });
                    }
                    log::info!("{}: read timed out, retrying #{}...", what, timeouts);
                }
                Err(error) => return Err(error.into()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::{Cell, RefCell};
    use std::collections::VecDeque;

    use tokio::time::Instant;

    use super::*;

    /// Fails with the queued errors in order, then succeeds with the number of attempts made.
    struct Script {
        errors: RefCell<VecDeque<ServiceError>>,
        attempts: Cell<usize>,
    }

    impl Script {
        fn new(errors: Vec<ServiceError>) -> Self {
            Self {
                errors: RefCell::new(errors.into()),
                attempts: Cell::new(0),
            }
        }

        fn step(&self) -> impl Future<Output = Result<usize, ServiceError>> + use<> {
            self.attempts.set(self.attempts.get() + 1);
            let outcome = match self.errors.borrow_mut().pop_front() {
                Some(error) => Err(error),
                None => Ok(self.attempts.get()),
            };
            async move { outcome }
        }
    }

    fn timeouts(count: usize) -> Vec<ServiceError> {
        (0..count).map(|_| ServiceError::Timeout).collect()
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limit_sleeps_retry_after_plus_one_second() {
        let caller = RetryingCaller::default();
        let script = Script::new(vec![ServiceError::RateLimited {
            retry_after_secs: 3,
        }]);

        let start = Instant::now();
        let result = caller.call("test", || script.step()).await.unwrap();

        assert_eq!(result, 2);
        assert_eq!(start.elapsed(), Duration::from_secs(4));
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limit_is_retried_indefinitely() {
        let caller = RetryingCaller::default();
        let script = Script::new(
            (0..10)
                .map(|_| ServiceError::RateLimited {
                    retry_after_secs: 3,
                })
                .collect(),
        );

        let start = Instant::now();
        let result = caller.call("test", || script.step()).await.unwrap();

        assert_eq!(result, 11);
        assert_eq!(start.elapsed(), Duration::from_secs(40));
    }

    #[tokio::test(start_paused = true)]
    async fn test_five_timeouts_then_success() {
        let caller = RetryingCaller::default();
        let script = Script::new(timeouts(5));

        let start = Instant::now();
        let result = caller.call("test", || script.step()).await.unwrap();

        assert_eq!(result, 6);
        // timeouts are retried straight away
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test]
    async fn test_six_timeouts_is_fatal() {
        let caller = RetryingCaller::default();
        let script = Script::new(timeouts(6));

        let result = caller.call("test", || script.step()).await;

        assert!(matches!(result, Err(CallError::TimedOut { attempts: 6 })));
        assert_eq!(script.attempts.get(), 6);
    }

    #[tokio::test]
    async fn test_other_errors_are_not_retried() {
        let caller = RetryingCaller::default();
        let script = Script::new(vec![ServiceError::Api {
            status: 400,
            message: "bad request".into(),
        }]);

        let result = caller.call("test", || script.step()).await;

        assert!(matches!(
            result,
            Err(CallError::Service(ServiceError::Api { status: 400, .. }))
        ));
        assert_eq!(script.attempts.get(), 1);
    }

    #[tokio::test]
    async fn test_custom_timeout_cap() {
        let caller = RetryingCaller::new(RetryPolicy {
            max_timeout_retries: 1,
            ..RetryPolicy::default()
        });
        let script = Script::new(timeouts(2));

        let result = caller.call("test", || script.step()).await;

        assert!(matches!(result, Err(CallError::TimedOut { attempts: 2 })));
    }
}
