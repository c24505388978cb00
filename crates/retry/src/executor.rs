use std::fmt;
use std::future::Future;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::cancel::CancellationToken;
use crate::config::{RetryConfig, RetryConfigError};
use crate::error::{RetryError, Retryable};
use crate::sleep::{Sleep, TokioSleep};

/// Outcome of [`RetryExecutor::execute_with_report`].
#[derive(Debug)]
pub struct RetryReport<T, E>
where
    E: fmt::Debug + fmt::Display,
{
    /// The value, or the terminal error.
    pub result: Result<T, RetryError<E>>,
    /// Number of times the operation was invoked (1 = first try decided it).
    pub attempts: u32,
    /// Wall time spent on attempts and waits.
    pub total_duration: Duration,
}

impl<T, E> RetryReport<T, E>
where
    E: fmt::Debug + fmt::Display,
{
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }

    pub fn into_result(self) -> Result<T, RetryError<E>> {
        self.result
    }
}

/// Runs a fallible async operation with bounded exponential-backoff retry.
///
/// Attempts are strictly sequential. The executor holds no per-call state,
/// so one instance can serve any number of concurrent `execute` calls.
///
/// # Example
/// ```
/// use retry::{RetryConfig, RetryExecutor, Retryable};
/// use std::time::Duration;
///
/// #[derive(Debug)]
/// struct Flaky;
///
/// impl std::fmt::Display for Flaky {
///     fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
///         f.write_str("flaky")
///     }
/// }
///
/// impl Retryable for Flaky {
///     fn is_retryable(&self) -> bool {
///         true
///     }
/// }
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let executor = RetryExecutor::new(
///     RetryConfig::default().with_base_delay(Duration::from_millis(1)),
/// )
/// .unwrap();
///
/// let mut calls = 0;
/// let value = executor
///     .execute(|| {
///         calls += 1;
///         let fail = calls < 2;
///         async move { if fail { Err(Flaky) } else { Ok("done") } }
///     })
///     .await
///     .unwrap();
///
/// assert_eq!(value, "done");
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct RetryExecutor<S = TokioSleep> {
    config: RetryConfig,
    cancellation: Option<CancellationToken>,
    sleeper: S,
}

impl RetryExecutor<TokioSleep> {
    /// Validate `config` and build an executor that waits on the tokio timer.
    pub fn new(config: RetryConfig) -> Result<Self, RetryConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            cancellation: None,
            sleeper: TokioSleep,
        })
    }
}

impl<S> RetryExecutor<S>
where
    S: Sleep,
{
    /// Observe `token` before every attempt and during every backoff wait.
    pub fn with_cancellation(mut self, token: Option<CancellationToken>) -> Self {
        self.cancellation = token;
        self
    }

    /// Replace the wait implementation.
    pub fn with_sleeper<T: Sleep>(self, sleeper: T) -> RetryExecutor<T> {
        RetryExecutor {
            config: self.config,
            cancellation: self.cancellation,
            sleeper,
        }
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Run `operation` until it succeeds, fails with a non-retryable error,
    /// runs out of retries, or is cancelled.
    pub async fn execute<T, E, F, Fut>(&self, operation: F) -> Result<T, RetryError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Retryable + fmt::Debug + fmt::Display,
    {
        self.execute_with_report(operation).await.into_result()
    }

    /// Same as [`execute`](Self::execute), also reporting attempt count and
    /// elapsed time.
    pub async fn execute_with_report<T, E, F, Fut>(&self, mut operation: F) -> RetryReport<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Retryable + fmt::Debug + fmt::Display,
    {
        let start = Instant::now();
        let mut attempts = 0u32;
        let mut retries = 0u32;

        let result = loop {
            if self.is_cancelled() {
                info!(attempts, "retry_aborted");
                break Err(RetryError::Aborted);
            }

            attempts += 1;
            let error = match operation().await {
                Ok(value) => break Ok(value),
                Err(error) => error,
            };

            if !error.is_retryable() {
                warn!(attempts, error = %error, "retry_not_retryable");
                break Err(RetryError::Operation(error));
            }

            if self.is_cancelled() {
                info!(attempts, error = %error, "retry_aborted");
                break Err(RetryError::Aborted);
            }

            // Only the most recent failure is surfaced.
            if retries >= self.config.max_retries {
                warn!(attempts, error = %error, "retry_exhausted");
                break Err(RetryError::Operation(error));
            }

            retries += 1;
            let delay = self.config.delay_for(retries);
            debug!(
                retry = retries,
                delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                error = %error,
                "retry_scheduled"
            );

            if !self.wait(delay).await {
                info!(attempts, "retry_aborted");
                break Err(RetryError::Aborted);
            }
        };

        RetryReport {
            result,
            attempts,
            total_duration: start.elapsed(),
        }
    }

    fn is_cancelled(&self) -> bool {
        self.cancellation
            .as_ref()
            .is_some_and(CancellationToken::is_cancelled)
    }

    /// Returns `false` when the wait was cut short by cancellation.
    async fn wait(&self, delay: Duration) -> bool {
        match &self.cancellation {
            None => {
                self.sleeper.sleep(delay).await;
                true
            }
            Some(token) => {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => false,
                    _ = self.sleeper.sleep(delay) => true,
                }
            }
        }
    }
}

/// Validate `config` and run `operation` on a one-off executor.
pub async fn execute_with_retry<T, E, F, Fut>(
    config: &RetryConfig,
    operation: F,
) -> Result<T, RetryError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Retryable + fmt::Debug + fmt::Display,
{
    RetryExecutor::new(*config)?.execute(operation).await
}
