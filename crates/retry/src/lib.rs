//! Bounded retry with exponential backoff.
//!
//! [`RetryExecutor`] wraps any zero-argument async operation and re-runs it
//! while its error says another attempt might help. It knows nothing about
//! what the operation does; the only coupling is the [`Retryable`] trait on
//! the error type.
//!
//! Decision order after a failed attempt:
//!
//! 1. non-retryable error: surface it now, whatever budget is left
//! 2. cancellation token fired: surface [`RetryError::Aborted`]
//! 3. retry budget spent: surface the *last* error (earlier ones are dropped)
//! 4. otherwise wait `base_delay * multiplier^(n-1)` (capped) and go again
//!
//! The backoff wait races the cancellation token, so cancelling never has to
//! sit out a long sleep.
//!
//! ```
//! use retry::{CancellationToken, RetryConfig, RetryError, RetryExecutor, Retryable};
//!
//! #[derive(Debug)]
//! struct Rejected;
//!
//! impl std::fmt::Display for Rejected {
//!     fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
//!         f.write_str("rejected")
//!     }
//! }
//!
//! impl Retryable for Rejected {
//!     fn is_retryable(&self) -> bool {
//!         false
//!     }
//! }
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let executor = RetryExecutor::new(RetryConfig::default().with_max_retries(5))
//!     .unwrap()
//!     .with_cancellation(Some(CancellationToken::new()));
//!
//! let result = executor.execute(|| async { Err::<(), _>(Rejected) }).await;
//! assert!(matches!(result, Err(RetryError::Operation(Rejected))));
//! # }
//! ```

mod cancel;
mod config;
mod error;
mod executor;
mod serde_millis;
mod sleep;

pub use crate::cancel::CancellationToken;
pub use crate::config::{parse_max_retries, RetryConfig, RetryConfigError};
pub use crate::error::{RetryError, Retryable};
pub use crate::executor::{execute_with_retry, RetryExecutor, RetryReport};
pub use crate::sleep::{Sleep, TokioSleep};
