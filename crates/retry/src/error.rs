use std::fmt;
use thiserror::Error;

use crate::config::RetryConfigError;

/// Classification attached to an error value: may another attempt succeed?
///
/// The executor never inspects error types or messages; it asks the error.
pub trait Retryable {
    fn is_retryable(&self) -> bool;
}

/// Terminal failure of [`RetryExecutor::execute`](crate::RetryExecutor::execute).
#[derive(Debug, Error)]
pub enum RetryError<E>
where
    E: fmt::Debug + fmt::Display,
{
    /// The retry policy was rejected before any attempt ran.
    #[error("invalid retry config: {0}")]
    InvalidConfig(#[from] RetryConfigError),
    /// The operation failed with a non-retryable error, or this is the last
    /// error seen once the retry budget ran out.
    #[error("{0}")]
    Operation(E),
    /// The cancellation token fired before an attempt or during a backoff wait.
    #[error("operation aborted")]
    Aborted,
}

impl<E> RetryError<E>
where
    E: fmt::Debug + fmt::Display,
{
    pub fn is_aborted(&self) -> bool {
        matches!(self, RetryError::Aborted)
    }

    pub fn is_invalid_config(&self) -> bool {
        matches!(self, RetryError::InvalidConfig(_))
    }

    /// The operation's own error, when this failure carries one.
    pub fn operation_error(&self) -> Option<&E> {
        match self {
            RetryError::Operation(err) => Some(err),
            _ => None,
        }
    }

    pub fn into_operation_error(self) -> Option<E> {
        match self {
            RetryError::Operation(err) => Some(err),
            _ => None,
        }
    }
}

impl<E> Clone for RetryError<E>
where
    E: fmt::Debug + fmt::Display + Clone,
{
    fn clone(&self) -> Self {
        match self {
            RetryError::InvalidConfig(err) => RetryError::InvalidConfig(err.clone()),
            RetryError::Operation(err) => RetryError::Operation(err.clone()),
            RetryError::Aborted => RetryError::Aborted,
        }
    }
}
