use retry::{RetryError, Retryable};
use thiserror::Error;

/// Error surfaced by [`embed`](fn@crate::embed) and
/// [`embed_many`](fn@crate::embed_many): a config error, an abort, or the
/// model's own error, exactly as the retry executor reported it.
pub type EmbedError = RetryError<ModelError>;

/// Failure reported by a model capability. Each variant says whether a
/// retry might help; see [`Retryable`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ModelError {
    /// The request itself is malformed; resending it cannot succeed.
    #[error("invalid embedding request: {0}")]
    InvalidRequest(String),
    #[error("too many values for one embedding call: {got} > {max}")]
    TooManyValues { max: usize, got: usize },
    /// Non-success HTTP status from a remote provider.
    #[error("HTTP error {status}: {body}")]
    Http { status: u16, body: String },
    /// Connection, timeout or other transport-level failure.
    #[error("transport failure: {0}")]
    Transport(String),
    /// The model answered, but not with what was asked for.
    #[error("invalid embedding response: {0}")]
    InvalidResponse(String),
    /// The in-flight call observed the cancellation token.
    #[error("embedding call cancelled")]
    Cancelled,
    /// Provider-specific failure with an explicit retry decision.
    #[error("provider error: {message}")]
    Provider { message: String, retryable: bool },
}

impl Retryable for ModelError {
    fn is_retryable(&self) -> bool {
        match self {
            ModelError::Http { status, .. } => is_retryable_status(*status),
            ModelError::Transport(_) => true,
            // The token is already set, so the executor reports `Aborted`.
            ModelError::Cancelled => true,
            ModelError::Provider { retryable, .. } => *retryable,
            ModelError::InvalidRequest(_)
            | ModelError::TooManyValues { .. }
            | ModelError::InvalidResponse(_) => false,
        }
    }
}

/// Statuses worth another attempt: request timeout, conflict, rate limiting
/// and every 5xx.
pub fn is_retryable_status(status: u16) -> bool {
    matches!(status, 408 | 409 | 429) || (500..=599).contains(&status)
}
