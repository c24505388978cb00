use retry::{CancellationToken, RetryConfig};
use std::collections::BTreeMap;

use crate::model::CallOptions;

/// Options for [`embed`](fn@crate::embed) and [`embed_many`](fn@crate::embed_many).
///
/// # Example
/// ```
/// use embed::EmbedOptions;
/// use retry::CancellationToken;
///
/// let token = CancellationToken::new();
/// let options = EmbedOptions::default()
///     .with_max_retries(4)
///     .with_cancellation(token.clone())
///     .with_header("x-request-id", "abc-123");
///
/// assert_eq!(options.retry.max_retries, 4);
/// ```
#[derive(Debug, Clone, Default)]
pub struct EmbedOptions {
    /// Retry policy; `max_retries` defaults to 2.
    pub retry: RetryConfig,
    /// Observed before each attempt and during each backoff wait, and
    /// forwarded to the model.
    pub cancellation: Option<CancellationToken>,
    /// Forwarded to the model untouched. Only network-backed models use them.
    pub headers: Option<BTreeMap<String, String>>,
}

impl EmbedOptions {
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.retry.max_retries = max_retries;
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers
            .get_or_insert_with(BTreeMap::new)
            .insert(name.into(), value.into());
        self
    }

    pub fn with_headers(mut self, headers: BTreeMap<String, String>) -> Self {
        self.headers = Some(headers);
        self
    }

    pub(crate) fn call_options(&self) -> CallOptions {
        CallOptions {
            cancellation: self.cancellation.clone(),
            headers: self.headers.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_two_retries_without_token_or_headers() {
        let options = EmbedOptions::default();
        assert_eq!(options.retry.max_retries, 2);
        assert!(options.cancellation.is_none());
        assert!(options.headers.is_none());
    }

    #[test]
    fn headers_accumulate() {
        let options = EmbedOptions::default()
            .with_header("a", "1")
            .with_header("b", "2")
            .with_header("a", "3");
        let headers = options.headers.unwrap();
        assert_eq!(headers.len(), 2);
        assert_eq!(headers["a"], "3");
    }

    #[test]
    fn call_options_share_the_token() {
        let token = CancellationToken::new();
        let call = EmbedOptions::default()
            .with_cancellation(token.clone())
            .call_options();
        token.cancel();
        assert!(call.cancellation.unwrap().is_cancelled());
    }
}
