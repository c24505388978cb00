//! Embedding orchestration with bounded retry.
//!
//! This crate turns "embed this value" into a call against a pluggable
//! [`EmbeddingModel`], retried under the policy from [`EmbedOptions`] and
//! observing an optional [`CancellationToken`]. The model only has to know
//! how to embed a batch; everything around the call lives here:
//!
//! - [`embed`](fn@embed) sends a single value as a one-element batch and
//!   packages the first embedding together with usage and response metadata.
//! - [`embed_many`](fn@embed_many) splits a list by the model's per-call
//!   limit and runs the batches in order, summing usage along the way.
//!
//! Failures come back as [`EmbedError`], which is the retry crate's error
//! carrying a [`ModelError`]. Whether a model error is worth another attempt
//! is decided by the error itself (HTTP 408/409/429/5xx and transport
//! failures are, malformed requests are not).
//!
//! A model that does not report usage yields [`TokenCount::NotReported`],
//! which reads as `NaN` through [`TokenCount::as_f64`].
//!
//! ```
//! use embed::{embed_many, EmbedOptions, StubEmbeddingModel};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let model = StubEmbeddingModel::new("stub").with_max_embeddings_per_call(Some(2));
//! let result = embed_many(&model, vec!["a", "b c", "d"], &EmbedOptions::default())
//!     .await
//!     .unwrap();
//!
//! assert_eq!(result.len(), 3);
//! assert_eq!(result.usage().tokens.count(), Some(4));
//! # }
//! ```

// `embed` names both a module and a function here
#![deny(rustdoc::broken_intra_doc_links)]

mod embed;
mod error;
mod model;
mod models;
mod normalize;
mod options;
mod types;

pub use crate::embed::{embed, embed_many};
pub use crate::error::{is_retryable_status, EmbedError, ModelError};
pub use crate::model::{CallOptions, EmbeddingModel};
#[cfg(feature = "http")]
pub use crate::models::{ApiProvider, HttpEmbeddingModel, HttpModelConfig};
pub use crate::models::StubEmbeddingModel;
pub use crate::options::EmbedOptions;
pub use crate::types::{
    EmbedManyResult, EmbedResponse, Embedding, EmbeddingResult, RawResponse, TokenCount, Usage,
};

pub use retry::{CancellationToken, RetryConfig, RetryError, Retryable};
