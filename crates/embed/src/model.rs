use async_trait::async_trait;
use retry::CancellationToken;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::ModelError;
use crate::types::EmbedResponse;

/// Per-call context handed to a model: the caller's cancellation token and
/// outbound headers. Local models are free to ignore both.
#[derive(Debug, Clone, Default)]
pub struct CallOptions {
    pub cancellation: Option<CancellationToken>,
    pub headers: Option<BTreeMap<String, String>>,
}

/// A batch-capable embedding capability.
///
/// `do_embed` receives an ordered slice of values and must return one
/// embedding per value, in the same order.
#[async_trait]
pub trait EmbeddingModel<V>: Send + Sync
where
    V: Sync,
{
    /// Identifier surfaced in logs.
    fn model_id(&self) -> &str;

    /// Largest batch a single `do_embed` call accepts; `None` for no limit.
    fn max_embeddings_per_call(&self) -> Option<usize> {
        None
    }

    async fn do_embed(
        &self,
        values: &[V],
        options: &CallOptions,
    ) -> Result<EmbedResponse, ModelError>;
}

#[async_trait]
impl<V, M> EmbeddingModel<V> for Arc<M>
where
    V: Sync,
    M: EmbeddingModel<V> + ?Sized,
{
    fn model_id(&self) -> &str {
        (**self).model_id()
    }

    fn max_embeddings_per_call(&self) -> Option<usize> {
        (**self).max_embeddings_per_call()
    }

    async fn do_embed(
        &self,
        values: &[V],
        options: &CallOptions,
    ) -> Result<EmbedResponse, ModelError> {
        (**self).do_embed(values, options).await
    }
}
