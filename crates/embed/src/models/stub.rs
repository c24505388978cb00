use async_trait::async_trait;
use fxhash::hash64;

use crate::error::ModelError;
use crate::model::{CallOptions, EmbeddingModel};
use crate::normalize::l2_normalize_in_place;
use crate::types::{EmbedResponse, Embedding, Usage};

/// Deterministic, offline model. Vectors are sinusoids seeded from a hash of
/// the text, so equal inputs always embed identically. Usage is reported as
/// the whitespace token count.
#[derive(Debug, Clone, PartialEq)]
pub struct StubEmbeddingModel {
    model_id: String,
    dimensions: usize,
    normalize: bool,
    max_embeddings_per_call: Option<usize>,
}

impl Default for StubEmbeddingModel {
    fn default() -> Self {
        Self {
            model_id: "stub-embedding".into(),
            dimensions: 384,
            normalize: true,
            max_embeddings_per_call: None,
        }
    }
}

impl StubEmbeddingModel {
    pub fn new(model_id: impl Into<String>) -> Self {
        Self {
            model_id: model_id.into(),
            ..Self::default()
        }
    }

    pub fn with_dimensions(mut self, dimensions: usize) -> Self {
        self.dimensions = dimensions;
        self
    }

    pub fn with_normalize(mut self, normalize: bool) -> Self {
        self.normalize = normalize;
        self
    }

    pub fn with_max_embeddings_per_call(mut self, max: Option<usize>) -> Self {
        self.max_embeddings_per_call = max;
        self
    }

    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    pub fn embed_text(&self, text: &str) -> Embedding {
        let h = hash64(text.as_bytes());
        let mut v: Embedding = (0..self.dimensions)
            .map(|idx| ((h >> (idx % 32)) as f32 * 0.0001).sin())
            .collect();
        if self.normalize {
            l2_normalize_in_place(&mut v);
        }
        v
    }
}

#[async_trait]
impl<V> EmbeddingModel<V> for StubEmbeddingModel
where
    V: AsRef<str> + Sync,
{
    fn model_id(&self) -> &str {
        &self.model_id
    }

    fn max_embeddings_per_call(&self) -> Option<usize> {
        self.max_embeddings_per_call
    }

    async fn do_embed(
        &self,
        values: &[V],
        _options: &CallOptions,
    ) -> Result<EmbedResponse, ModelError> {
        if let Some(max) = self.max_embeddings_per_call {
            if values.len() > max {
                return Err(ModelError::TooManyValues {
                    max,
                    got: values.len(),
                });
            }
        }

        let embeddings = values
            .iter()
            .map(|value| self.embed_text(value.as_ref()))
            .collect();
        let tokens = values
            .iter()
            .map(|value| value.as_ref().split_whitespace().count() as u64)
            .sum();

        Ok(EmbedResponse::new(embeddings).with_usage(Usage::tokens(tokens)))
    }
}
