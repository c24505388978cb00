use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::ops::Add;

/// Dense vector produced by a model.
pub type Embedding = Vec<f32>;

/// Token accounting reported by a model.
///
/// `NotReported` is the not-a-number marker: it is neither zero nor absent,
/// and [`as_f64`](Self::as_f64) yields `NaN` for it. Serialized as `null`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TokenCount {
    Counted(u64),
    NotReported,
}

impl TokenCount {
    pub fn as_f64(self) -> f64 {
        match self {
            TokenCount::Counted(tokens) => tokens as f64,
            TokenCount::NotReported => f64::NAN,
        }
    }

    pub fn is_nan(self) -> bool {
        matches!(self, TokenCount::NotReported)
    }

    pub fn count(self) -> Option<u64> {
        match self {
            TokenCount::Counted(tokens) => Some(tokens),
            TokenCount::NotReported => None,
        }
    }
}

/// Sums like floats do: anything plus `NotReported` is `NotReported`.
impl Add for TokenCount {
    type Output = TokenCount;

    fn add(self, rhs: TokenCount) -> TokenCount {
        match (self, rhs) {
            (TokenCount::Counted(a), TokenCount::Counted(b)) => {
                TokenCount::Counted(a.saturating_add(b))
            }
            _ => TokenCount::NotReported,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub tokens: TokenCount,
}

impl Usage {
    pub fn tokens(tokens: u64) -> Self {
        Self {
            tokens: TokenCount::Counted(tokens),
        }
    }

    pub fn not_reported() -> Self {
        Self {
            tokens: TokenCount::NotReported,
        }
    }
}

/// Transport metadata a model may attach to its response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawResponse {
    pub headers: BTreeMap<String, String>,
}

/// What a model capability returns for one batch call.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbedResponse {
    /// One embedding per submitted value, in submission order.
    pub embeddings: Vec<Embedding>,
    pub usage: Option<Usage>,
    pub raw_response: Option<RawResponse>,
}

impl EmbedResponse {
    pub fn new(embeddings: Vec<Embedding>) -> Self {
        Self {
            embeddings,
            usage: None,
            raw_response: None,
        }
    }

    pub fn with_usage(mut self, usage: Usage) -> Self {
        self.usage = Some(usage);
        self
    }

    pub fn with_raw_response(mut self, raw: RawResponse) -> Self {
        self.raw_response = Some(raw);
        self
    }
}

/// Result of [`embed`](fn@crate::embed). Built once, after the model call
/// succeeded; read-only afterwards.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmbeddingResult<V> {
    value: V,
    embedding: Embedding,
    usage: Usage,
    #[serde(skip_serializing_if = "Option::is_none")]
    raw_response: Option<RawResponse>,
}

impl<V> EmbeddingResult<V> {
    pub(crate) fn new(
        value: V,
        embedding: Embedding,
        usage: Usage,
        raw_response: Option<RawResponse>,
    ) -> Self {
        Self {
            value,
            embedding,
            usage,
            raw_response,
        }
    }

    /// The input exactly as the caller passed it.
    pub fn value(&self) -> &V {
        &self.value
    }

    /// The embedding of [`value`](Self::value).
    pub fn embedding(&self) -> &[f32] {
        &self.embedding
    }

    pub fn usage(&self) -> Usage {
        self.usage
    }

    pub fn raw_response(&self) -> Option<&RawResponse> {
        self.raw_response.as_ref()
    }

    pub fn into_parts(self) -> (V, Embedding, Usage, Option<RawResponse>) {
        (self.value, self.embedding, self.usage, self.raw_response)
    }
}

/// Result of [`embed_many`](fn@crate::embed_many).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmbedManyResult<V> {
    values: Vec<V>,
    embeddings: Vec<Embedding>,
    usage: Usage,
    responses: Vec<RawResponse>,
}

impl<V> EmbedManyResult<V> {
    pub(crate) fn new(
        values: Vec<V>,
        embeddings: Vec<Embedding>,
        usage: Usage,
        responses: Vec<RawResponse>,
    ) -> Self {
        Self {
            values,
            embeddings,
            usage,
            responses,
        }
    }

    pub fn values(&self) -> &[V] {
        &self.values
    }

    /// `embeddings()[i]` belongs to `values()[i]`.
    pub fn embeddings(&self) -> &[Embedding] {
        &self.embeddings
    }

    /// Summed over every model call; `NotReported` if any call omitted it.
    pub fn usage(&self) -> Usage {
        self.usage
    }

    /// Raw metadata of each model call that attached some.
    pub fn responses(&self) -> &[RawResponse] {
        &self.responses
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Pair each value with its embedding.
    pub fn into_pairs(self) -> Vec<(V, Embedding)> {
        self.values.into_iter().zip(self.embeddings).collect()
    }
}
