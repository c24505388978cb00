use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::time::Duration;

use crate::error::ModelError;
use crate::model::{CallOptions, EmbeddingModel};
use crate::normalize::l2_normalize_in_place;
use crate::types::{EmbedResponse, Embedding, RawResponse, Usage};

/// Request/response dialect spoken by the remote endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApiProvider {
    /// `{"inputs": [...]}` → `[[...], ...]`
    #[serde(alias = "hf")]
    HuggingFace,
    /// `{"input": [...], "model": ...}` → `{"data": [{"embedding": [...]}], "usage": {...}}`
    #[serde(alias = "gpt")]
    OpenAi,
    /// `{"texts": [...]}` → `{"embeddings": [[...], ...]}`
    Custom,
}

impl ApiProvider {
    /// Parse a provider hint such as `"hf"` or `"openai"`; unknown hints
    /// fall back to [`ApiProvider::Custom`].
    pub fn from_hint(hint: &str) -> Self {
        match hint.to_ascii_lowercase().as_str() {
            "hf" | "huggingface" => ApiProvider::HuggingFace,
            "openai" | "gpt" => ApiProvider::OpenAi,
            _ => ApiProvider::Custom,
        }
    }
}

/// Settings for [`HttpEmbeddingModel`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HttpModelConfig {
    /// Endpoint receiving the JSON POST.
    pub url: String,
    /// Model name, sent to OpenAI-style endpoints and used in logs.
    pub model_id: String,
    #[serde(default = "default_provider")]
    pub provider: ApiProvider,
    /// Whole-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub max_embeddings_per_call: Option<usize>,
    /// L2-normalize every returned vector.
    #[serde(default)]
    pub normalize: bool,
}

fn default_provider() -> ApiProvider {
    ApiProvider::Custom
}

fn default_timeout_secs() -> u64 {
    30
}

impl HttpModelConfig {
    pub fn new(url: impl Into<String>, model_id: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            model_id: model_id.into(),
            provider: default_provider(),
            timeout_secs: default_timeout_secs(),
            max_embeddings_per_call: None,
            normalize: false,
        }
    }

    pub fn with_provider(mut self, provider: ApiProvider) -> Self {
        self.provider = provider;
        self
    }

    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    pub fn with_max_embeddings_per_call(mut self, max: Option<usize>) -> Self {
        self.max_embeddings_per_call = max;
        self
    }

    pub fn with_normalize(mut self, normalize: bool) -> Self {
        self.normalize = normalize;
        self
    }
}

/// Embedding model behind a JSON HTTP endpoint.
///
/// Outbound headers from [`CallOptions`] are attached to every request, so
/// credentials travel as ordinary headers (`Authorization: Bearer ...`).
#[derive(Debug, Clone)]
pub struct HttpEmbeddingModel {
    client: reqwest::Client,
    config: HttpModelConfig,
}

impl HttpEmbeddingModel {
    pub fn new(config: HttpModelConfig) -> Result<Self, ModelError> {
        if config.url.trim().is_empty() {
            return Err(ModelError::InvalidRequest("url is required".into()));
        }
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(config.timeout_secs.min(10)))
            .build()
            .map_err(|e| ModelError::InvalidRequest(format!("HTTP client setup failed: {e}")))?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &HttpModelConfig {
        &self.config
    }

    async fn send(
        &self,
        payload: Value,
        options: &CallOptions,
    ) -> Result<(Value, BTreeMap<String, String>), ModelError> {
        let mut request = self.client.post(&self.config.url).json(&payload);
        if let Some(headers) = &options.headers {
            for (name, value) in headers {
                request = request.header(name.as_str(), value.as_str());
            }
        }

        let response = request.send().await.map_err(classify_reqwest_error)?;
        let status = response.status();
        let headers = collect_headers(response.headers());

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ModelError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let body = response
            .json::<Value>()
            .await
            .map_err(|e| ModelError::InvalidResponse(format!("invalid JSON response: {e}")))?;
        Ok((body, headers))
    }
}

#[async_trait]
impl<V> EmbeddingModel<V> for HttpEmbeddingModel
where
    V: AsRef<str> + Sync,
{
    fn model_id(&self) -> &str {
        &self.config.model_id
    }

    fn max_embeddings_per_call(&self) -> Option<usize> {
        self.config.max_embeddings_per_call
    }

    async fn do_embed(
        &self,
        values: &[V],
        options: &CallOptions,
    ) -> Result<EmbedResponse, ModelError> {
        if values.is_empty() {
            return Err(ModelError::InvalidRequest("no values to embed".into()));
        }
        if let Some(max) = self.config.max_embeddings_per_call {
            if values.len() > max {
                return Err(ModelError::TooManyValues {
                    max,
                    got: values.len(),
                });
            }
        }

        let texts: Vec<&str> = values.iter().map(|value| value.as_ref()).collect();
        let payload = build_payload(self.config.provider, &texts, &self.config.model_id);

        let (body, headers) = match &options.cancellation {
            Some(token) => {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => return Err(ModelError::Cancelled),
                    sent = self.send(payload, options) => sent?,
                }
            }
            None => self.send(payload, options).await?,
        };

        let usage = parse_usage(&body);
        let mut embeddings = parse_embeddings(body)?;
        if self.config.normalize {
            for embedding in &mut embeddings {
                l2_normalize_in_place(embedding);
            }
        }

        let mut response =
            EmbedResponse::new(embeddings).with_raw_response(RawResponse { headers });
        if let Some(usage) = usage {
            response = response.with_usage(usage);
        }
        Ok(response)
    }
}

fn collect_headers(headers: &reqwest::header::HeaderMap) -> BTreeMap<String, String> {
    headers
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_owned(), v.to_owned()))
        })
        .collect()
}

fn classify_reqwest_error(err: reqwest::Error) -> ModelError {
    if err.is_builder() {
        ModelError::InvalidRequest(format!("HTTP request could not be built: {err}"))
    } else if err.is_decode() {
        ModelError::InvalidResponse(format!("HTTP response could not be decoded: {err}"))
    } else {
        ModelError::Transport(format!("HTTP request failed: {err}"))
    }
}

fn build_payload(provider: ApiProvider, texts: &[&str], model_id: &str) -> Value {
    match provider {
        ApiProvider::HuggingFace => json!({ "inputs": texts }),
        ApiProvider::OpenAi => json!({ "input": texts, "model": model_id }),
        ApiProvider::Custom => json!({ "texts": texts }),
    }
}

fn parse_usage(body: &Value) -> Option<Usage> {
    let usage = body.get("usage")?;
    ["total_tokens", "prompt_tokens", "tokens"]
        .iter()
        .find_map(|key| usage.get(*key).and_then(Value::as_u64))
        .map(Usage::tokens)
}

fn parse_embeddings(value: Value) -> Result<Vec<Embedding>, ModelError> {
    match value {
        Value::Object(mut map) => {
            if let Some(embeddings) = map.remove("embeddings") {
                return parse_embedding_collection(embeddings);
            }

            if let Some(Value::Array(items)) = map.remove("data") {
                return items
                    .into_iter()
                    .map(|item| match item {
                        Value::Object(mut obj) => obj
                            .remove("embedding")
                            .ok_or_else(|| {
                                ModelError::InvalidResponse(
                                    "missing `embedding` field in data item".into(),
                                )
                            })
                            .and_then(parse_embedding_vector),
                        _ => Err(ModelError::InvalidResponse(
                            "unexpected entry inside `data` array".into(),
                        )),
                    })
                    .collect();
            }

            Err(ModelError::InvalidResponse(
                "unsupported API response shape".into(),
            ))
        }
        other => parse_embedding_collection(other),
    }
}

fn parse_embedding_collection(value: Value) -> Result<Vec<Embedding>, ModelError> {
    match value {
        Value::Array(items) => {
            if items.is_empty() {
                Ok(Vec::new())
            } else if items.iter().all(|item| matches!(item, Value::Array(_))) {
                items.into_iter().map(parse_embedding_vector).collect()
            } else {
                parse_embedding_vector(Value::Array(items)).map(|vec| vec![vec])
            }
        }
        other => parse_embedding_vector(other).map(|vec| vec![vec]),
    }
}

fn parse_embedding_vector(value: Value) -> Result<Embedding, ModelError> {
    match value {
        Value::Array(values) => values
            .into_iter()
            .map(|entry| match entry {
                Value::Number(num) => num
                    .as_f64()
                    .map(|f| f as f32)
                    .ok_or_else(|| ModelError::InvalidResponse("non-finite embedding value".into())),
                other => Err(ModelError::InvalidResponse(format!(
                    "embedding entries must be numbers, got {other}"
                ))),
            })
            .collect(),
        other => Err(ModelError::InvalidResponse(format!(
            "embedding vector must be an array, got {other}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_hints() {
        assert_eq!(ApiProvider::from_hint("HF"), ApiProvider::HuggingFace);
        assert_eq!(ApiProvider::from_hint("openai"), ApiProvider::OpenAi);
        assert_eq!(ApiProvider::from_hint("whatever"), ApiProvider::Custom);
    }

    #[test]
    fn provider_short_names_deserialize() {
        let parse = |raw: &str| serde_json::from_value::<ApiProvider>(json!(raw)).unwrap();
        assert_eq!(parse("hf"), ApiProvider::HuggingFace);
        assert_eq!(parse("huggingface"), ApiProvider::HuggingFace);
        assert_eq!(parse("gpt"), ApiProvider::OpenAi);
        assert_eq!(parse("openai"), ApiProvider::OpenAi);
        assert!(serde_json::from_value::<ApiProvider>(json!("bert")).is_err());
    }

    #[test]
    fn payload_shapes() {
        let texts = ["cat", "dog"];
        assert_eq!(
            build_payload(ApiProvider::HuggingFace, &texts, "m"),
            json!({ "inputs": ["cat", "dog"] })
        );
        assert_eq!(
            build_payload(ApiProvider::OpenAi, &texts, "text-embedding-3-small"),
            json!({ "input": ["cat", "dog"], "model": "text-embedding-3-small" })
        );
        assert_eq!(
            build_payload(ApiProvider::Custom, &texts, "m"),
            json!({ "texts": ["cat", "dog"] })
        );
    }

    #[test]
    fn parses_openai_data_and_usage() {
        let body = json!({
            "data": [{ "embedding": [0.5, 0.25] }, { "embedding": [1.0, 0.0] }],
            "usage": { "prompt_tokens": 4, "total_tokens": 4 }
        });
        assert_eq!(parse_usage(&body), Some(Usage::tokens(4)));
        assert_eq!(
            parse_embeddings(body).unwrap(),
            vec![vec![0.5, 0.25], vec![1.0, 0.0]]
        );
    }

    #[test]
    fn parses_bare_and_keyed_arrays() {
        assert_eq!(
            parse_embeddings(json!([[1.0, 2.0], [3.0, 4.0]])).unwrap(),
            vec![vec![1.0, 2.0], vec![3.0, 4.0]]
        );
        assert_eq!(
            parse_embeddings(json!([1.0, 2.0])).unwrap(),
            vec![vec![1.0, 2.0]]
        );
        assert_eq!(
            parse_embeddings(json!({ "embeddings": [[0.5]] })).unwrap(),
            vec![vec![0.5]]
        );
        assert!(parse_embeddings(json!([])).unwrap().is_empty());
    }

    #[test]
    fn missing_usage_is_none() {
        assert_eq!(parse_usage(&json!([[1.0]])), None);
        assert_eq!(parse_usage(&json!({ "usage": {} })), None);
    }

    #[test]
    fn malformed_bodies_are_invalid_responses() {
        assert!(matches!(
            parse_embeddings(json!({ "nope": 1 })),
            Err(ModelError::InvalidResponse(_))
        ));
        assert!(matches!(
            parse_embeddings(json!([["a"]])),
            Err(ModelError::InvalidResponse(_))
        ));
        assert!(matches!(
            parse_embeddings(json!({ "data": [{ "vector": [1.0] }] })),
            Err(ModelError::InvalidResponse(_))
        ));
    }

    #[test]
    fn empty_url_is_rejected() {
        let err = HttpEmbeddingModel::new(HttpModelConfig::new(" ", "m")).unwrap_err();
        assert!(matches!(err, ModelError::InvalidRequest(_)));
    }

    #[test]
    fn config_deserializes_with_defaults() {
        let cfg: HttpModelConfig = serde_json::from_value(json!({
            "url": "http://localhost:8080/embed",
            "model_id": "bge-small-en-v1.5",
            "provider": "huggingface"
        }))
        .unwrap();
        assert_eq!(cfg.provider, ApiProvider::HuggingFace);
        assert_eq!(cfg.timeout_secs, 30);
        assert_eq!(cfg.max_embeddings_per_call, None);
        assert!(!cfg.normalize);
    }
}
