//! YAML configuration for embedding runs.
//!
//! One file describes the retry policy, the outbound headers and which model
//! capability to build. It is parsed, validated, and then turned into the
//! runtime types ([`EmbedOptions`], a shared [`EmbeddingModel`]).
//!
//! ## Example YAML Configuration
//!
//! ```yaml
//! version: "1.0"
//! name: "nightly reindex"
//!
//! retry:
//!   max_retries: 3
//!   base_delay_ms: 500
//!   max_delay_ms: 30000
//!   backoff_multiplier: 2.0
//!   jitter: true
//!
//! headers:
//!   x-request-source: "reindex"
//!
//! model:
//!   kind: http
//!   url: "https://router.huggingface.co/hf-inference/models/BAAI/bge-small-en-v1.5/pipeline/feature-extraction"
//!   model_id: "BAAI/bge-small-en-v1.5"
//!   provider: huggingface
//!   timeout_secs: 60
//!   normalize: true
//! ```
//!
//! `max_retries` is read as a plain YAML number so that `-1` or `1.5` are
//! reported as validation errors rather than type errors.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use embed::{EmbedOptions, EmbeddingModel, ModelError, StubEmbeddingModel};
#[cfg(feature = "http")]
use embed::{HttpEmbeddingModel, HttpModelConfig};
use retry::RetryConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur when loading YAML configuration files
#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("unsupported config version: {0}")]
    UnsupportedVersion(String),

    #[error("failed to build model: {0}")]
    Model(#[from] ModelError),
}

/// Top-level YAML configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct EmbedlineConfig {
    /// Configuration format version
    pub version: String,

    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub retry: RetryYamlConfig,

    /// Outbound headers forwarded to the model on every call
    #[serde(default)]
    pub headers: BTreeMap<String, String>,

    #[serde(default)]
    pub model: ModelYamlConfig,
}

impl EmbedlineConfig {
    /// Load a YAML configuration file from the given path
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigLoadError> {
        let content = fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse YAML configuration from a string
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigLoadError> {
        let config: EmbedlineConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigLoadError> {
        match self.version.as_str() {
            "1.0" | "1" => Ok(()),
            v => Err(ConfigLoadError::UnsupportedVersion(v.to_string())),
        }?;

        self.retry.to_retry_config()?;
        self.model.validate()?;

        if let Some(name) = self.headers.keys().find(|name| name.trim().is_empty()) {
            return Err(ConfigLoadError::Validation(format!(
                "headers: empty header name {name:?}"
            )));
        }

        Ok(())
    }

    /// Options for [`embed`](fn@embed::embed) / [`embed_many`](fn@embed::embed_many)
    /// built from the `retry` and `headers` sections. No cancellation token
    /// is attached; callers add their own.
    pub fn embed_options(&self) -> Result<EmbedOptions, ConfigLoadError> {
        let mut options = EmbedOptions::default().with_retry(self.retry.to_retry_config()?);
        if !self.headers.is_empty() {
            options = options.with_headers(self.headers.clone());
        }
        Ok(options)
    }

    /// Instantiate the configured model capability.
    pub fn build_model(&self) -> Result<Arc<dyn EmbeddingModel<String>>, ConfigLoadError> {
        let model: Arc<dyn EmbeddingModel<String>> = match &self.model {
            ModelYamlConfig::Stub(stub) => Arc::new(
                StubEmbeddingModel::new(stub.model_id.clone())
                    .with_dimensions(stub.dimensions)
                    .with_normalize(stub.normalize)
                    .with_max_embeddings_per_call(stub.max_embeddings_per_call),
            ),
            #[cfg(feature = "http")]
            ModelYamlConfig::Http(http) => Arc::new(HttpEmbeddingModel::new(http.clone())?),
        };
        tracing::debug!(model_id = %model.as_ref().model_id(), "model_built");
        Ok(model)
    }
}

impl Default for EmbedlineConfig {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            name: None,
            retry: RetryYamlConfig::default(),
            headers: BTreeMap::new(),
            model: ModelYamlConfig::default(),
        }
    }
}

/// Retry policy YAML configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryYamlConfig {
    #[serde(default = "default_max_retries")]
    pub max_retries: f64,

    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    #[serde(default)]
    pub jitter: bool,
}

impl RetryYamlConfig {
    /// Checked conversion into the executor's policy.
    pub fn to_retry_config(&self) -> Result<RetryConfig, ConfigLoadError> {
        let config = RetryConfig::default()
            .try_with_max_retries(self.max_retries)
            .map_err(retry_validation)?
            .with_base_delay(Duration::from_millis(self.base_delay_ms))
            .with_max_delay(Duration::from_millis(self.max_delay_ms))
            .with_backoff_multiplier(self.backoff_multiplier)
            .with_jitter(self.jitter);
        config.validate().map_err(retry_validation)?;
        Ok(config)
    }
}

impl Default for RetryYamlConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            backoff_multiplier: default_backoff_multiplier(),
            jitter: false,
        }
    }
}

fn retry_validation(err: retry::RetryConfigError) -> ConfigLoadError {
    ConfigLoadError::Validation(format!("retry.{err}"))
}

/// Which model capability to build, selected by `kind`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModelYamlConfig {
    Stub(StubYamlConfig),
    #[cfg(feature = "http")]
    Http(HttpModelConfig),
}

impl ModelYamlConfig {
    fn validate(&self) -> Result<(), ConfigLoadError> {
        match self {
            ModelYamlConfig::Stub(stub) => {
                if stub.dimensions == 0 {
                    return Err(ConfigLoadError::Validation(
                        "model.dimensions must be >= 1".to_string(),
                    ));
                }
                validate_batch_limit(stub.max_embeddings_per_call)
            }
            #[cfg(feature = "http")]
            ModelYamlConfig::Http(http) => {
                if http.url.trim().is_empty() {
                    return Err(ConfigLoadError::Validation(
                        "model.url must not be empty".to_string(),
                    ));
                }
                if http.timeout_secs == 0 {
                    return Err(ConfigLoadError::Validation(
                        "model.timeout_secs must be >= 1".to_string(),
                    ));
                }
                validate_batch_limit(http.max_embeddings_per_call)
            }
        }
    }
}

impl Default for ModelYamlConfig {
    fn default() -> Self {
        ModelYamlConfig::Stub(StubYamlConfig::default())
    }
}

fn validate_batch_limit(limit: Option<usize>) -> Result<(), ConfigLoadError> {
    if limit == Some(0) {
        return Err(ConfigLoadError::Validation(
            "model.max_embeddings_per_call must be >= 1".to_string(),
        ));
    }
    Ok(())
}

/// Offline stub model YAML configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StubYamlConfig {
    #[serde(default = "default_model_id")]
    pub model_id: String,

    #[serde(default = "default_dimensions")]
    pub dimensions: usize,

    #[serde(default = "true_value")]
    pub normalize: bool,

    #[serde(default)]
    pub max_embeddings_per_call: Option<usize>,
}

impl Default for StubYamlConfig {
    fn default() -> Self {
        Self {
            model_id: default_model_id(),
            dimensions: default_dimensions(),
            normalize: true,
            max_embeddings_per_call: None,
        }
    }
}

fn default_max_retries() -> f64 {
    f64::from(RetryConfig::default().max_retries)
}
fn default_base_delay_ms() -> u64 {
    RetryConfig::default().base_delay.as_millis() as u64
}
fn default_max_delay_ms() -> u64 {
    RetryConfig::default().max_delay.as_millis() as u64
}
fn default_backoff_multiplier() -> f64 {
    RetryConfig::default().backoff_multiplier
}
fn default_model_id() -> String {
    "stub-embedding".to_string()
}
fn default_dimensions() -> usize {
    384
}
fn true_value() -> bool {
    true
}
