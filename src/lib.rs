//! Workspace umbrella crate for embedline.
//!
//! Re-exports the embedding orchestrator (`embed` crate) and the retry
//! executor (`retry` crate) behind one dependency, and adds YAML
//! configuration loading so a run can be described in a file:
//!
//! ```
//! use embedline::{embed, EmbedlineConfig};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = EmbedlineConfig::from_yaml(
//!     r#"
//! version: "1.0"
//! retry:
//!   max_retries: 1
//! model:
//!   kind: stub
//!   dimensions: 8
//! "#,
//! )?;
//!
//! let model = config.build_model()?;
//! let result = embed(&model, "hello world".to_string(), &config.embed_options()?).await?;
//! assert_eq!(result.embedding().len(), 8);
//! # Ok(())
//! # }
//! ```

pub mod config;

pub use config::{
    ConfigLoadError, EmbedlineConfig, ModelYamlConfig, RetryYamlConfig, StubYamlConfig,
};

pub use embed::{
    CallOptions, EmbedError, EmbedManyResult, EmbedOptions, EmbedResponse, Embedding,
    EmbeddingModel, EmbeddingResult, ModelError, RawResponse, StubEmbeddingModel, TokenCount,
    Usage, embed, embed_many, is_retryable_status,
};
#[cfg(feature = "http")]
pub use embed::{ApiProvider, HttpEmbeddingModel, HttpModelConfig};
pub use retry::{
    CancellationToken, RetryConfig, RetryConfigError, RetryError, RetryExecutor, RetryReport,
    Retryable, Sleep, TokioSleep, execute_with_retry, parse_max_retries,
};
