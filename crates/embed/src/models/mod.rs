//! Built-in model capabilities.

#[cfg(feature = "http")]
mod http;
mod stub;

#[cfg(feature = "http")]
pub use self::http::{ApiProvider, HttpEmbeddingModel, HttpModelConfig};
pub use self::stub::StubEmbeddingModel;
