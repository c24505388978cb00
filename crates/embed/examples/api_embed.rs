use std::{env, error::Error};

use embed::{
    embed, ApiProvider, CancellationToken, EmbedOptions, EmbeddingModel, HttpEmbeddingModel,
    HttpModelConfig, StubEmbeddingModel,
};
use tracing_subscriber::EnvFilter;

/// Embeds one text through a remote JSON endpoint, retrying transient failures.
///
/// ```bash
/// EMBEDLINE_API_URL=https://router.huggingface.co/hf-inference/models/BAAI/bge-small-en-v1.5/pipeline/feature-extraction \
/// EMBEDLINE_API_TOKEN=hf_xxx \
/// cargo run -p embedline-embed --example api_embed -- "Some text"
/// ```
///
/// ## Environment Variables
///
/// - `EMBEDLINE_API_URL`: inference endpoint; without it the stub model is used
/// - `EMBEDLINE_API_TOKEN`: sent as `Authorization: Bearer <token>`
/// - `EMBEDLINE_API_PROVIDER`: `hf` (default), `openai` or anything else for `{"texts": [...]}`
/// - `EMBEDLINE_API_MODEL`: model name sent to OpenAI-style endpoints
///
/// Ctrl-C while a retry is waiting aborts the call.
#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let text = env::args()
        .nth(1)
        .unwrap_or_else(|| "Text to embed via API".into());

    let token = CancellationToken::new();
    let ctrl_c = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrl_c.cancel();
        }
    });

    let mut options = EmbedOptions::default()
        .with_max_retries(3)
        .with_cancellation(token);

    let model: Box<dyn EmbeddingModel<String>> = match env::var("EMBEDLINE_API_URL") {
        Ok(url) => {
            let provider = env::var("EMBEDLINE_API_PROVIDER").unwrap_or_else(|_| "hf".into());
            let model_id = env::var("EMBEDLINE_API_MODEL")
                .unwrap_or_else(|_| "BAAI/bge-small-en-v1.5".into());
            if let Ok(api_token) = env::var("EMBEDLINE_API_TOKEN") {
                options = options.with_header("Authorization", format!("Bearer {api_token}"));
            }
            println!("Using remote API: {url}");
            Box::new(HttpEmbeddingModel::new(
                HttpModelConfig::new(url, model_id)
                    .with_provider(ApiProvider::from_hint(&provider))
                    .with_timeout_secs(60)
                    .with_normalize(true),
            )?)
        }
        Err(_) => {
            println!("EMBEDLINE_API_URL not set; falling back to the deterministic stub.");
            Box::new(StubEmbeddingModel::new("stub-fallback"))
        }
    };

    let result = embed(model.as_ref(), text, &options).await?;
    let vector = result.embedding();
    println!("model: {}", model.model_id());
    println!("dim: {}", vector.len());
    println!("tokens: {}", result.usage().tokens.as_f64());
    println!("first values: {:?}", &vector[..vector.len().min(8)]);

    Ok(())
}
