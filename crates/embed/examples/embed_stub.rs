use std::{env, error::Error};

use embed::{embed_many, EmbedOptions, StubEmbeddingModel};
use tracing_subscriber::EnvFilter;

/// Batch-embeds the command line arguments with the offline stub model.
///
/// Usage:
/// ```bash
/// RUST_LOG=embed=debug cargo run -p embedline-embed --example embed_stub -- "text one" "text two"
/// ```
#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let mut texts: Vec<String> = env::args().skip(1).collect();
    if texts.is_empty() {
        texts.push("Hello from batch embeddings".into());
        texts.push("More text to embed".into());
    }

    let model = StubEmbeddingModel::new("stub-demo")
        .with_dimensions(32)
        .with_max_embeddings_per_call(Some(2));

    let result = embed_many(&model, texts, &EmbedOptions::default()).await?;
    println!(
        "generated {} embeddings, tokens={:?}",
        result.len(),
        result.usage().tokens.count()
    );

    for (text, vector) in result.into_pairs() {
        println!("{text:?} => dim={}, head={:?}", vector.len(), &vector[..vector.len().min(5)]);
    }

    Ok(())
}
