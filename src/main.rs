use std::error::Error;
use std::io::{self, BufRead};

use embedline::{CancellationToken, EmbedlineConfig, embed_many};
use tracing_subscriber::EnvFilter;

/// Embeds text with the model described by a YAML config and prints the
/// result as JSON.
///
/// ```bash
/// embedline config.yaml "first text" "second text"
/// printf 'one\ntwo\n' | embedline config.yaml
/// ```
///
/// Ctrl+C cancels the run; a pending backoff wait is cut short.
#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(io::stderr)
        .json()
        .init();

    let mut args = std::env::args().skip(1);
    let Some(config_path) = args.next() else {
        eprintln!("usage: embedline <config.yaml> [text...]");
        std::process::exit(2);
    };

    let mut texts: Vec<String> = args.collect();
    if texts.is_empty() {
        for line in io::stdin().lock().lines() {
            let line = line?;
            if !line.trim().is_empty() {
                texts.push(line);
            }
        }
    }

    let config = EmbedlineConfig::from_file(&config_path)?;
    let model = config.build_model()?;

    let token = CancellationToken::new();
    let on_ctrl_c = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("cancellation_requested");
            on_ctrl_c.cancel();
        }
    });

    let options = config.embed_options()?.with_cancellation(token);
    let result = embed_many(&model, texts, &options).await?;

    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}
