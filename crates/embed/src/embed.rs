use std::time::Instant;

use retry::RetryExecutor;
use tracing::{info, info_span, warn, Instrument};

use crate::error::{EmbedError, ModelError};
use crate::model::EmbeddingModel;
use crate::options::EmbedOptions;
use crate::types::{
    EmbedManyResult, EmbedResponse, EmbeddingResult, RawResponse, TokenCount, Usage,
};

/// Embed a single value.
///
/// The model is called with a one-element batch inside a retry executor
/// built from `options.retry`; an invalid retry config fails before the
/// model is touched. Whatever the executor surfaces is returned unchanged.
///
/// # Example
/// ```
/// use embed::{embed, EmbedOptions, StubEmbeddingModel};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let model = StubEmbeddingModel::default().with_dimensions(8);
/// let result = embed(&model, "sunny day", &EmbedOptions::default())
///     .await
///     .unwrap();
///
/// assert_eq!(*result.value(), "sunny day");
/// assert_eq!(result.embedding().len(), 8);
/// # }
/// ```
pub async fn embed<V, M>(
    model: &M,
    value: V,
    options: &EmbedOptions,
) -> Result<EmbeddingResult<V>, EmbedError>
where
    M: EmbeddingModel<V> + ?Sized,
    V: Sync,
{
    let span = info_span!("embed.embed", model_id = %model.model_id());
    embed_inner(model, value, options).instrument(span).await
}

async fn embed_inner<V, M>(
    model: &M,
    value: V,
    options: &EmbedOptions,
) -> Result<EmbeddingResult<V>, EmbedError>
where
    M: EmbeddingModel<V> + ?Sized,
    V: Sync,
{
    let start = Instant::now();
    let executor =
        RetryExecutor::new(options.retry)?.with_cancellation(options.cancellation.clone());
    let call = options.call_options();

    let outcome = {
        let value = &value;
        let call = &call;
        executor
            .execute(move || async move {
                let EmbedResponse {
                    embeddings,
                    usage,
                    raw_response,
                } = model.do_embed(std::slice::from_ref(value), call).await?;
                let embedding = embeddings.into_iter().next().ok_or_else(|| {
                    ModelError::InvalidResponse("model returned no embedding".into())
                })?;
                Ok::<_, ModelError>((embedding, usage, raw_response))
            })
            .await
    };

    let elapsed_micros = start.elapsed().as_micros();
    match outcome {
        Ok((embedding, usage, raw_response)) => {
            let usage = usage.unwrap_or_else(Usage::not_reported);
            info!(
                dimensions = embedding.len(),
                tokens = ?usage.tokens,
                elapsed_micros,
                "embed_success"
            );
            Ok(EmbeddingResult::new(value, embedding, usage, raw_response))
        }
        Err(err) => {
            warn!(error = %err, elapsed_micros, "embed_failure");
            Err(err)
        }
    }
}

/// Embed many values, splitting them into batches no larger than
/// [`EmbeddingModel::max_embeddings_per_call`].
///
/// Batches run one after another, each under its own retry budget. The
/// first batch that fails ends the call; nothing partial is returned.
pub async fn embed_many<V, M>(
    model: &M,
    values: Vec<V>,
    options: &EmbedOptions,
) -> Result<EmbedManyResult<V>, EmbedError>
where
    M: EmbeddingModel<V> + ?Sized,
    V: Sync,
{
    let span = info_span!(
        "embed.embed_many",
        model_id = %model.model_id(),
        values = values.len()
    );
    embed_many_inner(model, values, options).instrument(span).await
}

async fn embed_many_inner<V, M>(
    model: &M,
    values: Vec<V>,
    options: &EmbedOptions,
) -> Result<EmbedManyResult<V>, EmbedError>
where
    M: EmbeddingModel<V> + ?Sized,
    V: Sync,
{
    let start = Instant::now();
    let executor =
        RetryExecutor::new(options.retry)?.with_cancellation(options.cancellation.clone());

    if values.is_empty() {
        return Ok(EmbedManyResult::new(
            values,
            Vec::new(),
            Usage::tokens(0),
            Vec::new(),
        ));
    }

    let call = options.call_options();
    let batch_size = model
        .max_embeddings_per_call()
        .unwrap_or(values.len())
        .max(1);

    let mut embeddings = Vec::with_capacity(values.len());
    let mut tokens = TokenCount::Counted(0);
    let mut responses: Vec<RawResponse> = Vec::new();

    for (batch_index, batch) in values.chunks(batch_size).enumerate() {
        let call = &call;
        let outcome = executor
            .execute(move || async move {
                let response = model.do_embed(batch, call).await?;
                if response.embeddings.len() != batch.len() {
                    return Err(ModelError::InvalidResponse(format!(
                        "model returned {} embeddings for {} values",
                        response.embeddings.len(),
                        batch.len()
                    )));
                }
                Ok::<_, ModelError>(response)
            })
            .await;

        let response = match outcome {
            Ok(response) => response,
            Err(err) => {
                warn!(
                    batch_index,
                    error = %err,
                    elapsed_micros = start.elapsed().as_micros(),
                    "embed_many_failure"
                );
                return Err(err);
            }
        };

        embeddings.extend(response.embeddings);
        tokens = tokens + response.usage.map_or(TokenCount::NotReported, |u| u.tokens);
        responses.extend(response.raw_response);
    }

    info!(
        embeddings = embeddings.len(),
        batches = values.len().div_ceil(batch_size),
        tokens = ?tokens,
        elapsed_micros = start.elapsed().as_micros(),
        "embed_many_success"
    );

    Ok(EmbedManyResult::new(
        values,
        embeddings,
        Usage { tokens },
        responses,
    ))
}
