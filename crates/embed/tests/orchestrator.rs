use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use embed::{
    embed, embed_many, CallOptions, CancellationToken, EmbedOptions, EmbedResponse,
    EmbeddingModel, ModelError, RawResponse, RetryConfig, RetryError, Usage,
};

#[derive(Debug, Clone)]
struct Call {
    values: Vec<&'static str>,
    headers: Option<BTreeMap<String, String>>,
}

/// Plays back queued responses in order. Once the queue is empty every
/// value embeds as `[len]` and usage is one token per value.
#[derive(Default)]
struct ScriptedModel {
    script: Mutex<VecDeque<Result<EmbedResponse, ModelError>>>,
    calls: Mutex<Vec<Call>>,
    max_per_call: Option<usize>,
}

impl ScriptedModel {
    fn new(script: Vec<Result<EmbedResponse, ModelError>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            ..Self::default()
        }
    }

    fn with_max_per_call(mut self, max: usize) -> Self {
        self.max_per_call = Some(max);
        self
    }

    fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl EmbeddingModel<&'static str> for ScriptedModel {
    fn model_id(&self) -> &str {
        "scripted"
    }

    fn max_embeddings_per_call(&self) -> Option<usize> {
        self.max_per_call
    }

    async fn do_embed(
        &self,
        values: &[&'static str],
        options: &CallOptions,
    ) -> Result<EmbedResponse, ModelError> {
        self.calls.lock().unwrap().push(Call {
            values: values.to_vec(),
            headers: options.headers.clone(),
        });
        if let Some(step) = self.script.lock().unwrap().pop_front() {
            return step;
        }
        let embeddings = values.iter().map(|v| vec![v.len() as f32]).collect();
        Ok(EmbedResponse::new(embeddings).with_usage(Usage::tokens(values.len() as u64)))
    }
}

fn unavailable(body: &str) -> ModelError {
    ModelError::Http {
        status: 503,
        body: body.into(),
    }
}

#[tokio::test]
async fn single_value_round_trip() {
    let model = ScriptedModel::new(vec![Ok(EmbedResponse::new(vec![vec![0.1, 0.2]])
        .with_usage(Usage::tokens(3))
        .with_raw_response(RawResponse {
            headers: BTreeMap::from([("x-request-id".to_string(), "r-1".to_string())]),
        }))]);

    let result = embed(&model, "cat", &EmbedOptions::default()).await.unwrap();

    assert_eq!(*result.value(), "cat");
    assert_eq!(result.embedding(), &[0.1f32, 0.2]);
    assert_eq!(result.usage(), Usage::tokens(3));
    assert_eq!(
        result.raw_response().unwrap().headers["x-request-id"],
        "r-1"
    );

    let calls = model.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].values, vec!["cat"]);
}

#[tokio::test]
async fn missing_usage_reads_as_nan() {
    let model = ScriptedModel::new(vec![Ok(EmbedResponse::new(vec![vec![0.1, 0.2]]))]);

    let result = embed(&model, "cat", &EmbedOptions::default()).await.unwrap();

    assert!(result.usage().tokens.is_nan());
    assert!(result.usage().tokens.as_f64().is_nan());
    assert!(result.raw_response().is_none());

    let json = serde_json::to_value(&result).unwrap();
    assert!(json["usage"]["tokens"].is_null());
}

#[tokio::test(start_paused = true)]
async fn transient_failures_are_retried() {
    let model = ScriptedModel::new(vec![
        Err(unavailable("busy")),
        Err(ModelError::Transport("connection reset".into())),
    ]);
    let options = EmbedOptions::default().with_max_retries(2);

    let result = embed(&model, "hello", &options).await.unwrap();

    assert_eq!(result.embedding(), &[5.0f32]);
    assert_eq!(model.calls().len(), 3);
}

#[tokio::test(start_paused = true)]
async fn exhausted_retries_surface_the_last_error() {
    let model = ScriptedModel::new(vec![
        Err(unavailable("first")),
        Err(unavailable("second")),
        Err(ModelError::Http {
            status: 429,
            body: "third".into(),
        }),
    ]);
    let options = EmbedOptions::default().with_max_retries(2);

    let err = embed(&model, "hello", &options).await.unwrap_err();

    assert_eq!(
        err.into_operation_error(),
        Some(ModelError::Http {
            status: 429,
            body: "third".into()
        })
    );
    assert_eq!(model.calls().len(), 3);
}

#[tokio::test]
async fn client_errors_are_not_retried() {
    let model = ScriptedModel::new(vec![Err(ModelError::Http {
        status: 400,
        body: "bad input".into(),
    })]);
    let options = EmbedOptions::default().with_max_retries(5);

    let err = embed(&model, "hello", &options).await.unwrap_err();

    assert!(matches!(
        err,
        RetryError::Operation(ModelError::Http { status: 400, .. })
    ));
    assert_eq!(model.calls().len(), 1);
}

#[tokio::test]
async fn cancelled_token_skips_the_model() {
    let model = ScriptedModel::default();
    let token = CancellationToken::new();
    token.cancel();

    let err = embed(
        &model,
        "hello",
        &EmbedOptions::default().with_cancellation(token),
    )
    .await
    .unwrap_err();

    assert!(err.is_aborted());
    assert!(model.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn cancel_during_backoff_aborts_without_waiting() {
    let model = ScriptedModel::new(vec![Err(unavailable("busy"))]);
    let token = CancellationToken::new();
    let options = EmbedOptions::default()
        .with_retry(
            RetryConfig::default()
                .with_max_retries(3)
                .with_base_delay(Duration::from_secs(30)),
        )
        .with_cancellation(token.clone());

    let canceller = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        token.cancel();
    });

    let started = tokio::time::Instant::now();
    let err = embed(&model, "hello", &options).await.unwrap_err();
    canceller.await.unwrap();

    assert!(err.is_aborted());
    assert!(started.elapsed() < Duration::from_secs(30));
    assert_eq!(model.calls().len(), 1);
}

#[tokio::test]
async fn headers_reach_the_model() {
    let model = ScriptedModel::default();
    let options = EmbedOptions::default().with_header("authorization", "Bearer secret");

    embed(&model, "hello", &options).await.unwrap();

    let headers = model.calls()[0].headers.clone().unwrap();
    assert_eq!(headers["authorization"], "Bearer secret");
}

#[tokio::test]
async fn shared_model_behind_a_trait_object() {
    let model: Arc<dyn EmbeddingModel<&'static str>> = Arc::new(ScriptedModel::default());

    let result = embed(&model, "four", &EmbedOptions::default()).await.unwrap();

    assert_eq!(result.embedding(), &[4.0f32]);
}

#[tokio::test]
async fn embed_many_chunks_in_order() {
    let model = ScriptedModel::default().with_max_per_call(2);
    let values = vec!["a", "bb", "ccc", "dddd", "eeeee"];

    let result = embed_many(&model, values.clone(), &EmbedOptions::default())
        .await
        .unwrap();

    let batches: Vec<Vec<&str>> = model.calls().into_iter().map(|c| c.values).collect();
    assert_eq!(
        batches,
        vec![vec!["a", "bb"], vec!["ccc", "dddd"], vec!["eeeee"]]
    );
    assert_eq!(result.values(), values.as_slice());
    let expected: Vec<Vec<f32>> = vec![vec![1.0], vec![2.0], vec![3.0], vec![4.0], vec![5.0]];
    assert_eq!(result.embeddings(), expected.as_slice());
    assert_eq!(result.usage(), Usage::tokens(5));

    let pairs = result.into_pairs();
    assert_eq!(pairs[3], ("dddd", vec![4.0]));
}

#[tokio::test]
async fn embed_many_usage_is_nan_if_any_batch_omits_it() {
    let model = ScriptedModel::new(vec![
        Ok(EmbedResponse::new(vec![vec![1.0], vec![2.0]]).with_usage(Usage::tokens(7))),
        Ok(EmbedResponse::new(vec![vec![3.0], vec![4.0]])),
    ])
    .with_max_per_call(2);

    let result = embed_many(&model, vec!["a", "b", "c", "d"], &EmbedOptions::default())
        .await
        .unwrap();

    assert!(result.usage().tokens.is_nan());
    assert_eq!(result.len(), 4);
}

#[tokio::test]
async fn embed_many_stops_at_the_first_failed_batch() {
    let model = ScriptedModel::new(vec![
        Ok(EmbedResponse::new(vec![vec![1.0], vec![2.0]])),
        Err(ModelError::InvalidRequest("rejected".into())),
    ])
    .with_max_per_call(2);

    let err = embed_many(
        &model,
        vec!["a", "b", "c", "d", "e"],
        &EmbedOptions::default(),
    )
    .await
    .unwrap_err();

    assert!(matches!(
        err.operation_error(),
        Some(ModelError::InvalidRequest(_))
    ));
    assert_eq!(model.calls().len(), 2);
}
