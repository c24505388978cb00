use async_trait::async_trait;
use std::time::Duration;

/// Source of backoff waits. Swapped out in tests to observe the schedule
/// without real time passing.
#[async_trait]
pub trait Sleep: Send + Sync {
    async fn sleep(&self, delay: Duration);
}

/// Waits on the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleep;

#[async_trait]
impl Sleep for TokioSleep {
    async fn sleep(&self, delay: Duration) {
        tokio::time::sleep(delay).await;
    }
}

#[async_trait]
impl<S> Sleep for std::sync::Arc<S>
where
    S: Sleep + ?Sized,
{
    async fn sleep(&self, delay: Duration) {
        (**self).sleep(delay).await;
    }
}
