use async_trait::async_trait;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::common::error::QueueError;
use crate::modules::video::events::EncodingJob;

pub mod redis_list;

pub use redis_list::RedisJobQueue;

/// Durable FIFO between ingestion and workers. A popped payload belongs to exactly one caller
/// and is never redelivered.
#[async_trait]
pub trait JobQueue: Send + Sync {
    async fn enqueue(&self, job: &EncodingJob) -> Result<(), QueueError>;

    /// Pops the oldest raw payload, waiting up to `timeout` (`None` waits forever).
    ///
    /// Returns `Ok(None)` when the timeout elapses or `cancel` fires before a job arrives.
    /// Payloads are returned undecoded so a malformed message can be discarded by the consumer.
    async fn dequeue_blocking(
        &self,
        timeout: Option<Duration>,
        cancel: &CancellationToken,
    ) -> Result<Option<String>, QueueError>;
}
