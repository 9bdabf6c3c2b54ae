use async_trait::async_trait;
use redis::AsyncCommands;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::JobQueue;
use crate::common::error::QueueError;
use crate::infrastructure::redis::client::RedisService;
use crate::modules::video::events::EncodingJob;

pub const ENCODING_JOBS_QUEUE: &str = "encoding_jobs";

// BRPOP is issued in slices of this length so cancellation is observed between slices
// without ever abandoning an in-flight pop.
const POLL_SLICE: Duration = Duration::from_secs(1);

/// Redis list used as a FIFO: producers `LPUSH`, consumers `BRPOP`.
#[derive(Clone)]
pub struct RedisJobQueue {
    redis: RedisService,
    queue_name: String,
}

impl RedisJobQueue {
    pub fn new(redis: RedisService) -> Self {
        Self::with_name(redis, ENCODING_JOBS_QUEUE)
    }

    pub fn with_name(redis: RedisService, queue_name: impl Into<String>) -> Self {
        Self {
            redis,
            queue_name: queue_name.into(),
        }
    }
}

#[async_trait]
impl JobQueue for RedisJobQueue {
    async fn enqueue(&self, job: &EncodingJob) -> Result<(), QueueError> {
        let payload = serde_json::to_string(job)?;
        let mut conn = self.redis.get_conn().await?;
        let _: i64 = conn.lpush(&self.queue_name, payload).await?;
        debug!(video_id = %job.video_id, "Pushed job to {}", self.queue_name);
        Ok(())
    }

    async fn dequeue_blocking(
        &self,
        timeout: Option<Duration>,
        cancel: &CancellationToken,
    ) -> Result<Option<String>, QueueError> {
        let deadline = timeout.map(|t| Instant::now() + t);
        let mut conn = self.redis.get_conn().await?;

        loop {
            if cancel.is_cancelled() {
                return Ok(None);
            }
            let Some(slice) = next_slice(deadline, Instant::now()) else {
                return Ok(None);
            };

            let popped: Option<(String, String)> = redis::cmd("BRPOP")
                .arg(&self.queue_name)
                .arg(slice.as_secs_f64())
                .query_async(&mut conn)
                .await?;

            if let Some((_, payload)) = popped {
                return Ok(Some(payload));
            }
        }
    }
}

/// Length of the next BRPOP wait, or `None` once the deadline has passed.
fn next_slice(deadline: Option<Instant>, now: Instant) -> Option<Duration> {
    match deadline {
        None => Some(POLL_SLICE),
        Some(deadline) => {
            let remaining = deadline.checked_duration_since(now)?;
            if remaining.is_zero() {
                return None;
            }
            // BRPOP treats 0 as "forever"; never send a sub-millisecond wait.
            Some(remaining.min(POLL_SLICE).max(Duration::from_millis(10)))
        }
    }
}
