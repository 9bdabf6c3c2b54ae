use async_trait::async_trait;
use redis::AsyncCommands;

use super::client::RedisService;
use crate::common::error::CounterError;
use crate::modules::video::identifier::SequenceCounter;

pub const VIDEO_COUNTER_KEY: &str = "video_counter";

/// Durable integer counter backed by a single Redis key.
#[derive(Clone)]
pub struct RedisCounter {
    redis: RedisService,
    key: String,
}

impl RedisCounter {
    pub fn new(redis: RedisService) -> Self {
        Self::with_key(redis, VIDEO_COUNTER_KEY)
    }

    pub fn with_key(redis: RedisService, key: impl Into<String>) -> Self {
        Self {
            redis,
            key: key.into(),
        }
    }
}

#[async_trait]
impl SequenceCounter for RedisCounter {
    async fn exists(&self) -> Result<bool, CounterError> {
        let mut conn = self.redis.get_conn().await?;
        let exists: bool = conn.exists(&self.key).await?;
        Ok(exists)
    }

    async fn seed_if_absent(&self, value: i64) -> Result<bool, CounterError> {
        let mut conn = self.redis.get_conn().await?;
        let seeded: bool = conn.set_nx(&self.key, value).await?;
        Ok(seeded)
    }

    async fn increment(&self) -> Result<i64, CounterError> {
        let mut conn = self.redis.get_conn().await?;
        let next: i64 = conn.incr(&self.key, 1).await?;
        Ok(next)
    }
}
