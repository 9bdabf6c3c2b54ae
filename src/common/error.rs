use thiserror::Error;
use uuid::Uuid;

use crate::modules::video::model::VideoStatus;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Video not found: {0}")]
    NotFound(Uuid),

    #[error("Video {id} is {current} and cannot move to {target}")]
    InvalidTransition {
        id: Uuid,
        current: VideoStatus,
        target: VideoStatus,
    },

    #[error("Unknown video status: {0}")]
    UnknownStatus(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Queue unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Error)]
pub enum CounterError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Failed to recover sequence from store: {0}")]
    Recovery(#[from] StoreError),

    #[error("Counter unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("Invalid upload: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("Identifier generation failed: {0}")]
    Identifier(#[from] CounterError),

    #[error("Failed to persist video: {0}")]
    Store(#[from] StoreError),

    #[error("Failed to enqueue encoding job: {0}")]
    Queue(#[from] QueueError),
}
