use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::model::{DISPLAY_ID_PREFIX, Finalization, NewVideo, VideoRecord, VideoStatus};
use crate::common::error::StoreError;

/// Record store shared by ingestion (insert) and workers (finalize).
#[async_trait]
pub trait VideoStore: Send + Sync {
    async fn insert(&self, video: &NewVideo) -> Result<VideoRecord, StoreError>;

    /// Moves a `processing` record to its terminal state. Terminal records are never touched.
    async fn finalize(&self, id: Uuid, finalization: &Finalization) -> Result<(), StoreError>;

    async fn list_active(&self) -> Result<Vec<VideoRecord>, StoreError>;

    async fn find_active_by_display_id(
        &self,
        display_id: &str,
    ) -> Result<Option<VideoRecord>, StoreError>;

    /// Largest numeric display-id suffix ever assigned, 0 for an empty store.
    async fn max_display_sequence(&self) -> Result<i64, StoreError>;
}

#[derive(Clone)]
pub struct VideoRepository {
    pool: PgPool,
}

impl VideoRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn find_status(&self, id: Uuid) -> Result<Option<VideoStatus>, StoreError> {
        let status: Option<String> =
            sqlx::query_scalar("SELECT status FROM videos WHERE uuid = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        status.map(VideoStatus::try_from).transpose()
    }
}

#[async_trait]
impl VideoStore for VideoRepository {
    async fn insert(&self, video: &NewVideo) -> Result<VideoRecord, StoreError> {
        let record = sqlx::query_as::<_, VideoRecord>(
            r#"
            INSERT INTO videos (uuid, display_id, title, description, status)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(video.id)
        .bind(&video.display_id)
        .bind(&video.title)
        .bind(&video.description)
        .bind(VideoStatus::Processing.as_str())
        .fetch_one(&self.pool)
        .await?;

        Ok(record)
    }

    async fn finalize(&self, id: Uuid, finalization: &Finalization) -> Result<(), StoreError> {
        let result = match finalization {
            Finalization::Active {
                thumbnail_path,
                stream_manifest_path,
            } => {
                sqlx::query(
                    r#"
                    UPDATE videos
                    SET status = $1, thumbnail_path = $2, stream_manifest_path = $3
                    WHERE uuid = $4 AND status = $5
                    "#,
                )
                .bind(VideoStatus::Active.as_str())
                .bind(thumbnail_path)
                .bind(stream_manifest_path)
                .bind(id)
                .bind(VideoStatus::Processing.as_str())
                .execute(&self.pool)
                .await?
            }
            Finalization::Failed => {
                sqlx::query("UPDATE videos SET status = $1 WHERE uuid = $2 AND status = $3")
                    .bind(VideoStatus::Failed.as_str())
                    .bind(id)
                    .bind(VideoStatus::Processing.as_str())
                    .execute(&self.pool)
                    .await?
            }
        };

        if result.rows_affected() == 0 {
            // Distinguish a missing record from one that already left `processing`.
            let Some(current) = self.find_status(id).await? else {
                return Err(StoreError::NotFound(id));
            };
            current.transition(id, finalization.target_status())?;
            return Err(StoreError::Unavailable(format!(
                "video {} changed while being finalized",
                id
            )));
        }

        Ok(())
    }

    async fn list_active(&self) -> Result<Vec<VideoRecord>, StoreError> {
        let videos = sqlx::query_as::<_, VideoRecord>(
            "SELECT * FROM videos WHERE status = $1 ORDER BY created_at DESC",
        )
        .bind(VideoStatus::Active.as_str())
        .fetch_all(&self.pool)
        .await?;
        Ok(videos)
    }

    async fn find_active_by_display_id(
        &self,
        display_id: &str,
    ) -> Result<Option<VideoRecord>, StoreError> {
        let video = sqlx::query_as::<_, VideoRecord>(
            "SELECT * FROM videos WHERE display_id = $1 AND status = $2",
        )
        .bind(display_id)
        .bind(VideoStatus::Active.as_str())
        .fetch_optional(&self.pool)
        .await?;
        Ok(video)
    }

    async fn max_display_sequence(&self) -> Result<i64, StoreError> {
        // Only `tm<digits>` ids are considered.
        let max: i64 = sqlx::query_scalar(
            r#"
            SELECT COALESCE(MAX(CAST(SUBSTRING(display_id FROM $1) AS BIGINT)), 0)::BIGINT
            FROM videos
            WHERE display_id ~ $2
            "#,
        )
        .bind(DISPLAY_ID_PREFIX.len() as i32 + 1)
        .bind(format!("^{}[0-9]+$", DISPLAY_ID_PREFIX))
        .fetch_one(&self.pool)
        .await?;
        Ok(max)
    }
}
