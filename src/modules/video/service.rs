use tracing::{error, info};
use validator::Validate;

use super::dto::{UploadVideoRequest, VideoResponse};
use super::events::EncodingJob;
use super::model::NewVideo;
use crate::common::error::{IngestError, StoreError};
use crate::common::upload::discard_staged_file;
use crate::state::AppState;

pub struct VideoService;

impl VideoService {
    /// Records the upload in `processing` and hands its staged file to the worker pool.
    ///
    /// Validation runs before an identifier is drawn, so a rejected upload consumes no
    /// display id. Until the job is enqueued the staged file still belongs to ingestion and
    /// is deleted on any failure. Insert and enqueue are not atomic: if enqueue fails the
    /// record remains in `processing` with no job.
    pub async fn ingest(
        state: &AppState,
        req: UploadVideoRequest,
    ) -> Result<VideoResponse, IngestError> {
        match Self::ingest_inner(state, &req).await {
            Ok(video) => Ok(video),
            Err(e) => {
                discard_staged_file(&req.staged_file_path).await;
                Err(e)
            }
        }
    }

    async fn ingest_inner(
        state: &AppState,
        req: &UploadVideoRequest,
    ) -> Result<VideoResponse, IngestError> {
        req.validate()?;

        let generated = state.generator.next().await?;
        let video = state
            .store
            .insert(&NewVideo {
                id: generated.id,
                display_id: generated.display_id,
                title: req.title.clone(),
                description: req.description.clone(),
            })
            .await?;

        let job = EncodingJob {
            video_id: video.id,
            staged_file_path: req.staged_file_path.clone(),
        };
        if let Err(e) = state.queue.enqueue(&job).await {
            error!(
                video_id = %video.id,
                display_id = %video.display_id,
                "Record created but job not enqueued: {}", e
            );
            return Err(e.into());
        }

        info!(video_id = %video.id, display_id = %video.display_id, "Queued encoding job");
        Ok(video.into())
    }

    pub async fn list_active(state: &AppState) -> Result<Vec<VideoResponse>, StoreError> {
        let videos = state.store.list_active().await?;
        Ok(videos.into_iter().map(VideoResponse::from).collect())
    }

    pub async fn get_active(
        state: &AppState,
        display_id: &str,
    ) -> Result<Option<VideoResponse>, StoreError> {
        let video = state.store.find_active_by_display_id(display_id).await?;
        Ok(video.map(VideoResponse::from))
    }
}
