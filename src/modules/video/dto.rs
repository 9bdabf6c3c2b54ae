use serde::Serialize;
use std::path::PathBuf;
use utoipa::ToSchema;
use validator::Validate;

use super::model::{VideoRecord, VideoStatus};

/// A validated-on-ingest upload whose file is already on local disk.
#[derive(Debug, Validate)]
pub struct UploadVideoRequest {
    #[validate(length(min = 1, message = "Title is required"))]
    pub title: String,
    pub description: Option<String>,
    pub staged_file_path: PathBuf,
}

impl UploadVideoRequest {
    pub fn new(title: &str, description: Option<&str>, staged_file_path: PathBuf) -> Self {
        Self {
            title: title.trim().to_string(),
            description: description
                .map(str::trim)
                .filter(|d| !d.is_empty())
                .map(str::to_string),
            staged_file_path,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct VideoResponse {
    pub display_id: String,
    pub title: String,
    pub description: Option<String>,
    pub status: VideoStatus,
    pub thumbnail_path: Option<String>,
    pub stream_manifest_path: Option<String>,
    #[schema(value_type = String, format = DateTime)]
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: time::OffsetDateTime,
}

impl From<VideoRecord> for VideoResponse {
    fn from(video: VideoRecord) -> Self {
        Self {
            display_id: video.display_id,
            title: video.title,
            description: video.description,
            status: video.status,
            thumbnail_path: video.thumbnail_path,
            stream_manifest_path: video.stream_manifest_path,
            created_at: video.created_at,
        }
    }
}
