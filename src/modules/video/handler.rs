use axum::{
    extract::{Multipart, Path, State},
    response::IntoResponse,
};
use std::path::PathBuf;
use tracing::{error, info};
use uuid::Uuid;

use super::dto::{UploadVideoRequest, VideoResponse};
use super::service::VideoService;
use crate::common::error::IngestError;
use crate::common::response::{ApiError, ApiResponse, ApiSuccess};
use crate::common::upload::{discard_staged_file, stream_to_staging};
use crate::state::AppState;

#[utoipa::path(
    get,
    path = "/api/v1/videos",
    responses(
        (
            status = 200,
            description = "Active videos, newest first",
            body = ApiResponse<Vec<VideoResponse>>
        ),
        (status = 500, description = "Internal Server Error")
    ),
    tag = "Videos"
)]
pub async fn list_videos(State(state): State<AppState>) -> impl IntoResponse {
    match VideoService::list_active(&state).await {
        Ok(res) => ApiSuccess::ok(res, "Videos retrieved successfully").into_response(),
        Err(e) => {
            error!("Failed to list videos: {}", e);
            ApiError::internal().into_response()
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/v1/videos/{display_id}",
    params(
        ("display_id" = String, Path, description = "Display ID, e.g. tm1")
    ),
    responses(
        (status = 200, description = "Get Video", body = ApiResponse<VideoResponse>),
        (status = 404, description = "Video Not Found"),
        (status = 500, description = "Internal Server Error")
    ),
    tag = "Videos"
)]
pub async fn get_video(
    State(state): State<AppState>,
    Path(display_id): Path<String>,
) -> impl IntoResponse {
    match VideoService::get_active(&state, &display_id).await {
        Ok(Some(res)) => ApiSuccess::ok(res, "Video retrieved successfully").into_response(),
        Ok(None) => ApiError::not_found("Video not found").into_response(),
        Err(e) => {
            error!("Failed to load video {}: {}", display_id, e);
            ApiError::internal().into_response()
        }
    }
}

/// Upload Video
/// Stages the file locally and queues it for encoding
#[utoipa::path(
    post,
    path = "/api/v1/videos",
    request_body(content = String, content_type = "multipart/form-data"),
    responses(
        (status = 202, description = "Upload accepted", body = ApiResponse<VideoResponse>),
        (status = 400, description = "Bad Request"),
        (status = 500, description = "Internal Server Error")
    ),
    tag = "Videos"
)]
pub async fn upload_video(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> impl IntoResponse {
    let mut title = String::new();
    let mut description: Option<String> = None;
    let mut staged: Option<PathBuf> = None;

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => {
                discard(staged.as_deref()).await;
                return ApiError::bad_request(format!("Malformed upload: {}", e)).into_response();
            }
        };

        let name = field.name().unwrap_or("").to_string();
        let read = match name.as_str() {
            "title" => field.text().await.map(|t| title = t),
            "description" => field.text().await.map(|d| description = Some(d)),
            "video" if staged.is_none() => {
                let dest = state.config.media.staged_file(Uuid::new_v4());
                match stream_to_staging(field, &dest).await {
                    Ok(_) => {
                        staged = Some(dest);
                        Ok(())
                    }
                    Err(e) => {
                        discard(staged.as_deref()).await;
                        return ApiError::bad_request(format!("Upload failed: {}", e))
                            .into_response();
                    }
                }
            }
            _ => Ok(()),
        };

        if let Err(e) = read {
            discard(staged.as_deref()).await;
            return ApiError::bad_request(format!("Malformed upload: {}", e)).into_response();
        }
    }

    let Some(staged_file_path) = staged else {
        return ApiError::bad_request("No video field found in multipart request").into_response();
    };

    let req = UploadVideoRequest::new(&title, description.as_deref(), staged_file_path);
    match VideoService::ingest(&state, req).await {
        Ok(res) => {
            info!("Upload accepted as {}", res.display_id);
            ApiSuccess::accepted(res, "Upload accepted. Encoding may take a few minutes.")
                .into_response()
        }
        Err(IngestError::Validation(e)) => {
            ApiError::bad_request(validation_message(&e)).into_response()
        }
        Err(e) => {
            error!("Ingestion failed: {}", e);
            ApiError::internal().into_response()
        }
    }
}

async fn discard(staged: Option<&std::path::Path>) {
    if let Some(path) = staged {
        discard_staged_file(path).await;
    }
}

/// First validator message, falling back to the field name.
fn validation_message(errors: &validator::ValidationErrors) -> String {
    errors
        .field_errors()
        .into_iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |err| {
                err.message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("Invalid {}", field))
            })
        })
        .next()
        .unwrap_or_else(|| "Invalid request".to_string())
}
