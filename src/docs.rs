use utoipa::OpenApi;
use crate::modules::video::dto::VideoResponse;
use crate::modules::video::model::VideoStatus;

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::modules::video::handler::list_videos,
        crate::modules::video::handler::get_video,
        crate::modules::video::handler::upload_video,
    ),
    components(
        schemas(VideoResponse, VideoStatus)
    ),
    tags(
        (name = "Videos", description = "Upload and catalogue of encoded videos")
    )
)]
pub struct ApiDoc;
