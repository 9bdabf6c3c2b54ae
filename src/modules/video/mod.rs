use axum::Router;
use axum::routing::get;
use crate::state::AppState;

pub mod dto;
pub mod events;
pub mod handler;
pub mod identifier;
pub mod model;
pub mod repository;
pub mod service;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/videos", get(handler::list_videos).post(handler::upload_video))
        .route("/videos/{display_id}", get(handler::get_video))
}
