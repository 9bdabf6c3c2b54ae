use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;
use crate::docs::ApiDoc;
use axum::Router;
use axum::extract::DefaultBodyLimit;
use crate::config::settings::{STREAMS_DIR, THUMBNAILS_DIR};
use crate::state::AppState;

use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::services::ServeDir;

pub fn configure_routes(state: &AppState) -> Router<AppState> {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let media = &state.config.media;

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .nest("/api/v1", api_routes(state.config.max_upload_bytes))
        .nest_service(&format!("/{}", THUMBNAILS_DIR), ServeDir::new(media.thumbnails_root()))
        .nest_service(&format!("/{}", STREAMS_DIR), ServeDir::new(media.streams_root()))
        .layer(cors)
}

fn api_routes(max_upload_bytes: usize) -> Router<AppState> {
    Router::new()
        .route("/health", axum::routing::get(|| async { "ok" }))
        .merge(crate::modules::video::router())
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(RequestBodyLimitLayer::new(max_upload_bytes))
}
