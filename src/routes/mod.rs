//! Router assembly.

mod common;
mod entity;
pub use common::common_routes;
pub use entity::entity_routes;

use crate::handlers::app_info;
use crate::handlers::media::MEDIA_URL_PREFIX;
use crate::state::AppState;
use axum::extract::DefaultBodyLimit;
use axum::{routing::get, Router};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

/// Every route of the service, with request tracing and the upload body cap.
pub fn app_router(state: AppState) -> Router {
    let max_upload = state.settings.max_upload_bytes;
    let media = ServeDir::new(&state.settings.media_dir);
    Router::new()
        .merge(common_routes())
        .route("/app/info", get(app_info))
        .merge(entity_routes())
        .nest_service(MEDIA_URL_PREFIX, media)
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(max_upload))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
