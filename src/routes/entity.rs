//! Resource routes built on parameterized paths; handlers resolve the resource from the
//! catalog by path segment.

use crate::handlers::entity::{create, delete, list, nested_list, patch, read, replace};
use crate::handlers::media::{upload, MEDIA_RESOURCE};
use crate::state::AppState;
use axum::{routing::get, routing::post, Router};

pub fn entity_routes() -> Router<AppState> {
    Router::new()
        .route(&format!("/{}", MEDIA_RESOURCE), post(upload))
        .route("/:path_segment", get(list).post(create))
        .route(
            "/:path_segment/:id",
            get(read).put(replace).patch(patch).delete(delete),
        )
        .route("/:path_segment/:id/:nested", get(nested_list))
}
