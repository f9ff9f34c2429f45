//! Route definitions for photo engagement, mounted at `/photos`.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::photos;
use crate::state::AppState;

/// ```text
/// POST   /                        -> register_photo
/// GET    /trending                -> trending
/// GET    /{photo_id}              -> view_photo (records a view)
/// DELETE /{photo_id}              -> remove_photo
/// GET    /{photo_id}/metrics      -> get_metrics
/// GET    /{photo_id}/ratings      -> list_ratings
/// POST   /{photo_id}/ratings      -> submit_rating
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(photos::register_photo))
        .route("/trending", get(photos::trending))
        .route(
            "/{photo_id}",
            get(photos::view_photo).delete(photos::remove_photo),
        )
        .route("/{photo_id}/metrics", get(photos::get_metrics))
        .route(
            "/{photo_id}/ratings",
            get(photos::list_ratings).post(photos::submit_rating),
        )
}
