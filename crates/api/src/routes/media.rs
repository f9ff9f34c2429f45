use axum::routing::get;
use axum::Router;

use crate::handlers::media;
use crate::state::AppState;

/// Mount the media access check (root level, NOT under `/api/v1`).
pub fn router() -> Router<AppState> {
    Router::new().route("/media/{*resource_path}", get(media::resolve_media))
}
