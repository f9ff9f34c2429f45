pub mod health;
pub mod media;
pub mod photos;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// ```text
/// /photos    photo registration, views, ratings, trending
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new().nest("/photos", photos::router())
}
