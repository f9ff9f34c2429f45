//! Handlers for photo registration, views, ratings and trending.

use std::time::Duration;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use photoshare_core::engagement::RatingEntry;
use photoshare_core::error::CoreError;
use photoshare_core::trending::{DEFAULT_LIMIT, DEFAULT_WINDOW};
use photoshare_core::types::{PhotoId, Timestamp};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::AppResult;
use crate::middleware::identity::{AuthUser, ClientInfo, Viewer};
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response DTOs
// ---------------------------------------------------------------------------

/// Body of `POST /api/v1/photos`.
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterPhotoRequest {
    pub photo_id: PhotoId,
    #[validate(length(min = 1, max = 500))]
    pub resource_path: String,
}

/// Body of `POST /api/v1/photos/{photo_id}/ratings`.
#[derive(Debug, Deserialize)]
pub struct SubmitRatingRequest {
    pub score: i32,
}

/// Query of `GET /api/v1/photos/trending`.
#[derive(Debug, Deserialize)]
pub struct TrendingParams {
    pub window_secs: Option<u64>,
    pub limit: Option<usize>,
}

/// A photo detail fetch: the signed URL plus a metrics snapshot.
///
/// Metric fields are `null` when the snapshot could not be read.
#[derive(Debug, Serialize)]
pub struct PhotoViewResponse {
    pub photo_id: PhotoId,
    pub url: String,
    pub url_expires_at: Timestamp,
    pub view_count: Option<i64>,
    pub average_rating: Option<f64>,
    pub rating_count: Option<i64>,
    /// The caller's own score, `null` for anonymous or non-rating callers.
    pub user_rating: Option<i32>,
    pub view_recorded: bool,
    pub view_error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RatingResponse {
    pub average_rating: f64,
    pub was_new: bool,
    pub rating_count: i64,
}

#[derive(Debug, Serialize)]
pub struct RatingStatistics {
    pub average: f64,
    pub count: i64,
}

#[derive(Debug, Serialize)]
pub struct RatingListResponse {
    pub statistics: RatingStatistics,
    pub ratings: Vec<RatingEntry>,
}

/// Parse a photo id path segment, rejecting malformed ids before any store access.
fn parse_photo_id(raw: &str) -> Result<PhotoId, CoreError> {
    raw.parse()
        .map_err(|_| CoreError::Validation(format!("Invalid photo id '{raw}'")))
}

// ---------------------------------------------------------------------------
// Registration
// ---------------------------------------------------------------------------

/// POST /api/v1/photos
///
/// Bring a photo into scope with zeroed metrics. Idempotent.
pub async fn register_photo(
    State(state): State<AppState>,
    Json(input): Json<RegisterPhotoRequest>,
) -> AppResult<impl IntoResponse> {
    input.validate()?;

    let metrics = state
        .gateway
        .register_photo(input.photo_id, &input.resource_path)
        .await?;

    Ok((StatusCode::CREATED, Json(DataResponse { data: metrics })))
}

/// DELETE /api/v1/photos/{photo_id}
pub async fn remove_photo(
    State(state): State<AppState>,
    Path(photo_id): Path<String>,
) -> AppResult<StatusCode> {
    let photo_id = parse_photo_id(&photo_id)?;

    if state.gateway.remove_photo(photo_id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(CoreError::photo_not_found(photo_id).into())
    }
}

// ---------------------------------------------------------------------------
// Views and metrics
// ---------------------------------------------------------------------------

/// GET /api/v1/photos/{photo_id}
///
/// Issue a signed media URL and record one view. An `x-user-id` caller also
/// gets their own score back. A failed view write still returns the URL with
/// `view_recorded: false`.
pub async fn view_photo(
    State(state): State<AppState>,
    Path(photo_id): Path<String>,
    Viewer(viewer_id): Viewer,
    ClientInfo(metadata): ClientInfo,
) -> AppResult<impl IntoResponse> {
    let photo_id = parse_photo_id(&photo_id)?;

    let view = state
        .gateway
        .view_photo(photo_id, viewer_id, metadata)
        .await?;

    let view_error = view.view_error.as_ref().map(|e| match e {
        CoreError::StorageUnavailable(_) => "Storage is temporarily unavailable".to_string(),
        _ => "View could not be recorded".to_string(),
    });

    let response = PhotoViewResponse {
        photo_id: view.photo_id,
        url: view.signed_url.clone(),
        url_expires_at: view.token.expires_at_time(),
        view_count: view.metrics.as_ref().map(|m| m.view_count),
        average_rating: view.metrics.as_ref().map(|m| m.average_rating),
        rating_count: view.metrics.as_ref().map(|m| m.rating_count),
        user_rating: view.user_rating,
        view_recorded: view.view_recorded(),
        view_error,
    };

    Ok(Json(DataResponse { data: response }))
}

/// GET /api/v1/photos/{photo_id}/metrics
///
/// Metrics snapshot without recording a view.
pub async fn get_metrics(
    State(state): State<AppState>,
    Path(photo_id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let photo_id = parse_photo_id(&photo_id)?;
    let metrics = state.gateway.get_metrics(photo_id).await?;
    Ok(Json(DataResponse { data: metrics }))
}

// ---------------------------------------------------------------------------
// Ratings
// ---------------------------------------------------------------------------

/// POST /api/v1/photos/{photo_id}/ratings
///
/// Create or replace the caller's rating. 201 for a first rating, 200 for a
/// replacement.
pub async fn submit_rating(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(photo_id): Path<String>,
    Json(input): Json<SubmitRatingRequest>,
) -> AppResult<impl IntoResponse> {
    let photo_id = parse_photo_id(&photo_id)?;

    let outcome = state
        .gateway
        .submit_rating(photo_id, auth.user_id, input.score)
        .await?;

    let status = if outcome.was_new {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    let response = RatingResponse {
        average_rating: outcome.average_rating,
        was_new: outcome.was_new,
        rating_count: outcome.metrics.rating_count,
    };

    Ok((status, Json(DataResponse { data: response })))
}

/// GET /api/v1/photos/{photo_id}/ratings
///
/// Ratings newest first, with statistics from the metrics aggregate.
pub async fn list_ratings(
    State(state): State<AppState>,
    Path(photo_id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let photo_id = parse_photo_id(&photo_id)?;
    let ratings = state.gateway.list_ratings(photo_id).await?;
    let metrics = state.gateway.get_metrics(photo_id).await?;

    let statistics = RatingStatistics {
        average: metrics.average_rating,
        count: metrics.rating_count,
    };

    Ok(Json(DataResponse {
        data: RatingListResponse {
            statistics,
            ratings,
        },
    }))
}

// ---------------------------------------------------------------------------
// Trending
// ---------------------------------------------------------------------------

/// GET /api/v1/photos/trending?window_secs=&limit=
///
/// Defaults to the last 7 days and 20 photos.
pub async fn trending(
    State(state): State<AppState>,
    Query(params): Query<TrendingParams>,
) -> AppResult<impl IntoResponse> {
    let window = params
        .window_secs
        .map(Duration::from_secs)
        .unwrap_or(DEFAULT_WINDOW);
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT);

    let entries = state.gateway.get_trending(window, limit).await?;
    Ok(Json(DataResponse { data: entries }))
}
