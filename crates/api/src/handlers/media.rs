//! Media access check, called when a signed URL is presented.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use photoshare_core::error::CoreError;
use photoshare_core::signing::DenyReason;
use serde::Deserialize;

use crate::error::AppResult;
use crate::state::AppState;

/// Signed URL query parameters. Kept as strings so malformed values are
/// denied as `invalid` instead of failing extraction.
#[derive(Debug, Deserialize)]
pub struct MediaAccessParams {
    pub expires: Option<String>,
    pub sig: Option<String>,
    pub kid: Option<String>,
}

/// GET /media/{*resource_path}?expires=&sig=&kid=
///
/// 204 when the URL is authentic and unexpired, 403 `ACCESS_DENIED` otherwise.
/// Serving the bytes is left to the object store in front of this check.
pub async fn resolve_media(
    State(state): State<AppState>,
    Path(resource_path): Path<String>,
    Query(params): Query<MediaAccessParams>,
) -> AppResult<StatusCode> {
    let expires_at = params.expires.as_deref().and_then(|e| e.parse::<i64>().ok());
    let (Some(expires_at), Some(signature)) = (expires_at, params.sig.as_deref()) else {
        tracing::debug!(%resource_path, "Media request without a usable signature");
        return Err(CoreError::AccessDenied(DenyReason::Invalid).into());
    };

    state
        .gateway
        .resolve_access(&resource_path, expires_at, signature, params.kid.as_deref())
        .into_result()?;

    Ok(StatusCode::NO_CONTENT)
}
