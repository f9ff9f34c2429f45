//! Caller identity and client metadata extractors.
//!
//! Authentication happens upstream. The gateway in front of this service
//! forwards the authenticated user's id in `X-User-Id`; no header means an
//! anonymous caller.

use std::convert::Infallible;
use std::net::SocketAddr;

use axum::extract::{ConnectInfo, FromRequestParts};
use axum::http::header::USER_AGENT;
use axum::http::request::Parts;
use photoshare_core::engagement::ClientMetadata;
use photoshare_core::types::UserId;

use crate::error::AppError;

/// Header carrying the upstream-authenticated user id.
pub const USER_ID_HEADER: &str = "x-user-id";

/// Header carrying the proxy chain; the first entry is the client.
pub const FORWARDED_FOR_HEADER: &str = "x-forwarded-for";

fn user_id_from_parts(parts: &Parts) -> Option<UserId> {
    parts
        .headers
        .get(USER_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok())
}

/// The caller's user id when present. Never rejects.
#[derive(Debug, Clone, Copy)]
pub struct Viewer(pub Option<UserId>);

impl<S> FromRequestParts<S> for Viewer
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Viewer(user_id_from_parts(parts)))
    }
}

/// An identified caller. Rejects with 401 when `X-User-Id` is missing or malformed.
///
/// ```ignore
/// async fn my_handler(user: AuthUser) -> AppResult<Json<()>> {
///     tracing::info!(user_id = user.user_id, "handling request");
///     Ok(Json(()))
/// }
/// ```
#[derive(Debug, Clone, Copy)]
pub struct AuthUser {
    pub user_id: UserId,
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        user_id_from_parts(parts)
            .map(|user_id| AuthUser { user_id })
            .ok_or_else(|| AppError::Unauthorized(format!("Missing or invalid {USER_ID_HEADER} header")))
    }
}

/// Client IP and user agent recorded with each view.
///
/// The IP comes from the first `X-Forwarded-For` entry, falling back to the
/// socket peer address when the server was started with connect info.
#[derive(Debug, Clone)]
pub struct ClientInfo(pub ClientMetadata);

impl<S> FromRequestParts<S> for ClientInfo
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let forwarded = parts
            .headers
            .get(FORWARDED_FOR_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|ip| !ip.is_empty())
            .map(str::to_string);

        let ip_address = forwarded.or_else(|| {
            parts
                .extensions
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| addr.ip().to_string())
        });

        let user_agent = parts
            .headers
            .get(USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();

        Ok(ClientInfo(ClientMetadata::new(ip_address, user_agent)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    async fn extract<T>(request: Request<()>) -> T
    where
        T: FromRequestParts<()>,
        T::Rejection: std::fmt::Debug,
    {
        let (mut parts, ()) = request.into_parts();
        T::from_request_parts(&mut parts, &()).await.unwrap()
    }

    #[tokio::test]
    async fn viewer_reads_user_id_header() {
        let request = Request::builder().header(USER_ID_HEADER, "42").body(()).unwrap();
        let Viewer(user) = extract(request).await;
        assert_eq!(user, Some(42));
    }

    #[tokio::test]
    async fn malformed_user_id_is_anonymous() {
        let request = Request::builder().header(USER_ID_HEADER, "abc").body(()).unwrap();
        let Viewer(user) = extract(request).await;
        assert_eq!(user, None);
    }

    #[tokio::test]
    async fn auth_user_requires_header() {
        let (mut parts, ()) = Request::builder().body(()).unwrap().into_parts();
        let result = AuthUser::from_request_parts(&mut parts, &()).await;
        assert!(matches!(result, Err(AppError::Unauthorized(_))));
    }

    #[tokio::test]
    async fn client_info_uses_first_forwarded_address() {
        let request = Request::builder()
            .header(FORWARDED_FOR_HEADER, "203.0.113.7, 10.0.0.1")
            .header(USER_AGENT, "curl/8.0")
            .body(())
            .unwrap();
        let ClientInfo(meta) = extract(request).await;
        assert_eq!(meta.ip_address.as_deref(), Some("203.0.113.7"));
        assert_eq!(meta.user_agent, "curl/8.0");
    }

    #[tokio::test]
    async fn client_info_without_headers_is_empty() {
        let ClientInfo(meta) = extract(Request::builder().body(()).unwrap()).await;
        assert_eq!(meta, ClientMetadata::default());
    }
}
