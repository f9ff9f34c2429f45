//! Application-facing facade over the signer, counter store and ranker.
//!
//! Handlers hold one shared `Arc<AccessGateway>` and never touch the
//! components directly.

use std::sync::Arc;
use std::time::Duration;

use crate::engagement::{
    validate_resource_path, ClientMetadata, PhotoMetrics, RatingEntry, RatingOutcome,
};
use crate::error::CoreError;
use crate::signing::{DenyReason, SignedAccessToken, Signer, Verification, DEFAULT_URL_TTL_SECS};
use crate::store::{EngagementStore, ViewHistory};
use crate::trending::{TrendingEntry, TrendingRanker};
use crate::types::{PhotoId, UserId};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Prefix of every signed URL, e.g. `https://cdn.example.com/media`.
    pub media_base_url: String,
    /// Lifetime of issued URLs.
    pub url_ttl: Duration,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            media_base_url: "http://localhost:3000/media".to_string(),
            url_ttl: Duration::from_secs(DEFAULT_URL_TTL_SECS),
        }
    }
}

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

/// Result of a photo detail fetch.
#[derive(Debug)]
pub struct PhotoView {
    pub photo_id: PhotoId,
    pub token: SignedAccessToken,
    pub signed_url: String,
    /// Snapshot read after the view was recorded. `None` if the store could
    /// not be read.
    pub metrics: Option<PhotoMetrics>,
    /// The viewer's own score from the same snapshot.
    pub user_rating: Option<i32>,
    /// Set when the view could not be recorded. The URL is still usable.
    pub view_error: Option<CoreError>,
}

impl PhotoView {
    pub fn view_recorded(&self) -> bool {
        self.view_error.is_none()
    }
}

/// Verdict for a presented media URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessDecision {
    Allow,
    Deny(DenyReason),
}

impl AccessDecision {
    /// `Ok(())` for `Allow`, `AccessDenied` otherwise.
    pub fn into_result(self) -> Result<(), CoreError> {
        match self {
            AccessDecision::Allow => Ok(()),
            AccessDecision::Deny(reason) => Err(CoreError::AccessDenied(reason)),
        }
    }
}

impl From<Verification> for AccessDecision {
    fn from(verification: Verification) -> Self {
        match verification {
            Verification::Valid => AccessDecision::Allow,
            Verification::Expired => AccessDecision::Deny(DenyReason::Expired),
            Verification::Invalid => AccessDecision::Deny(DenyReason::Invalid),
        }
    }
}

// ---------------------------------------------------------------------------
// Gateway
// ---------------------------------------------------------------------------

pub struct AccessGateway {
    signer: Arc<Signer>,
    store: Arc<dyn EngagementStore>,
    ranker: TrendingRanker,
    config: GatewayConfig,
}

impl AccessGateway {
    pub fn new(
        signer: Arc<Signer>,
        store: Arc<dyn EngagementStore>,
        history: Arc<dyn ViewHistory>,
        config: GatewayConfig,
    ) -> Self {
        Self {
            signer,
            store,
            ranker: TrendingRanker::new(history),
            config,
        }
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Sign a URL for the photo, record the view and return a fresh snapshot
    /// including the viewer's own score.
    ///
    /// Unknown photos fail with `NotFound` before anything is signed. Storage
    /// failures while recording are carried in [`PhotoView::view_error`].
    pub async fn view_photo(
        &self,
        photo_id: PhotoId,
        viewer_id: Option<UserId>,
        metadata: ClientMetadata,
    ) -> Result<PhotoView, CoreError> {
        let current = self.store.get_metrics(photo_id).await?;

        let token = self.signer.issue(&current.resource_path, self.config.url_ttl);
        let signed_url = token.to_url(&self.config.media_base_url);

        let view_error = match self.store.record_view(photo_id, viewer_id, metadata).await {
            Ok(view_count) => {
                tracing::debug!(%photo_id, ?viewer_id, view_count, "Photo viewed");
                None
            }
            Err(e @ (CoreError::NotFound { .. } | CoreError::Validation(_))) => return Err(e),
            Err(e) => {
                tracing::warn!(%photo_id, error = %e, "Failed to record photo view");
                Some(e)
            }
        };

        let (metrics, user_rating) = match self.store.get_snapshot(photo_id, viewer_id).await {
            Ok(snapshot) => (Some(snapshot.metrics), snapshot.user_rating),
            Err(e) => {
                tracing::warn!(%photo_id, error = %e, "Failed to read metrics after view");
                (None, None)
            }
        };

        Ok(PhotoView {
            photo_id,
            token,
            signed_url,
            metrics,
            user_rating,
            view_error,
        })
    }

    pub async fn submit_rating(
        &self,
        photo_id: PhotoId,
        user_id: UserId,
        score: i32,
    ) -> Result<RatingOutcome, CoreError> {
        let outcome = self.store.upsert_rating(photo_id, user_id, score).await?;
        tracing::info!(
            %photo_id,
            user_id,
            score,
            was_new = outcome.was_new,
            average_rating = outcome.average_rating,
            "Rating submitted"
        );
        Ok(outcome)
    }

    pub async fn get_trending(
        &self,
        window: Duration,
        limit: usize,
    ) -> Result<Vec<TrendingEntry>, CoreError> {
        self.ranker.trending(window, limit).await
    }

    /// Check a presented media URL. Never touches storage.
    pub fn resolve_access(
        &self,
        resource_path: &str,
        expires_at: i64,
        signature: &str,
        key_id: Option<&str>,
    ) -> AccessDecision {
        let decision: AccessDecision = self
            .signer
            .verify(resource_path, expires_at, signature, key_id)
            .into();
        if let AccessDecision::Deny(reason) = decision {
            tracing::debug!(resource_path, reason = reason.as_str(), "Media access denied");
        }
        decision
    }

    // ---- Store pass-throughs ----

    pub async fn register_photo(
        &self,
        photo_id: PhotoId,
        resource_path: &str,
    ) -> Result<PhotoMetrics, CoreError> {
        validate_resource_path(resource_path)?;
        let metrics = self.store.register_photo(photo_id, resource_path).await?;
        tracing::info!(%photo_id, resource_path, "Photo registered");
        Ok(metrics)
    }

    pub async fn remove_photo(&self, photo_id: PhotoId) -> Result<bool, CoreError> {
        let removed = self.store.remove_photo(photo_id).await?;
        if removed {
            tracing::info!(%photo_id, "Photo removed");
        }
        Ok(removed)
    }

    pub async fn get_metrics(&self, photo_id: PhotoId) -> Result<PhotoMetrics, CoreError> {
        self.store.get_metrics(photo_id).await
    }

    pub async fn list_ratings(&self, photo_id: PhotoId) -> Result<Vec<RatingEntry>, CoreError> {
        self.store.list_ratings(photo_id).await
    }

    /// Whether the backing store answers.
    pub async fn ping(&self) -> Result<(), CoreError> {
        self.store.ping().await
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
