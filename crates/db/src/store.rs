//! `EngagementStore` backed by PostgreSQL.
//!
//! Each mutation runs in one transaction. The `photo_metrics` row lock
//! serializes writers per photo; a dropped future rolls its transaction back.

use async_trait::async_trait;
use photoshare_core::engagement::{
    validate_resource_path, validate_score, ClientMetadata, PhotoMetrics, PhotoSnapshot,
    RatingEntry, RatingOutcome,
};
use photoshare_core::error::CoreError;
use photoshare_core::store::{EngagementStore, ViewHistory};
use photoshare_core::types::{PhotoId, Timestamp, UserId};

use crate::repositories::{PhotoMetricsRepo, PhotoRatingRepo, PhotoViewRepo};
use crate::DbPool;

#[derive(Debug, Clone)]
pub struct PgEngagementStore {
    pool: DbPool,
}

impl PgEngagementStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

/// Convert a database failure into the store-level error.
fn storage_error(err: sqlx::Error) -> CoreError {
    tracing::error!(error = %err, "Engagement store query failed");
    CoreError::StorageUnavailable(err.to_string())
}

#[async_trait]
impl EngagementStore for PgEngagementStore {
    async fn register_photo(
        &self,
        photo_id: PhotoId,
        resource_path: &str,
    ) -> Result<PhotoMetrics, CoreError> {
        validate_resource_path(resource_path)?;
        let row = PhotoMetricsRepo::create_if_absent(&self.pool, photo_id, resource_path)
            .await
            .map_err(storage_error)?;
        Ok(row.into())
    }

    async fn remove_photo(&self, photo_id: PhotoId) -> Result<bool, CoreError> {
        PhotoMetricsRepo::delete(&self.pool, photo_id)
            .await
            .map_err(storage_error)
    }

    async fn record_view(
        &self,
        photo_id: PhotoId,
        viewer_id: Option<UserId>,
        metadata: ClientMetadata,
    ) -> Result<i64, CoreError> {
        let mut tx = self.pool.begin().await.map_err(storage_error)?;

        let Some(view_count) = PhotoMetricsRepo::increment_views(&mut *tx, photo_id)
            .await
            .map_err(storage_error)?
        else {
            return Err(CoreError::photo_not_found(photo_id));
        };

        PhotoViewRepo::insert(&mut *tx, photo_id, viewer_id, &metadata)
            .await
            .map_err(storage_error)?;

        tx.commit().await.map_err(storage_error)?;
        Ok(view_count)
    }

    async fn upsert_rating(
        &self,
        photo_id: PhotoId,
        user_id: UserId,
        score: i32,
    ) -> Result<RatingOutcome, CoreError> {
        validate_score(score)?;

        let mut tx = self.pool.begin().await.map_err(storage_error)?;

        if PhotoMetricsRepo::lock_for_update(&mut *tx, photo_id)
            .await
            .map_err(storage_error)?
            .is_none()
        {
            return Err(CoreError::photo_not_found(photo_id));
        }

        let previous = PhotoRatingRepo::find_score(&mut *tx, photo_id, user_id)
            .await
            .map_err(storage_error)?;
        PhotoRatingRepo::upsert(&mut *tx, photo_id, user_id, score)
            .await
            .map_err(storage_error)?;

        let (sum_delta, count_delta) = match previous {
            Some(old) => (i64::from(score - old), 0),
            None => (i64::from(score), 1),
        };
        let row = PhotoMetricsRepo::apply_rating_delta(&mut *tx, photo_id, sum_delta, count_delta)
            .await
            .map_err(storage_error)?;

        tx.commit().await.map_err(storage_error)?;

        let metrics = PhotoMetrics::from(row);
        Ok(RatingOutcome {
            average_rating: metrics.average_rating,
            was_new: previous.is_none(),
            metrics,
        })
    }

    async fn get_metrics(&self, photo_id: PhotoId) -> Result<PhotoMetrics, CoreError> {
        PhotoMetricsRepo::find_by_id(&self.pool, photo_id)
            .await
            .map_err(storage_error)?
            .map(PhotoMetrics::from)
            .ok_or_else(|| CoreError::photo_not_found(photo_id))
    }

    async fn get_snapshot(
        &self,
        photo_id: PhotoId,
        viewer_id: Option<UserId>,
    ) -> Result<PhotoSnapshot, CoreError> {
        PhotoMetricsRepo::find_with_user_rating(&self.pool, photo_id, viewer_id)
            .await
            .map_err(storage_error)?
            .map(PhotoSnapshot::from)
            .ok_or_else(|| CoreError::photo_not_found(photo_id))
    }

    async fn list_ratings(&self, photo_id: PhotoId) -> Result<Vec<RatingEntry>, CoreError> {
        // Distinguish "no ratings" from "no photo".
        self.get_metrics(photo_id).await?;
        let rows = PhotoRatingRepo::list_for_photo(&self.pool, photo_id)
            .await
            .map_err(storage_error)?;
        Ok(rows.into_iter().map(RatingEntry::from).collect())
    }

    async fn ping(&self) -> Result<(), CoreError> {
        crate::health_check(&self.pool).await.map_err(storage_error)
    }
}

#[async_trait]
impl ViewHistory for PgEngagementStore {
    async fn recent_view_counts(
        &self,
        since: Timestamp,
    ) -> Result<Vec<(PhotoId, i64)>, CoreError> {
        let rows = PhotoViewRepo::counts_since(&self.pool, since)
            .await
            .map_err(storage_error)?;
        Ok(rows
            .into_iter()
            .map(|row| (row.photo_id, row.view_count))
            .collect())
    }
}
