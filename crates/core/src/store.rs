//! Storage seams for engagement state.
//!
//! [`EngagementStore`] is the counter store: the single source of truth for
//! per-photo aggregates. Every mutating method is one atomic unit keyed by
//! `photo_id`; implementations serialize per photo (row lock, per-key mutex)
//! and never take a lock spanning all photos.
//!
//! [`ViewHistory`] is the read side the trending ranker consumes. It is split
//! out so ranking never needs write access to the store.

use async_trait::async_trait;

use crate::engagement::{
    ClientMetadata, PhotoMetrics, PhotoSnapshot, RatingEntry, RatingOutcome,
};
use crate::error::CoreError;
use crate::types::{PhotoId, Timestamp, UserId};

#[async_trait]
pub trait EngagementStore: Send + Sync {
    /// Create the zeroed aggregate for a photo entering scope.
    ///
    /// Idempotent: an already registered photo is returned unchanged.
    async fn register_photo(
        &self,
        photo_id: PhotoId,
        resource_path: &str,
    ) -> Result<PhotoMetrics, CoreError>;

    /// Drop a photo with its ratings and view history. Returns whether it existed.
    async fn remove_photo(&self, photo_id: PhotoId) -> Result<bool, CoreError>;

    /// Append a view event and increment `view_count` by exactly one.
    ///
    /// Returns the new count. Fails with `NotFound` and no side effect for an
    /// unknown photo.
    async fn record_view(
        &self,
        photo_id: PhotoId,
        viewer_id: Option<UserId>,
        metadata: ClientMetadata,
    ) -> Result<i64, CoreError>;

    /// Insert or replace `user_id`'s rating of `photo_id`.
    ///
    /// The lookup of the previous score, the entry write and the sum/count
    /// adjustment happen as one unit. Scores outside 1..=5 fail with
    /// `Validation` before any storage access.
    async fn upsert_rating(
        &self,
        photo_id: PhotoId,
        user_id: UserId,
        score: i32,
    ) -> Result<RatingOutcome, CoreError>;

    /// Consistent snapshot of one photo's aggregate.
    async fn get_metrics(&self, photo_id: PhotoId) -> Result<PhotoMetrics, CoreError>;

    /// Aggregate plus `viewer_id`'s own score, taken from one consistent read
    /// of the photo.
    async fn get_snapshot(
        &self,
        photo_id: PhotoId,
        viewer_id: Option<UserId>,
    ) -> Result<PhotoSnapshot, CoreError>;

    /// All ratings of a photo, most recently submitted first.
    async fn list_ratings(&self, photo_id: PhotoId) -> Result<Vec<RatingEntry>, CoreError>;

    /// Cheap reachability probe for health checks.
    async fn ping(&self) -> Result<(), CoreError>;
}

#[async_trait]
pub trait ViewHistory: Send + Sync {
    /// Per-photo count of view events with `observed_at >= since`.
    ///
    /// Photos with no qualifying events may be omitted. Implementations must
    /// not scan events older than `since`.
    async fn recent_view_counts(&self, since: Timestamp) -> Result<Vec<(PhotoId, i64)>, CoreError>;
}
