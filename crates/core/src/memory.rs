//! In-process engagement store.
//!
//! Each photo owns a `tokio::sync::RwLock<PhotoState>` holding its aggregate,
//! rating entries and ordered view log. The registry map lock is only held
//! long enough to clone a photo's handle, so photos never contend with each
//! other. Every mutation runs to completion once the photo lock is acquired,
//! with no await point in between: a caller that times out while waiting has
//! applied nothing, and one that got the lock has applied everything.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::engagement::{
    validate_resource_path, validate_score, ClientMetadata, PhotoMetrics, PhotoSnapshot,
    RatingEntry, RatingOutcome, ViewEvent,
};
use crate::error::CoreError;
use crate::store::{EngagementStore, ViewHistory};
use crate::types::{PhotoId, Timestamp, UserId};

/// Mutable per-photo state guarded by that photo's lock.
#[derive(Debug)]
struct PhotoState {
    metrics: PhotoMetrics,
    ratings: HashMap<UserId, RatingEntry>,
    /// Ordered by `observed_at`, oldest first.
    views: Vec<ViewEvent>,
    /// Set by `remove_photo` so holders of a stale handle see `NotFound`.
    removed: bool,
}

impl PhotoState {
    fn new(photo_id: PhotoId, resource_path: &str) -> Self {
        Self {
            metrics: PhotoMetrics::new(photo_id, resource_path),
            ratings: HashMap::new(),
            views: Vec::new(),
            removed: false,
        }
    }

    fn push_view(&mut self, event: ViewEvent) {
        let at = self
            .views
            .partition_point(|e| e.observed_at <= event.observed_at);
        self.views.insert(at, event);
    }

    fn views_since(&self, since: Timestamp) -> usize {
        let first = self.views.partition_point(|e| e.observed_at < since);
        self.views.len() - first
    }
}

type PhotoCell = Arc<RwLock<PhotoState>>;

/// Engagement store kept entirely in memory.
#[derive(Debug, Default)]
pub struct MemoryEngagementStore {
    photos: RwLock<HashMap<PhotoId, PhotoCell>>,
}

impl MemoryEngagementStore {
    pub fn new() -> Self {
        Self::default()
    }

    async fn cell(&self, photo_id: PhotoId) -> Result<PhotoCell, CoreError> {
        self.photos
            .read()
            .await
            .get(&photo_id)
            .cloned()
            .ok_or_else(|| CoreError::photo_not_found(photo_id))
    }

    /// Record a view observed at an explicit time (backfill and tests).
    pub async fn record_view_at(
        &self,
        photo_id: PhotoId,
        viewer_id: Option<UserId>,
        metadata: ClientMetadata,
        observed_at: Timestamp,
    ) -> Result<i64, CoreError> {
        let cell = self.cell(photo_id).await?;
        let mut state = cell.write().await;
        if state.removed {
            return Err(CoreError::photo_not_found(photo_id));
        }

        state.push_view(ViewEvent {
            photo_id,
            viewer_id,
            observed_at,
            metadata,
        });
        state.metrics.view_count += 1;

        tracing::trace!(%photo_id, view_count = state.metrics.view_count, "View recorded");
        Ok(state.metrics.view_count)
    }

    /// Number of photos currently registered.
    pub async fn photo_count(&self) -> usize {
        self.photos.read().await.len()
    }
}

#[async_trait]
impl EngagementStore for MemoryEngagementStore {
    async fn register_photo(
        &self,
        photo_id: PhotoId,
        resource_path: &str,
    ) -> Result<PhotoMetrics, CoreError> {
        validate_resource_path(resource_path)?;

        let cell = {
            let mut photos = self.photos.write().await;
            photos
                .entry(photo_id)
                .or_insert_with(|| Arc::new(RwLock::new(PhotoState::new(photo_id, resource_path))))
                .clone()
        };

        let state = cell.read().await;
        Ok(state.metrics.clone())
    }

    async fn remove_photo(&self, photo_id: PhotoId) -> Result<bool, CoreError> {
        let removed = self.photos.write().await.remove(&photo_id);
        match removed {
            Some(cell) => {
                cell.write().await.removed = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn record_view(
        &self,
        photo_id: PhotoId,
        viewer_id: Option<UserId>,
        metadata: ClientMetadata,
    ) -> Result<i64, CoreError> {
        self.record_view_at(photo_id, viewer_id, metadata, Utc::now())
            .await
    }

    async fn upsert_rating(
        &self,
        photo_id: PhotoId,
        user_id: UserId,
        score: i32,
    ) -> Result<RatingOutcome, CoreError> {
        validate_score(score)?;

        let cell = self.cell(photo_id).await?;
        let mut guard = cell.write().await;
        let state = &mut *guard;
        if state.removed {
            return Err(CoreError::photo_not_found(photo_id));
        }

        let now = Utc::now();
        let (sum_delta, count_delta, was_new) = match state.ratings.entry(user_id) {
            Entry::Occupied(mut existing) => {
                let entry = existing.get_mut();
                let delta = i64::from(score - entry.score);
                entry.score = score;
                entry.updated_at = now;
                (delta, 0, false)
            }
            Entry::Vacant(slot) => {
                slot.insert(RatingEntry {
                    photo_id,
                    user_id,
                    score,
                    submitted_at: now,
                    updated_at: now,
                });
                (i64::from(score), 1, true)
            }
        };
        state.metrics.apply_rating_delta(sum_delta, count_delta);

        Ok(RatingOutcome {
            average_rating: state.metrics.average_rating,
            was_new,
            metrics: state.metrics.clone(),
        })
    }

    async fn get_metrics(&self, photo_id: PhotoId) -> Result<PhotoMetrics, CoreError> {
        let cell = self.cell(photo_id).await?;
        let state = cell.read().await;
        if state.removed {
            return Err(CoreError::photo_not_found(photo_id));
        }
        Ok(state.metrics.clone())
    }

    async fn get_snapshot(
        &self,
        photo_id: PhotoId,
        viewer_id: Option<UserId>,
    ) -> Result<PhotoSnapshot, CoreError> {
        let cell = self.cell(photo_id).await?;
        let state = cell.read().await;
        if state.removed {
            return Err(CoreError::photo_not_found(photo_id));
        }
        let user_rating = viewer_id
            .and_then(|user_id| state.ratings.get(&user_id))
            .map(|entry| entry.score);
        Ok(PhotoSnapshot {
            metrics: state.metrics.clone(),
            user_rating,
        })
    }

    async fn list_ratings(&self, photo_id: PhotoId) -> Result<Vec<RatingEntry>, CoreError> {
        let cell = self.cell(photo_id).await?;
        let state = cell.read().await;
        if state.removed {
            return Err(CoreError::photo_not_found(photo_id));
        }
        let mut ratings: Vec<RatingEntry> = state.ratings.values().cloned().collect();
        ratings.sort_by(|a, b| {
            b.submitted_at
                .cmp(&a.submitted_at)
                .then(a.user_id.cmp(&b.user_id))
        });
        Ok(ratings)
    }

    async fn ping(&self) -> Result<(), CoreError> {
        Ok(())
    }
}

#[async_trait]
impl ViewHistory for MemoryEngagementStore {
    async fn recent_view_counts(
        &self,
        since: Timestamp,
    ) -> Result<Vec<(PhotoId, i64)>, CoreError> {
        let cells: Vec<(PhotoId, PhotoCell)> = self
            .photos
            .read()
            .await
            .iter()
            .map(|(id, cell)| (*id, Arc::clone(cell)))
            .collect();

        let mut counts = Vec::new();
        for (photo_id, cell) in cells {
            let state = cell.read().await;
            if state.removed {
                continue;
            }
            let recent = state.views_since(since);
            if recent > 0 {
                counts.push((photo_id, recent as i64));
            }
        }
        Ok(counts)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
