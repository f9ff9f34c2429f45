//! Trending ranking over a sliding window of view events.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::store::ViewHistory;
use crate::types::{PhotoId, Timestamp};

/// Default lookback used by the HTTP layer.
pub const DEFAULT_WINDOW: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Default number of photos returned by the HTTP layer.
pub const DEFAULT_LIMIT: usize = 20;

/// Longest accepted lookback.
pub const MAX_WINDOW: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// Largest accepted result size.
pub const MAX_LIMIT: usize = 100;

/// One ranked photo.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrendingEntry {
    pub photo_id: PhotoId,
    pub recent_view_count: i64,
}

pub struct TrendingRanker {
    history: Arc<dyn ViewHistory>,
}

impl TrendingRanker {
    pub fn new(history: Arc<dyn ViewHistory>) -> Self {
        Self { history }
    }

    /// Rank photos by views observed within `window` of now.
    pub async fn trending(
        &self,
        window: Duration,
        limit: usize,
    ) -> Result<Vec<TrendingEntry>, CoreError> {
        self.trending_at(window, limit, Utc::now()).await
    }

    /// Same as [`trending`](Self::trending) with an explicit reference time.
    pub async fn trending_at(
        &self,
        window: Duration,
        limit: usize,
        now: Timestamp,
    ) -> Result<Vec<TrendingEntry>, CoreError> {
        validate_params(window, limit)?;

        let lookback = chrono::Duration::from_std(window)
            .map_err(|e| CoreError::Internal(format!("window out of range: {e}")))?;
        let since = now - lookback;

        let counts = self.history.recent_view_counts(since).await?;
        let ranked = rank(counts, limit);

        tracing::debug!(
            window_secs = window.as_secs(),
            limit,
            returned = ranked.len(),
            "Computed trending photos"
        );
        Ok(ranked)
    }
}

/// Validate trending query parameters.
pub fn validate_params(window: Duration, limit: usize) -> Result<(), CoreError> {
    if window.is_zero() {
        return Err(CoreError::Validation(
            "window must be positive".to_string(),
        ));
    }
    if window > MAX_WINDOW {
        return Err(CoreError::Validation(format!(
            "window must be at most {} seconds",
            MAX_WINDOW.as_secs()
        )));
    }
    if !(1..=MAX_LIMIT).contains(&limit) {
        return Err(CoreError::Validation(format!(
            "limit must be between 1 and {MAX_LIMIT}, got {limit}"
        )));
    }
    Ok(())
}

/// Drop zero counts, order by count descending then photo id ascending, and
/// keep the first `limit`.
pub fn rank(counts: Vec<(PhotoId, i64)>, limit: usize) -> Vec<TrendingEntry> {
    let mut entries: Vec<TrendingEntry> = counts
        .into_iter()
        .filter(|(_, count)| *count > 0)
        .map(|(photo_id, recent_view_count)| TrendingEntry {
            photo_id,
            recent_view_count,
        })
        .collect();

    entries.sort_by(|a, b| {
        b.recent_view_count
            .cmp(&a.recent_view_count)
            .then_with(|| a.photo_id.cmp(&b.photo_id))
    });
    entries.truncate(limit);
    entries
}
