//! Engagement domain types: per-photo aggregates, rating entries, view events.
//!
//! [`PhotoMetrics`] is a cached projection over the rating and view records.
//! Its `average_rating` is always derived from `rating_sum` / `rating_count`
//! through [`average_rating`] and never written on its own.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::{PhotoId, Timestamp, UserId};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Lowest accepted rating score.
pub const MIN_SCORE: i32 = 1;

/// Highest accepted rating score.
pub const MAX_SCORE: i32 = 5;

/// Maximum length of a photo's object-store key.
pub const MAX_RESOURCE_PATH_LEN: usize = 500;

/// User agents are stored truncated to this many characters.
pub const MAX_USER_AGENT_LEN: usize = 255;

// ---------------------------------------------------------------------------
// Aggregates
// ---------------------------------------------------------------------------

/// Per-photo engagement aggregate owned by the counter store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhotoMetrics {
    pub photo_id: PhotoId,
    /// Object-store key of the image, e.g. `photos/abc.jpg`.
    pub resource_path: String,
    pub view_count: i64,
    pub rating_sum: i64,
    pub rating_count: i64,
    /// `rating_sum / rating_count` rounded to 2 decimals, 0 when unrated.
    pub average_rating: f64,
}

impl PhotoMetrics {
    /// A zeroed aggregate for a photo entering scope.
    pub fn new(photo_id: PhotoId, resource_path: impl Into<String>) -> Self {
        Self::from_totals(photo_id, resource_path, 0, 0, 0)
    }

    /// Build an aggregate from stored totals, deriving the average.
    pub fn from_totals(
        photo_id: PhotoId,
        resource_path: impl Into<String>,
        view_count: i64,
        rating_sum: i64,
        rating_count: i64,
    ) -> Self {
        Self {
            photo_id,
            resource_path: resource_path.into(),
            view_count,
            rating_sum,
            rating_count,
            average_rating: average_rating(rating_sum, rating_count),
        }
    }

    /// Apply a rating change and recompute the average in the same step.
    pub(crate) fn apply_rating_delta(&mut self, sum_delta: i64, count_delta: i64) {
        self.rating_sum += sum_delta;
        self.rating_count += count_delta;
        self.average_rating = average_rating(self.rating_sum, self.rating_count);
    }
}

/// Compute the displayed average: `sum / count` rounded to 2 decimals,
/// ties to even.
///
/// Rounding is done in integer arithmetic so `10 / 3` is exactly `3.33` and
/// `9 / 8` is `1.12`. Returns `0.0` when `count` is zero.
pub fn average_rating(sum: i64, count: i64) -> f64 {
    if count <= 0 {
        return 0.0;
    }
    let scaled = i128::from(sum) * 100;
    let divisor = i128::from(count);
    let quotient = scaled.div_euclid(divisor);
    let twice_remainder = scaled.rem_euclid(divisor) * 2;

    let hundredths = match twice_remainder.cmp(&divisor) {
        Ordering::Less => quotient,
        Ordering::Greater => quotient + 1,
        Ordering::Equal if quotient % 2 == 0 => quotient,
        Ordering::Equal => quotient + 1,
    };
    hundredths as f64 / 100.0
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// One user's rating of one photo. At most one exists per (photo, user).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatingEntry {
    pub photo_id: PhotoId,
    pub user_id: UserId,
    pub score: i32,
    pub submitted_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Client details captured with a view for audit. Not used for ranking.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClientMetadata {
    pub ip_address: Option<String>,
    pub user_agent: String,
}

impl ClientMetadata {
    /// Build metadata, truncating the user agent to [`MAX_USER_AGENT_LEN`] characters.
    pub fn new(ip_address: Option<String>, user_agent: &str) -> Self {
        let user_agent = match user_agent.char_indices().nth(MAX_USER_AGENT_LEN) {
            Some((cut, _)) => user_agent[..cut].to_string(),
            None => user_agent.to_string(),
        };
        Self {
            ip_address,
            user_agent,
        }
    }
}

/// An append-only record of one photo detail fetch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewEvent {
    pub photo_id: PhotoId,
    /// `None` for anonymous viewers.
    pub viewer_id: Option<UserId>,
    pub observed_at: Timestamp,
    pub metadata: ClientMetadata,
}

/// A photo's aggregate together with one viewer's own score, read at the
/// same instant.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PhotoSnapshot {
    pub metrics: PhotoMetrics,
    /// The viewer's current score. `None` for anonymous or non-rating viewers.
    pub user_rating: Option<i32>,
}

/// Result of an atomic rating upsert.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RatingOutcome {
    pub average_rating: f64,
    /// `true` when this was the user's first rating of the photo.
    pub was_new: bool,
    /// Aggregate state immediately after the write.
    pub metrics: PhotoMetrics,
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Validate that a rating score is within [`MIN_SCORE`]..=[`MAX_SCORE`].
pub fn validate_score(score: i32) -> Result<(), CoreError> {
    if !(MIN_SCORE..=MAX_SCORE).contains(&score) {
        return Err(CoreError::Validation(format!(
            "score must be between {MIN_SCORE} and {MAX_SCORE}, got {score}"
        )));
    }
    Ok(())
}

/// Validate an object-store key before it is bound to a photo.
///
/// Keys are relative (no leading `/`), have no empty or `..` segments and use
/// only URL-unreserved characters (`A-Z a-z 0-9 - . _ ~`) plus `/`. A key
/// therefore reads the same before and after percent-decoding and can be
/// placed in a signed URL verbatim.
pub fn validate_resource_path(path: &str) -> Result<(), CoreError> {
    if path.is_empty() {
        return Err(CoreError::Validation(
            "resource_path must not be empty".to_string(),
        ));
    }
    if path.len() > MAX_RESOURCE_PATH_LEN {
        return Err(CoreError::Validation(format!(
            "resource_path must be at most {MAX_RESOURCE_PATH_LEN} characters"
        )));
    }
    if path.starts_with('/') {
        return Err(CoreError::Validation(
            "resource_path must be relative".to_string(),
        ));
    }
    if let Some(bad) = path.chars().find(|&c| !is_path_char(c)) {
        return Err(CoreError::Validation(format!(
            "resource_path may only contain letters, digits, '-', '.', '_', '~' and '/', got {bad:?}"
        )));
    }
    if path.split('/').any(|segment| segment == ".." || segment.is_empty()) {
        return Err(CoreError::Validation(
            "resource_path must not contain empty or '..' segments".to_string(),
        ));
    }
    Ok(())
}

fn is_path_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '.' | '_' | '~' | '/')
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
